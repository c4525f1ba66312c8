//! Planar geometry model and topology predicates.
//!
//! # Responsibility
//! - Define the point/line/polygon shapes carried by plans and plan objects.
//! - Provide validity, simplicity, and interior-overlap predicates used by
//!   the write-path geometry guard.
//!
//! # Invariants
//! - Rings are stored closed: first and last coordinate are equal.
//! - Predicates are pure; persistence and error mapping live above this
//!   module.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

const EPS: f64 = 1e-9;

/// One planar coordinate in the plan's projected reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pt {
    pub x: f64,
    pub y: f64,
}

impl Pt {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Open polyline carried by line-kind plan objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString(pub Vec<Pt>);

/// Closed ring: first and last coordinate must be equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring(pub Vec<Pt>);

/// Polygon with one exterior ring and zero or more interior rings (holes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Ring,
    pub interiors: Vec<Ring>,
}

impl Polygon {
    /// Builds a hole-free polygon from an exterior coordinate list.
    pub fn from_exterior(points: Vec<Pt>) -> Self {
        Self {
            exterior: Ring(points),
            interiors: Vec::new(),
        }
    }
}

/// Geometry carried by one plan object, discriminated by object kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "coords", rename_all = "snake_case")]
pub enum Geometry {
    Area(Polygon),
    Line(LineString),
    Point(Pt),
}

impl Geometry {
    /// Returns the database kind discriminator for this geometry.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Area(_) => "area",
            Self::Line(_) => "line",
            Self::Point(_) => "point",
        }
    }
}

/// Well-formedness faults reported by geometry predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryFault {
    /// Ring has fewer than four coordinates (closed representation).
    RingTooShort { len: usize },
    /// Ring first/last coordinates differ.
    RingNotClosed,
    /// Ring encloses no area (zero-area sliver).
    ZeroArea,
    /// Ring edges intersect each other.
    RingSelfIntersection,
    /// Line has fewer than two coordinates.
    LineTooShort { len: usize },
}

impl Display for GeometryFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RingTooShort { len } => {
                write!(f, "ring needs at least 4 coordinates, got {len}")
            }
            Self::RingNotClosed => write!(f, "ring is not closed"),
            Self::ZeroArea => write!(f, "ring encloses no area"),
            Self::RingSelfIntersection => write!(f, "ring edges self-intersect"),
            Self::LineTooShort { len } => {
                write!(f, "line needs at least 2 coordinates, got {len}")
            }
        }
    }
}

/// Checks OGC well-formedness of a polygon: every ring must be closed,
/// long enough, simple, and enclose nonzero area.
pub fn polygon_is_valid(polygon: &Polygon) -> Result<(), GeometryFault> {
    ring_is_valid(&polygon.exterior)?;
    for interior in &polygon.interiors {
        ring_is_valid(interior)?;
    }
    Ok(())
}

/// Checks simplicity of a line: no two edges may intersect outside the
/// shared endpoint of consecutive edges.
pub fn line_is_simple(line: &LineString) -> Result<(), GeometryFault> {
    if line.0.len() < 2 {
        return Err(GeometryFault::LineTooShort { len: line.0.len() });
    }
    if polyline_is_simple(&line.0, false) {
        Ok(())
    } else {
        Err(GeometryFault::RingSelfIntersection)
    }
}

/// Returns whether the interiors of two polygons intersect with positive
/// area. Shared boundary (adjacency) does not count as overlap.
///
/// Interior rings are ignored: plan areas with holes are compared by their
/// exterior footprint.
pub fn polygons_overlap(a: &Polygon, b: &Polygon) -> bool {
    let ring_a = closed_points(&a.exterior);
    let ring_b = closed_points(&b.exterior);

    for (p1, p2) in ring_segments(ring_a) {
        for (q1, q2) in ring_segments(ring_b) {
            if segments_properly_cross(p1, p2, q1, q2) {
                return true;
            }
        }
    }

    probe_points(ring_a)
        .into_iter()
        .any(|pt| point_strictly_inside(pt, ring_b))
        || probe_points(ring_b)
            .into_iter()
            .any(|pt| point_strictly_inside(pt, ring_a))
}

fn ring_is_valid(ring: &Ring) -> Result<(), GeometryFault> {
    let points = &ring.0;
    if points.len() < 4 {
        return Err(GeometryFault::RingTooShort { len: points.len() });
    }

    let first = points[0];
    let last = points[points.len() - 1];
    if (first.x - last.x).abs() > EPS || (first.y - last.y).abs() > EPS {
        return Err(GeometryFault::RingNotClosed);
    }

    if ring_area(points).abs() <= EPS {
        return Err(GeometryFault::ZeroArea);
    }

    if !polyline_is_simple(&points[..points.len() - 1], true) {
        return Err(GeometryFault::RingSelfIntersection);
    }

    Ok(())
}

/// Checks pairwise edge intersections of an open or closed point chain.
/// For a closed chain the wraparound edge is included and the last/first
/// edges count as adjacent.
fn polyline_is_simple(points: &[Pt], closed: bool) -> bool {
    let n = points.len();
    let edge_count = if closed { n } else { n - 1 };
    if edge_count < 2 {
        return true;
    }

    let edge = |i: usize| -> (Pt, Pt) { (points[i], points[(i + 1) % n]) };

    for i in 0..edge_count {
        for j in (i + 1)..edge_count {
            let adjacent = j == i + 1 || (closed && i == 0 && j == edge_count - 1);
            let (p1, p2) = edge(i);
            let (q1, q2) = edge(j);

            if adjacent {
                // Consecutive edges always meet at the shared endpoint; any
                // additional contact means the chain folds back on itself.
                if collinear_backtrack(p1, p2, q1, q2) {
                    return false;
                }
                continue;
            }

            if segments_intersect(p1, p2, q1, q2) {
                return false;
            }
        }
    }
    true
}

fn collinear_backtrack(p1: Pt, p2: Pt, q1: Pt, q2: Pt) -> bool {
    // Adjacent edges share one endpoint; identify the outer points.
    let (shared, a, b) = if points_eq(p2, q1) {
        (p2, p1, q2)
    } else if points_eq(p1, q2) {
        (p1, q1, p2)
    } else if points_eq(p1, q1) {
        (p1, p2, q2)
    } else {
        (p2, p1, q1)
    };

    if orient(a, shared, b).abs() > EPS {
        return false;
    }
    // Collinear: backtracking iff the outer points lie on the same side.
    let dot = (a.x - shared.x) * (b.x - shared.x) + (a.y - shared.y) * (b.y - shared.y);
    dot > EPS
}

fn points_eq(a: Pt, b: Pt) -> bool {
    (a.x - b.x).abs() <= EPS && (a.y - b.y).abs() <= EPS
}

fn orient(a: Pt, b: Pt, c: Pt) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(p: Pt, q: Pt, r: Pt) -> bool {
    orient(p, q, r).abs() <= EPS
        && r.x >= p.x.min(q.x) - EPS
        && r.x <= p.x.max(q.x) + EPS
        && r.y >= p.y.min(q.y) - EPS
        && r.y <= p.y.max(q.y) + EPS
}

/// Full segment intersection test, including touching and collinear overlap.
fn segments_intersect(p1: Pt, p2: Pt, q1: Pt, q2: Pt) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }

    (d1.abs() <= EPS && on_segment(q1, q2, p1))
        || (d2.abs() <= EPS && on_segment(q1, q2, p2))
        || (d3.abs() <= EPS && on_segment(p1, p2, q1))
        || (d4.abs() <= EPS && on_segment(p1, p2, q2))
}

/// Proper crossing only: the segments intersect at a single point interior
/// to both. Touching endpoints and collinear overlap do not count.
fn segments_properly_cross(p1: Pt, p2: Pt, q1: Pt, q2: Pt) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);

    ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
}

/// Signed shoelace area over a closed ring (duplicate last point included).
fn ring_area(points: &[Pt]) -> f64 {
    let mut sum = 0.0;
    for window in points.windows(2) {
        sum += window[0].x * window[1].y - window[1].x * window[0].y;
    }
    sum / 2.0
}

fn closed_points(ring: &Ring) -> &[Pt] {
    &ring.0
}

fn ring_segments(points: &[Pt]) -> impl Iterator<Item = (Pt, Pt)> + '_ {
    points.windows(2).map(|window| (window[0], window[1]))
}

/// Interior probe candidates: vertices, edge midpoints, and the centroid.
/// Midpoints and the centroid catch containment and coincident footprints
/// where every vertex sits exactly on the other boundary.
fn probe_points(points: &[Pt]) -> Vec<Pt> {
    let mut probes: Vec<Pt> = points[..points.len() - 1].to_vec();
    for (p1, p2) in ring_segments(points) {
        probes.push(Pt::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0));
    }
    probes.push(ring_centroid(points));
    probes
}

fn ring_centroid(points: &[Pt]) -> Pt {
    let area = ring_area(points);
    if area.abs() <= EPS {
        let n = (points.len() - 1) as f64;
        let (sx, sy) = points[..points.len() - 1]
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Pt::new(sx / n, sy / n);
    }

    let mut cx = 0.0;
    let mut cy = 0.0;
    for window in points.windows(2) {
        let cross = window[0].x * window[1].y - window[1].x * window[0].y;
        cx += (window[0].x + window[1].x) * cross;
        cy += (window[0].y + window[1].y) * cross;
    }
    Pt::new(cx / (6.0 * area), cy / (6.0 * area))
}

/// Ray-cast containment excluding the boundary: points on a ring edge are
/// not strictly inside.
fn point_strictly_inside(pt: Pt, ring: &[Pt]) -> bool {
    for (p1, p2) in ring_segments(ring) {
        if on_segment(p1, p2, pt) {
            return false;
        }
    }

    let mut inside = false;
    for (p1, p2) in ring_segments(ring) {
        if (p1.y > pt.y) != (p2.y > pt.y) {
            let x_at = p1.x + (pt.y - p1.y) / (p2.y - p1.y) * (p2.x - p1.x);
            if pt.x < x_at {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::{
        line_is_simple, polygon_is_valid, polygons_overlap, GeometryFault, LineString, Polygon, Pt,
    };

    fn unit_square_at(x: f64, y: f64) -> Polygon {
        Polygon::from_exterior(vec![
            Pt::new(x, y),
            Pt::new(x + 1.0, y),
            Pt::new(x + 1.0, y + 1.0),
            Pt::new(x, y + 1.0),
            Pt::new(x, y),
        ])
    }

    #[test]
    fn unit_square_is_valid() {
        polygon_is_valid(&unit_square_at(0.0, 0.0)).expect("square should be valid");
    }

    #[test]
    fn open_ring_is_rejected() {
        let open = Polygon::from_exterior(vec![
            Pt::new(0.0, 0.0),
            Pt::new(1.0, 0.0),
            Pt::new(1.0, 1.0),
            Pt::new(0.5, 0.5),
        ]);
        assert_eq!(
            polygon_is_valid(&open),
            Err(GeometryFault::RingNotClosed)
        );
    }

    #[test]
    fn zero_area_sliver_is_rejected() {
        let sliver = Polygon::from_exterior(vec![
            Pt::new(0.0, 0.0),
            Pt::new(1.0, 0.0),
            Pt::new(2.0, 0.0),
            Pt::new(0.0, 0.0),
        ]);
        assert_eq!(polygon_is_valid(&sliver), Err(GeometryFault::ZeroArea));
    }

    #[test]
    fn bowtie_ring_is_rejected() {
        let bowtie = Polygon::from_exterior(vec![
            Pt::new(0.0, 0.0),
            Pt::new(2.0, 2.0),
            Pt::new(2.0, 0.0),
            Pt::new(0.0, 1.0),
            Pt::new(0.0, 0.0),
        ]);
        assert_eq!(
            polygon_is_valid(&bowtie),
            Err(GeometryFault::RingSelfIntersection)
        );
    }

    #[test]
    fn straight_line_is_simple() {
        let line = LineString(vec![Pt::new(0.0, 0.0), Pt::new(2.0, 0.0), Pt::new(4.0, 1.0)]);
        line_is_simple(&line).expect("polyline should be simple");
    }

    #[test]
    fn x_shaped_line_is_not_simple() {
        let crossing = LineString(vec![
            Pt::new(0.0, 0.0),
            Pt::new(2.0, 2.0),
            Pt::new(2.0, 0.0),
            Pt::new(0.0, 2.0),
        ]);
        assert_eq!(
            line_is_simple(&crossing),
            Err(GeometryFault::RingSelfIntersection)
        );
    }

    #[test]
    fn backtracking_line_is_not_simple() {
        let backtrack = LineString(vec![
            Pt::new(0.0, 0.0),
            Pt::new(2.0, 0.0),
            Pt::new(1.0, 0.0),
        ]);
        assert_eq!(
            line_is_simple(&backtrack),
            Err(GeometryFault::RingSelfIntersection)
        );
    }

    #[test]
    fn identical_squares_overlap() {
        assert!(polygons_overlap(
            &unit_square_at(0.0, 0.0),
            &unit_square_at(0.0, 0.0)
        ));
    }

    #[test]
    fn partially_shifted_squares_overlap() {
        assert!(polygons_overlap(
            &unit_square_at(0.0, 0.0),
            &unit_square_at(0.5, 0.5)
        ));
    }

    #[test]
    fn contained_square_overlaps() {
        let outer = Polygon::from_exterior(vec![
            Pt::new(-1.0, -1.0),
            Pt::new(2.0, -1.0),
            Pt::new(2.0, 2.0),
            Pt::new(-1.0, 2.0),
            Pt::new(-1.0, -1.0),
        ]);
        assert!(polygons_overlap(&outer, &unit_square_at(0.0, 0.0)));
        assert!(polygons_overlap(&unit_square_at(0.0, 0.0), &outer));
    }

    #[test]
    fn edge_adjacent_squares_do_not_overlap() {
        assert!(!polygons_overlap(
            &unit_square_at(0.0, 0.0),
            &unit_square_at(1.0, 0.0)
        ));
    }

    #[test]
    fn corner_touching_squares_do_not_overlap() {
        assert!(!polygons_overlap(
            &unit_square_at(0.0, 0.0),
            &unit_square_at(1.0, 1.0)
        ));
    }

    #[test]
    fn disjoint_squares_do_not_overlap() {
        assert!(!polygons_overlap(
            &unit_square_at(0.0, 0.0),
            &unit_square_at(5.0, 5.0)
        ));
    }
}
