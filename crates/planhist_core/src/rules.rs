//! Declarative lifecycle rule tables.
//!
//! # Responsibility
//! - Hold the fixed lifecycle status code list.
//! - Hold the (status, classification, code) event allow-list.
//! - Hold the cascade registry: which owner kinds a plan status change
//!   propagates to.
//! - Hold the principal land-use regulation codes used by the area overlap
//!   exclusion.
//!
//! # Invariants
//! - Tables are ordinary const data populated from authority documentation;
//!   nothing in this module is generated or mutated at runtime.

use crate::model::interval::{EventClass, OwnerKind};

/// Immutable lifecycle status reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
    /// Code value; identity within the code list.
    pub value: &'static str,
    pub name: &'static str,
    /// Hierarchy level in the authority code list.
    pub level: u8,
}

/// Fixed lifecycle status code list.
pub const STATUS_CODES: &[StatusCode] = &[
    StatusCode {
        value: "01",
        name: "pending",
        level: 1,
    },
    StatusCode {
        value: "02",
        name: "in preparation",
        level: 2,
    },
    StatusCode {
        value: "03",
        name: "proposal",
        level: 2,
    },
    StatusCode {
        value: "04",
        name: "approved",
        level: 3,
    },
    StatusCode {
        value: "05",
        name: "under appeal",
        level: 3,
    },
    StatusCode {
        value: "06",
        name: "valid",
        level: 4,
    },
    StatusCode {
        value: "07",
        name: "repealed",
        level: 5,
    },
    StatusCode {
        value: "08",
        name: "lapsed",
        level: 5,
    },
];

/// Returns the status code entry for a code value, if known.
pub fn status_code(value: &str) -> Option<&'static StatusCode> {
    STATUS_CODES.iter().find(|code| code.value == value)
}

/// One legal (status, classification, codes) combination.
#[derive(Debug, Clone, Copy)]
pub struct AllowedEvents {
    pub status: &'static str,
    pub class: EventClass,
    pub codes: &'static [&'static str],
}

/// Event allow-list keyed by owning interval status. One row per legal
/// (status, classification) pair; absence means no events of that
/// classification are admitted under the status.
pub const EVENT_ALLOW_LIST: &[AllowedEvents] = &[
    AllowedEvents {
        status: "01",
        class: EventClass::Interaction,
        codes: &["01"],
    },
    AllowedEvents {
        status: "02",
        class: EventClass::Decision,
        codes: &["01", "02", "03"],
    },
    AllowedEvents {
        status: "02",
        class: EventClass::Processing,
        codes: &["01", "02"],
    },
    AllowedEvents {
        status: "02",
        class: EventClass::Interaction,
        codes: &["01", "02"],
    },
    AllowedEvents {
        status: "03",
        class: EventClass::Decision,
        codes: &["04", "05"],
    },
    AllowedEvents {
        status: "03",
        class: EventClass::Processing,
        codes: &["03", "04"],
    },
    AllowedEvents {
        status: "03",
        class: EventClass::Interaction,
        codes: &["02", "03"],
    },
    AllowedEvents {
        status: "04",
        class: EventClass::Decision,
        codes: &["06"],
    },
    AllowedEvents {
        status: "04",
        class: EventClass::Processing,
        codes: &["05"],
    },
    AllowedEvents {
        status: "05",
        class: EventClass::Decision,
        codes: &["07", "08"],
    },
    AllowedEvents {
        status: "05",
        class: EventClass::Processing,
        codes: &["06"],
    },
    AllowedEvents {
        status: "06",
        class: EventClass::Decision,
        codes: &["09"],
    },
    AllowedEvents {
        status: "06",
        class: EventClass::Processing,
        codes: &["07"],
    },
    AllowedEvents {
        status: "07",
        class: EventClass::Decision,
        codes: &["10"],
    },
];

/// Returns whether the (status, classification, code) triple is admitted.
pub fn event_is_allowed(status: &str, class: EventClass, code: &str) -> bool {
    EVENT_ALLOW_LIST
        .iter()
        .filter(|row| row.status == status && row.class == class)
        .any(|row| row.codes.contains(&code))
}

/// Returns the allowed codes for one (status, classification) pair.
pub fn allowed_event_codes(status: &str, class: EventClass) -> &'static [&'static str] {
    EVENT_ALLOW_LIST
        .iter()
        .find(|row| row.status == status && row.class == class)
        .map_or(&[], |row| row.codes)
}

/// Cascade rule: a status change on `owner` fans out to dependents of the
/// listed kinds whose status equals the owner's previous status.
#[derive(Debug, Clone, Copy)]
pub struct CascadeRule {
    pub owner: OwnerKind,
    pub cascades_to: &'static [OwnerKind],
}

/// Cascade registry. Only plan status changes fan out; dependents never
/// cascade further.
pub const CASCADE_RULES: &[CascadeRule] = &[CascadeRule {
    owner: OwnerKind::Plan,
    cascades_to: &[OwnerKind::Regulation, OwnerKind::Proposition],
}];

/// Returns the dependent kinds a status change on `owner` cascades to.
pub fn cascade_targets(owner: OwnerKind) -> &'static [OwnerKind] {
    CASCADE_RULES
        .iter()
        .find(|rule| rule.owner == owner)
        .map_or(&[], |rule| rule.cascades_to)
}

/// Regulation codes marking an area object as the primary intended use of
/// the area. Two area objects of one plan sharing such a code must not
/// have overlapping geometries.
pub const PRINCIPAL_LAND_USE_CODES: &[&str] = &[
    "residenceArea",
    "commerceArea",
    "industryArea",
    "recreationArea",
    "agricultureArea",
    "forestArea",
    "trafficArea",
];

/// Returns whether a regulation code marks principal land use.
pub fn is_principal_land_use(code: &str) -> bool {
    PRINCIPAL_LAND_USE_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::{
        allowed_event_codes, cascade_targets, event_is_allowed, is_principal_land_use, status_code,
        EVENT_ALLOW_LIST, STATUS_CODES,
    };
    use crate::model::interval::{EventClass, OwnerKind};

    #[test]
    fn status_code_lookup_finds_known_values() {
        let approved = status_code("04").expect("04 should be a known status");
        assert_eq!(approved.name, "approved");
        assert!(status_code("99").is_none());
    }

    #[test]
    fn status_code_values_are_unique() {
        for (index, code) in STATUS_CODES.iter().enumerate() {
            assert!(
                STATUS_CODES[index + 1..]
                    .iter()
                    .all(|other| other.value != code.value),
                "duplicate status code value {}",
                code.value
            );
        }
    }

    #[test]
    fn allow_list_rows_reference_known_statuses() {
        for row in EVENT_ALLOW_LIST {
            assert!(
                status_code(row.status).is_some(),
                "allow-list references unknown status {}",
                row.status
            );
            assert!(!row.codes.is_empty());
        }
    }

    #[test]
    fn pending_admits_only_interaction_events() {
        assert!(event_is_allowed("01", EventClass::Interaction, "01"));
        assert!(!event_is_allowed("01", EventClass::Decision, "01"));
        assert!(!event_is_allowed("01", EventClass::Processing, "01"));
    }

    #[test]
    fn interaction_code_valid_for_proposal_is_rejected_under_valid() {
        assert!(event_is_allowed("03", EventClass::Interaction, "03"));
        assert!(!event_is_allowed("06", EventClass::Interaction, "03"));
    }

    #[test]
    fn preparation_requires_decision_codes() {
        assert_eq!(
            allowed_event_codes("02", EventClass::Decision),
            &["01", "02", "03"]
        );
        assert!(allowed_event_codes("08", EventClass::Decision).is_empty());
    }

    #[test]
    fn only_plans_cascade() {
        assert_eq!(
            cascade_targets(OwnerKind::Plan),
            &[OwnerKind::Regulation, OwnerKind::Proposition]
        );
        assert!(cascade_targets(OwnerKind::Regulation).is_empty());
        assert!(cascade_targets(OwnerKind::PlanObject).is_empty());
    }

    #[test]
    fn principal_land_use_codes_are_recognized() {
        assert!(is_principal_land_use("residenceArea"));
        assert!(!is_principal_land_use("noiseAbatement"));
    }
}
