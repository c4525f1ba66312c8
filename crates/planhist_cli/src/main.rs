//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `planhist_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("planhist_core ping={}", planhist_core::ping());
    println!("planhist_core version={}", planhist_core::core_version());
}
