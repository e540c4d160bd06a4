//! Violation synthesis from keyword matches

pub mod heuristic;

pub use heuristic::{heuristic_hints, heuristic_violations, MAX_HINTS};
