/// Solver config
pub mod config;
/// Search loop
pub mod dpll;
/// Engine-owned statistics
pub mod stats;
/// General util/definitions
pub mod types;
