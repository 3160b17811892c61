// Learnt clause retention.
pub const MAX_LEMMAS_DEFAULT: usize = 2000;

// Geometric restart schedule: first restart after `RESTART_BASE_DEFAULT` conflicts, each later
// budget scaled by `RESTART_FACTOR_DEFAULT`.
pub const RESTART_BASE_DEFAULT: u64 = 100;
pub const RESTART_FACTOR_DEFAULT: f64 = 1.5;

#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Max learnt clauses kept; the oldest is dropped first. 0 disables learning.
    pub max_lemmas: usize,
    /// Conflicts before the first restart. 0 disables restarts.
    pub restart_base: u64,
    /// Scaling factor for the conflict budget after each restart; must be > 1.
    pub restart_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_lemmas: MAX_LEMMAS_DEFAULT,
            restart_base: RESTART_BASE_DEFAULT,
            restart_factor: RESTART_FACTOR_DEFAULT,
        }
    }
}
