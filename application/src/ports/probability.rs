//! Port for the probabilistic escalation draw.
//!
//! Injected so tests can pin the draw instead of flaking on real
//! randomness.

/// Source of uniform draws in `[0, 1)`.
pub trait ProbabilitySource: Send + Sync {
    fn draw(&self) -> f64;
}

/// Always returns the same value. Test helper, also handy for forcing the
/// probabilistic branch fully on or off.
pub struct FixedProbability(pub f64);

impl ProbabilitySource for FixedProbability {
    fn draw(&self) -> f64 {
        self.0
    }
}
