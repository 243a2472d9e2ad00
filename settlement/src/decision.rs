//! Quality decision function
//!
//! Pure mapping from a numeric score to a release/withhold verdict. No I/O,
//! no randomness; unit-testable without a network or ledger.

/// Minimum score that releases the escrow.
pub const SCORE_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Reply meets the quality bar; claim the escrow for the receiver.
    Release,
    /// Reply falls short; leave the escrow pending until expiry.
    Withhold,
}

/// Map a score to a verdict.
///
/// Total over all inputs: out-of-range scores (negative, above 100) are
/// compared normally rather than rejected.
pub fn decide(score: f64) -> Verdict {
    if score >= SCORE_THRESHOLD {
        Verdict::Release
    } else {
        Verdict::Withhold
    }
}
