//! Non-interactive zero-knowledge proofs and the verification result type.
//!
//! All proofs are Sigma protocols made non-interactive via Fiat–Shamir:
//! the challenge is a uniform integer below the group order derived from a
//! canonical SHA-512 transcript (see [`crate::kdf::Transcript`]). Proofs
//! are represented by their `(c, f)` pair; verification reconstructs the
//! announcement from the verification equation and re-derives the
//! challenge.

use std::fmt;

mod dlog;
mod log_equality;

pub use self::{dlog::DlogProof, log_equality::LogEqualityProof};

/// Outcome of verifying a proof or a composite cryptographic statement.
///
/// Verification never panics and never throws: it either confirms the
/// statement or reports the first failing clause. Combinators short-circuit
/// on failure, mirroring how composite verifications bail out early.
#[must_use = "a verification result must be checked"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The statement holds.
    Correct,
    /// The statement does not hold; the payload names the failing clause.
    Failed(String),
}

impl VerificationResult {
    /// Creates a failed result with the given reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    /// Maps a boolean check onto a result.
    pub fn check(condition: bool, reason: impl Into<String>) -> Self {
        if condition {
            Self::Correct
        } else {
            Self::Failed(reason.into())
        }
    }

    /// Returns `true` for [`Self::Correct`].
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct)
    }

    /// Requires `condition` to hold in addition to `self`. Short-circuits:
    /// an already failed result keeps its original reason.
    pub fn and_expect(self, condition: bool, reason: impl Into<String>) -> Self {
        match self {
            Self::Correct => Self::check(condition, reason),
            failed => failed,
        }
    }

    /// Chains another verification, evaluated only if `self` is correct.
    pub fn and_then(self, next: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Correct => next(),
            failed => failed,
        }
    }

    /// Invokes `handler` with the failure reason, if any, passing the
    /// result through.
    pub fn on_failure(self, handler: impl FnOnce(&str)) -> Self {
        if let Self::Failed(reason) = &self {
            handler(reason);
        }
        self
    }

    /// Panics with `message` if the result is a failure. Intended for
    /// tests and examples.
    ///
    /// # Panics
    ///
    /// Panics if the result is [`Self::Failed`].
    pub fn expect(self, message: &str) {
        if let Self::Failed(reason) = self {
            panic!("{message}: {reason}");
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => formatter.write_str("correct"),
            Self::Failed(reason) => write!(formatter, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinators_short_circuit() {
        let result = VerificationResult::Correct
            .and_expect(true, "first")
            .and_expect(false, "second")
            .and_expect(false, "third");
        assert_eq!(result, VerificationResult::failed("second"));

        let result = VerificationResult::failed("initial").and_then(|| {
            panic!("must not be evaluated");
        });
        assert_eq!(result, VerificationResult::failed("initial"));
    }

    #[test]
    fn on_failure_observes_the_reason() {
        let mut seen = None;
        let result = VerificationResult::failed("broken")
            .on_failure(|reason| seen = Some(reason.to_string()));
        assert!(!result.is_correct());
        assert_eq!(seen.as_deref(), Some("broken"));
    }

    #[test]
    #[should_panic(expected = "context: broken")]
    fn expect_panics_with_reason() {
        VerificationResult::failed("broken").expect("context");
    }
}
