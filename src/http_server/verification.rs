//! Verification code allow-list

use std::fmt;

use subtle::{Choice, ConstantTimeEq};

/// Codes a caller may present in the `code` parameter.
///
/// An empty list rejects every request.
#[derive(Clone, Default)]
pub struct VerificationCodes {
    codes: Vec<String>,
}

impl VerificationCodes {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `candidate` is on the list.
    ///
    /// Compares against every entry in constant time per entry.
    pub fn contains(&self, candidate: &str) -> bool {
        let mut found = Choice::from(0u8);
        for code in &self.codes {
            found |= code.as_bytes().ct_eq(candidate.as_bytes());
        }
        found.into()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl fmt::Debug for VerificationCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationCodes")
            .field("count", &self.codes.len())
            .finish()
    }
}
