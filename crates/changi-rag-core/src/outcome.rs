//! Result type for components that degrade instead of failing.
//!
//! The rewriter, retriever, and answer generator never return errors: when a
//! backend call fails they substitute a fallback value and report it as
//! [`Outcome::Degraded`]. Callers match on the variant when they care (for
//! logging or the turn report) and otherwise just take the value.

/// A component result that is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The backend call succeeded.
    Ok(T),
    /// The backend call failed; the value is the component's fallback.
    Degraded(T),
}

impl<T> Outcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v) => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_variants_yield_value() {
        let ok: Outcome<&str> = Outcome::Ok("a");
        let degraded: Outcome<&str> = Outcome::Degraded("b");
        assert!(!ok.is_degraded());
        assert!(degraded.is_degraded());
        assert_eq!(ok.into_inner(), "a");
        assert_eq!(degraded.into_inner(), "b");
    }
}
