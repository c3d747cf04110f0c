//! Errors surfaced by observables.
//!
//! Most failure-like conditions here are deliberately *not* errors:
//! disposing twice and unsubscribing an unknown handler are silent no-ops,
//! and a panicking subscriber unwinds straight through `notify`.

/// Errors from observable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservableError {
    /// Every handle to the observable was dropped before the awaited
    /// notification arrived.
    Closed,
}

impl std::fmt::Display for ObservableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "observable dropped before the next notification"),
        }
    }
}

impl std::error::Error for ObservableError {}
