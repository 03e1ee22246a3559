//! The published result of the latest fetch cycle.

use crate::types::CombinedRecord;

/// Single source of truth for what the presentation layer shows.
///
/// `Idle` only exists before the first invocation. Every invocation moves
/// the state to `Loading` and then to exactly one of `Success` or `Error`.
/// `Error` replaces any earlier data; it is not a banner over stale records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Success(Vec<CombinedRecord>),
    Error(String),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    /// Settled means the latest invocation has published its outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, FetchState::Success(_) | FetchState::Error(_))
    }

    /// Records of a successful fetch; empty in every other state.
    pub fn records(&self) -> &[CombinedRecord] {
        match self {
            FetchState::Success(records) => records,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FetchState::Error(message) => Some(message),
            _ => None,
        }
    }
}
