//! Errors raised while building schedules from declarations.
//!
//! Only construction can fail. Once a [`PlayerSchedule`](crate::schedule::PlayerSchedule)
//! or [`BucketWidth`](crate::presence::BucketWidth) exists, every query on it is total.

use thiserror::Error;

pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    /// A field does not follow the declaration grammar.
    #[error("invalid {field}: {reason}")]
    Format { field: String, reason: String },

    /// A count or size falls outside what the per-minute arrays can hold.
    #[error("{reason}: expected {expected}, got {actual}")]
    Range {
        reason: String,
        expected: u64,
        actual: u64,
    },
}

impl ScheduleError {
    pub fn format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn range(reason: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::Range {
            reason: reason.into(),
            expected,
            actual,
        }
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }
}
