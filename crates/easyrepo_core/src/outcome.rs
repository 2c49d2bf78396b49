//! Uniform success/error container returned by repository operations.
//!
//! # Invariants
//! - Exactly one of payload or fault is present.
//! - Reading the wrong side yields `None`, never a panic.

use crate::repo::{RepoError, RepoResult};

/// Either the payload of a finished operation or the fault it captured.
#[derive(Debug)]
#[must_use]
pub enum Outcome<T> {
    Success(T),
    Error(RepoError),
}

impl<T> Outcome<T> {
    pub fn success(payload: T) -> Self {
        Self::Success(payload)
    }

    pub fn error(fault: RepoError) -> Self {
        Self::Error(fault)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    /// Returns the payload, or `None` for an error outcome.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Error(_) => None,
        }
    }

    /// Returns the captured fault, or `None` for a success outcome.
    pub fn fault(&self) -> Option<&RepoError> {
        match self {
            Self::Success(_) => None,
            Self::Error(fault) => Some(fault),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Error(_) => None,
        }
    }

    pub fn into_fault(self) -> Option<RepoError> {
        match self {
            Self::Success(_) => None,
            Self::Error(fault) => Some(fault),
        }
    }

    /// Converts back into a std `Result` so callers can use `?`.
    pub fn into_result(self) -> RepoResult<T> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::Error(fault) => Err(fault),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(payload) => Outcome::Success(f(payload)),
            Self::Error(fault) => Outcome::Error(fault),
        }
    }
}

impl<T> From<RepoResult<T>> for Outcome<T> {
    fn from(value: RepoResult<T>) -> Self {
        match value {
            Ok(payload) => Self::Success(payload),
            Err(fault) => Self::Error(fault),
        }
    }
}

impl<T> From<Outcome<T>> for RepoResult<T> {
    fn from(value: Outcome<T>) -> Self {
        value.into_result()
    }
}
