//! crates/todo_sync_core/src/response.rs
//!
//! The tri-state envelope every asynchronous outcome is surfaced in.

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<T> {
    /// Operation in flight, no payload yet.
    Loading,
    Success(T),
    /// The cause may be unknown.
    Error(Option<CoreError>),
}

impl<T> Response<T> {
    pub fn from_result(result: CoreResult<T>) -> Self {
        match result {
            Ok(value) => Response::Success(value),
            Err(e) => Response::Error(Some(e)),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Response::Loading)
    }

    /// True once the operation has settled on `Success` or `Error`.
    pub fn is_terminal(&self) -> bool {
        match self {
            Response::Loading => false,
            Response::Success(_) | Response::Error(_) => true,
        }
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Response::Success(value) => Some(value),
            Response::Loading | Response::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Response::Error(cause) => cause.as_ref(),
            Response::Loading | Response::Success(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        match self {
            Response::Loading => Response::Loading,
            Response::Success(value) => Response::Success(f(value)),
            Response::Error(cause) => Response::Error(cause),
        }
    }
}

impl<T> From<CoreResult<T>> for Response<T> {
    fn from(result: CoreResult<T>) -> Self {
        Response::from_result(result)
    }
}
