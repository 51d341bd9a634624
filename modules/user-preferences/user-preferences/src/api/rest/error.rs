use prefstore_auth::AuthError;
use prefstore_errors::ApiError;

use crate::domain::error::DomainError;

/// Which handler failed; picks the client message for store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetAll,
    GetOne,
    ReplaceAll,
    Merge,
    DeleteAll,
    DeleteKey,
}

impl Operation {
    #[must_use]
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::GetAll => "failed to retrieve preferences",
            Operation::GetOne => "failed to retrieve preference",
            Operation::ReplaceAll => "failed to save preferences",
            Operation::Merge => "failed to update preferences",
            Operation::DeleteAll => "failed to delete preferences",
            Operation::DeleteKey => "failed to delete preference",
        }
    }
}

/// Map a domain error to the client envelope.
///
/// Store failures were already logged with full context by the service;
/// only the fixed per-operation message goes out.
pub fn domain_error_to_api(e: DomainError, operation: Operation) -> ApiError {
    match e {
        DomainError::NotFound => ApiError::not_found("preference not found"),
        DomainError::Validation { message } => ApiError::bad_request(message),
        DomainError::Forbidden => AuthError::Forbidden.into(),
        DomainError::Unauthenticated(err) => err.into(),
        DomainError::Store(_) => ApiError::internal(operation.failure_message()),
    }
}
