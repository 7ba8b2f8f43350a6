//! Built-in executors
//!
//! The leaf workers the supervisor delegates to. Each one implements the
//! `Executor` trait from the sdk crate and owns exactly the collaborators it
//! needs; none of them see the session layer or each other.

pub mod calc;
pub mod conversational;
pub mod document;
pub mod tool;

pub use conversational::ConversationalExecutor;
pub use document::DocumentExecutor;
pub use tool::ToolExecutor;

use crate::llm::ModelError;
use sdk::ExecutorFailure;

/// Map a model error onto the executor failure taxonomy.
///
/// Credential and request-shape problems won't get better by retrying or by
/// running the remaining tasks, so they halt the plan; everything else is
/// transient and recorded as recoverable.
pub(crate) fn failure_from_model(error: ModelError) -> ExecutorFailure {
    match error {
        ModelError::AuthenticationFailed(_) | ModelError::InvalidRequest(_) => {
            ExecutorFailure::fatal(error.to_string())
        }
        _ => ExecutorFailure::recoverable(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_are_fatal_transient_errors_are_not() {
        assert!(failure_from_model(ModelError::AuthenticationFailed("bad key".into())).is_fatal());
        assert!(failure_from_model(ModelError::InvalidRequest("too long".into())).is_fatal());
        assert!(!failure_from_model(ModelError::Timeout).is_fatal());
        assert!(!failure_from_model(ModelError::RateLimitExceeded).is_fatal());
        assert!(!failure_from_model(ModelError::NetworkError("reset".into())).is_fatal());
        assert!(!failure_from_model(ModelError::ProviderUnavailable("HTTP 503".into())).is_fatal());
    }
}
