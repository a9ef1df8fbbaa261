use thiserror::Error;

/// Errors from policy-registry mutations.
///
/// Both variants leave the registry unchanged; callers decide whether a
/// no-op is acceptable.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("policy '{0}' is already registered")]
    DuplicateName(String),

    #[error("no policy named '{0}'")]
    UnknownName(String),
}

/// Errors from message store adapters (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors from rubric evaluator calls.
///
/// Every variant is an infrastructure fault: the policy pipeline treats it
/// as "policy errored, not violated" and continues with remaining policies.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rubric evaluation timed out after {0}s")]
    Timeout(u64),

    #[error("http error: {0}")]
    Http(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("malformed evaluator response: {0}")]
    MalformedResponse(String),

    #[error("provider error: {message}")]
    Provider { message: String },
}
