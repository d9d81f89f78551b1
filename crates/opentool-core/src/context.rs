use crate::auth::Credentials;
use tokio_util::sync::CancellationToken;

/// Tool context provided during tool execution
///
/// A context is created per call by the host. It carries the call identity,
/// the credentials that apply to this call only, and the cancellation signal
/// of the inbound request.
pub trait ToolContext: Send + Sync {
    fn function_call_id(&self) -> &str;

    fn invocation_id(&self) -> &str;

    /// Credentials scoped to this call
    fn credentials(&self) -> &Credentials;

    /// Cancelled when the caller abandons the request
    fn cancellation_token(&self) -> CancellationToken {
        CancellationToken::new()
    }
}
