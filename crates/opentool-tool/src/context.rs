use opentool_core::{Credentials, ToolContext};
use tokio_util::sync::CancellationToken;

/// Default implementation of ToolContext
#[derive(Debug, Clone)]
pub struct DefaultToolContext {
    function_call_id: String,
    invocation_id: String,
    credentials: Credentials,
    cancellation: CancellationToken,
}

impl DefaultToolContext {
    pub fn new(function_call_id: String, invocation_id: String) -> Self {
        Self {
            function_call_id,
            invocation_id,
            credentials: Credentials::default(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Tie this call to a caller-owned cancellation token
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

impl ToolContext for DefaultToolContext {
    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }

    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}
