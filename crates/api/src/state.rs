use brokerlink_core::IdentityVerifier;
use brokerlink_workflow::WorkflowContext;
use std::sync::Arc;

/// Shared application state accessible by all route handlers.
pub struct AppState {
    pub workflow: WorkflowContext,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    pub fn new(workflow: WorkflowContext, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { workflow, verifier }
    }
}
