//! The completion service contract

use crate::error::CompletionError;
use crate::prompt::PromptInputs;
use crate::role::RoleTemplate;
use async_trait::async_trait;
use std::sync::Arc;

/// Produces model text for a role and its inputs
///
/// Calls are independent; implementations keep no conversation state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Render the role's template with `inputs` and return the completion
    async fn invoke(&self, role: RoleTemplate, inputs: &PromptInputs)
        -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: CompletionService + ?Sized> CompletionService for Arc<T> {
    async fn invoke(
        &self,
        role: RoleTemplate,
        inputs: &PromptInputs,
    ) -> Result<String, CompletionError> {
        (**self).invoke(role, inputs).await
    }
}
