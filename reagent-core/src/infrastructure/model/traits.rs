//! Model traits

use super::types::{ModelError, ModelRequest};

/// The chat-completion collaborator the step controller calls.
///
/// Calls block. Implementations must be shareable across threads because
/// every attempt runs on its own thread under the retry deadline.
pub trait LanguageModel: Send + Sync {
    fn invoke(&self, request: &ModelRequest) -> Result<String, ModelError>;
}
