//! Model infrastructure module
//!
//! # Structure
//! - `types` - Request, ResponseFormat and Error types
//! - `traits` - LanguageModel trait
//! - `adapter` - Message format adapters
//! - `clients` - OpenAI-compatible HTTP client
//! - `structured` - JSON extraction and typed decoding of replies

pub mod adapter;
pub mod clients;
pub mod structured;
pub mod traits;
pub mod types;

pub use clients::OpenAiChatModel;
pub use structured::StructuredError;
pub use traits::LanguageModel;
pub use types::{ModelError, ModelRequest, ResponseFormat};
