//! # Application Module
//!
//! The ReAct core.
//!
//! ## Submodules
//!
//! - [`agent`] - Step controller and loop driver
//! - [`parser`] - Turns model completions into actions
//! - [`tooling`] - Tool registry, schemas and the MCP bridge
//! - [`retry`] - Bounded, deadline-limited retries for blocking calls
//! - [`executor`] - Background runtime that blocking callers submit async work to

pub mod agent;
pub mod executor;
pub mod parser;
pub mod retry;
pub mod tooling;
