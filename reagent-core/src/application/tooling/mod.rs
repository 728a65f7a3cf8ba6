mod builtin;
mod error;
mod function;
mod group;
pub mod mcp;
mod registry;
mod schema;

pub use builtin::{USER_INPUT_TOOL, user_input_tool};
pub use error::{RegistryError, ToolError};
pub use function::{FunctionTool, Tool, ToolOutput, arg_i64, arg_str};
pub use group::{ToolGroup, ToolSet, qualified_name};
pub use registry::ToolRegistry;
pub use schema::{DocComment, Param, ParamType, ToolDescriptor, function_schema};
