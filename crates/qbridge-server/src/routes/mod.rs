//! HTTP routes.

pub mod auth;
pub mod health;
pub mod tools;

pub use auth::{CallbackParams, CallbackResponse, auth_routes, auth_start_handler, callback_handler};
pub use health::health_routes;
pub use tools::{
    ContentBlock, DiscoverResponse, ExecuteRequest, ExecuteResponse, ToolDescriptor,
    discover_handler, execute_handler, tool_descriptors, tool_routes,
};
