pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod security_system;

#[cfg(test)]
pub mod mock;

pub use client::{AnalysisClient, Analyzer};
pub use config::{ClientConfig, Credential, Settings, API_KEY_ENV_VAR};
pub use errors::{AnalysisError, AnalysisResult, ConfigError, ToolError, ToolResult};
pub use models::message::{GenerateRequest, GenerateResponse, Message, MessageType};
pub use security_system::SecuritySystem;
