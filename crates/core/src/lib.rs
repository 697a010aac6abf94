//! # Steward Core
//!
//! Domain types, traits, and error definitions for the Steward
//! admin-agent runtime. This crate defines the domain model that all
//! other crates implement against.
//!
//! ## Design Philosophy
//!
//! The reasoning-service backend and the tool catalogue are defined as
//! traits here. Implementations live in their respective crates. This
//! enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod text;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, Part, Role, ToolCall, ToolResponse};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use text::split_message;
pub use tool::{Tool, ToolRegistry};
