//! # LearnLoop Core
//!
//! Domain types, traits, and error definitions for the LearnLoop tutoring
//! backend. This crate has **zero framework dependencies**: it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, profile persistence, web
//! search) is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod profile;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GenerationError, Result, StorageError};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role, SessionId};
pub use profile::{Achievement, Level, MAX_PROGRESS, Profile, ProfileStore, ProfileUpdate, level_for};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{TEACHER_OVERRIDE, ToolDefinition, ToolKind, WebSearch};
