//! Context assembly under a token budget.
//!
//! The system prompt (base text, rendered student profile, teaching
//! guidelines) and the current user message are reserved first; the
//! remaining budget is filled with conversation history, newest first.

pub mod assembler;
pub mod token;

pub use assembler::{AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler};
