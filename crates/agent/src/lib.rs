//! The tutoring pipeline: the heart of LearnLoop.
//!
//! A student message flows through a fixed sequence of stages:
//!
//! 1. **Collect** the inbound message and load the student's profile
//! 2. **Retrieve context** (recent session history, prioritized by topic)
//! 3. **Search** the web when the message asks for current information
//! 4. **Generate** a reply via the configured provider
//! 5. **Detect topics** in the reply and **update progress** on the profile
//! 6. **Record** the exchange in the session and analytics
//!
//! A teacher override short-circuits steps 3–5 and returns the teacher's
//! text verbatim.

pub mod context;
pub mod orchestrator;
pub mod progress;
pub mod prompts;
pub mod registry;
pub mod session;
pub mod toolbox;
pub mod topics;

pub use context::{AssembledContext, AssemblyInput, AssemblyMetadata, ContextAssembler};
pub use orchestrator::{
    Orchestrator, SessionReport, TeacherOverride, TurnResult, TurnState, TutorRuntime, TutorSettings, should_search,
};
pub use progress::{LearningHistory, Recommendation, recommendations};
pub use registry::{SessionRegistry, SharedOrchestrator};
pub use session::{SessionEvent, SessionExport, SessionState, SessionSummary};
pub use toolbox::{ToolInvocation, ToolOutcome, Toolbox};
pub use topics::CatalogueEntry;
