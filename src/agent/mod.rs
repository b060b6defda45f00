// ABOUTME: Agent module — model client seam, exit signal, loop state, and the agent loop.
// ABOUTME: Agent::run drives a conversation until exit, crash, or a configured limit.

pub mod r#loop;
pub mod provider;
pub mod signal;
pub mod state;

pub use r#loop::{
    Agent, CorrectiveFallback, EMPTY_RESPONSE_NOTICE, FallbackAction, FallbackHandler, RunOutcome,
};
pub use provider::{ModelClient, RecordedRequest, ReplayClient};
pub use signal::ExitSignal;
pub use state::{AgentLoopState, ConversationState, LoopPhase, strip_reasoning};
