//! Tool-calling agent that finds lyrics and builds vocabulary.
//!
//! The model answers in plain text. Each reply is parsed into a tool call,
//! checked against the tool's argument schema and executed, with the result
//! fed back as a system turn. When the model stalls or the turn budget runs
//! out, the agent finishes the job from what the session already holds.

mod conversation;
mod memory;
pub mod parser;
mod recovery;
mod runner;
#[cfg(test)]
pub(crate) mod testing;
mod tools;

pub use conversation::{Conversation, Role, Turn};
pub use memory::SessionMemory;
pub use parser::{implicit_completion_call, parse_tool_call, MAX_RECOVERED_CHARS};
pub use recovery::guess_title_artist;
pub use runner::{
    Agent, AgentOutcome, RecoveryReason, ToolCallRecord, AUTO_RECOVERY_THRESHOLD,
    MAX_CLIENT_FAILURES, MAX_TURNS,
};
pub use tools::{ToolCall, ToolInvocation, ToolKind, ToolOutput, ToolRegistry, DEFAULT_MAX_RESULTS};
