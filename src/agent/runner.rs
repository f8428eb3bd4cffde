//! Agent runner with tool calling loop.

use super::conversation::Conversation;
use super::memory::SessionMemory;
use super::parser::{parse_tool_call, FINISHED};
use super::recovery::{completion_song_id, local_fallback};
use super::tools::{ToolCall, ToolInvocation, ToolOutput, ToolRegistry};
use crate::config::{Prompts, Settings};
use crate::error::{Result, ShabdaError};
use crate::llm::{LanguageModel, OpenAIChatModel};
use crate::storage::ArtifactStore;
use crate::tools::ToolContext;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Model calls allowed per request before recovery takes over.
pub const MAX_TURNS: usize = 10;

/// Turn index from which unparsable replies trigger automatic recovery.
pub const AUTO_RECOVERY_THRESHOLD: usize = 3;

/// Consecutive model failures tolerated before recovery takes over.
pub const MAX_CLIENT_FAILURES: usize = 3;

const PREVIEW_CHARS: usize = 300;

pub(super) const EMPTY_REPLY_PROMPT: &str = "Your last response was empty. Please process the previous result and specify the next tool to use, or indicate FINISHED if done.";

pub(super) const CORRECTIVE_PROMPT: &str = "Please specify a tool to use in the format 'Tool: tool_name(arg1=\"value1\")' or indicate FINISHED if done.";

/// Agent that finds lyrics and builds vocabulary with a set of tools.
///
/// The agent keeps no per-request state, so one instance can serve
/// concurrent requests.
pub struct Agent {
    model: Arc<dyn LanguageModel>,
    tools: Arc<dyn ToolRegistry>,
    system_prompt: String,
    max_turns: usize,
    auto_recovery_threshold: usize,
    max_client_failures: usize,
}

impl Agent {
    /// Create a new agent with the given model and tools.
    pub fn new(model: Arc<dyn LanguageModel>, tools: Arc<dyn ToolRegistry>) -> Self {
        Self {
            model,
            tools,
            system_prompt: Prompts::default().agent_system(),
            max_turns: MAX_TURNS,
            auto_recovery_threshold: AUTO_RECOVERY_THRESHOLD,
            max_client_failures: MAX_CLIENT_FAILURES,
        }
    }

    /// Build an agent with the configured model, tools, prompts and limits.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let model: Arc<dyn LanguageModel> = Arc::new(OpenAIChatModel::from_settings(&settings.model)?);
        let store = ArtifactStore::from_settings(settings)?;
        let tools = ToolContext::from_settings(settings, prompts.clone(), model.clone(), store)?;

        Ok(Self::new(model, Arc::new(tools))
            .with_system_prompt(&prompts.agent_system())
            .with_max_turns(settings.agent.max_turns)
            .with_recovery_threshold(settings.agent.auto_recovery_threshold)
            .with_max_client_failures(settings.agent.max_client_failures))
    }

    /// Set a custom system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the turn budget.
    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    /// Set the turn index from which automatic recovery runs.
    pub fn with_recovery_threshold(mut self, threshold: usize) -> Self {
        self.auto_recovery_threshold = threshold;
        self
    }

    /// Set how many consecutive model failures end the loop. At least one.
    pub fn with_max_client_failures(mut self, max: usize) -> Self {
        self.max_client_failures = max.max(1);
        self
    }

    /// Serve one request and return the song ID the work was saved under.
    ///
    /// Never fails: when the model stops cooperating the agent recovers what
    /// it can, saves it and reports a fallback ID if nothing better exists.
    #[instrument(skip(self, initial_message))]
    pub async fn process_request(&self, initial_message: &str) -> AgentOutcome {
        info!("Processing request: {}", initial_message);

        let mut session = Session::new(self, initial_message);
        let recovered = session.run().await;

        let song_id = session
            .memory
            .pending_identifier
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(crate::tools::fallback_song_id);

        info!("Request finished with song ID {} after {} turns", song_id, session.turns);

        AgentOutcome {
            song_id,
            turns: session.turns,
            tool_calls: session.tool_calls,
            recovered,
        }
    }
}

/// Why the agent had to finish on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    /// The turn budget ran out.
    BudgetExhausted,
    /// The model client kept failing.
    ClientFailure,
}

impl std::fmt::Display for RecoveryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryReason::BudgetExhausted => write!(f, "turn budget exhausted"),
            RecoveryReason::ClientFailure => write!(f, "language model unavailable"),
        }
    }
}

/// Result of an agent run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// ID the lyrics and vocabulary were saved under. Never empty.
    pub song_id: String,
    /// Number of turns (model calls) used.
    pub turns: usize,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Set when the run ended through recovery rather than `FINISHED`.
    pub recovered: Option<RecoveryReason>,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// State of one request.
pub(super) struct Session<'a> {
    pub(super) agent: &'a Agent,
    pub(super) request: &'a str,
    pub(super) conversation: Conversation,
    pub(super) memory: SessionMemory,
    pub(super) tool_calls: Vec<ToolCallRecord>,
    pub(super) turns: usize,
}

impl<'a> Session<'a> {
    fn new(agent: &'a Agent, request: &'a str) -> Self {
        Self {
            agent,
            request,
            conversation: Conversation::new(&agent.system_prompt, request),
            memory: SessionMemory::new(),
            tool_calls: Vec::new(),
            turns: 0,
        }
    }

    async fn run(&mut self) -> Option<RecoveryReason> {
        let max_turns = self.agent.max_turns;
        let mut client_failures = 0;

        while self.turns < max_turns {
            let turn = self.turns;
            self.turns += 1;
            info!("[Turn {}/{}]", self.turns, max_turns);
            for t in self.conversation.tail(2) {
                debug!("{}: {}", t.role, t.preview(PREVIEW_CHARS));
            }

            let reply = match self.agent.model.send(self.conversation.turns()).await {
                Ok(reply) => {
                    client_failures = 0;
                    reply
                }
                Err(e) => {
                    client_failures += 1;
                    warn!(
                        "Model request failed ({}/{}): {}",
                        client_failures, self.agent.max_client_failures, e
                    );
                    if client_failures >= self.agent.max_client_failures {
                        self.recover().await;
                        return Some(RecoveryReason::ClientFailure);
                    }
                    self.conversation.push_system(format!(
                        "The previous request to the language model failed: {}. Please continue.",
                        e
                    ));
                    continue;
                }
            };

            if reply.trim().is_empty() {
                warn!("Model returned an empty reply");
                self.conversation.push_system(EMPTY_REPLY_PROMPT);
                continue;
            }

            if reply.contains(FINISHED) {
                info!("Model indicated the task is finished");
                self.conversation.push_assistant(reply.as_str());
                self.complete(&reply).await;
                return None;
            }

            match parse_tool_call(&reply, &self.memory) {
                Some(invocation) => {
                    self.conversation.push_assistant(reply.as_str());
                    self.execute(&invocation).await;
                }
                None => {
                    warn!("Could not find a tool call in the reply");
                    self.conversation.push_assistant(reply.as_str());
                    if turn >= self.agent.auto_recovery_threshold {
                        self.auto_recover().await;
                    } else {
                        self.conversation.push_system(CORRECTIVE_PROMPT);
                    }
                }
            }
        }

        warn!("Reached the maximum of {} turns", max_turns);
        self.recover().await;
        Some(RecoveryReason::BudgetExhausted)
    }

    /// Handle a `FINISHED` reply.
    async fn complete(&mut self, reply: &str) {
        match completion_song_id(reply) {
            Some(song_id) => {
                info!("Completion names song ID {}", song_id);
                self.memory.pending_identifier = Some(song_id);
                if self.memory.holds_artifacts() {
                    if self.memory.needs_extraction() {
                        self.extract_held_lyrics().await;
                    }
                    self.persist().await;
                }
            }
            None => {
                warn!("FINISHED without a song ID, salvaging");
                self.salvage_completion(reply).await;
            }
        }
    }

    /// Bind and run a parsed invocation, reporting problems to the model.
    pub(super) async fn execute(&mut self, invocation: &ToolInvocation) {
        let bound = ToolCall::bind(invocation, &self.memory).and_then(|call| {
            if self.agent.tools.provides(call.kind()) {
                Ok(call)
            } else {
                Err(ShabdaError::UnknownTool(invocation.name.clone()))
            }
        });

        match bound {
            Ok(call) => {
                self.run_tool(&call).await;
            }
            Err(e @ ShabdaError::UnknownTool(_)) => {
                warn!("{}", e);
                self.conversation.push_system(e.to_string());
            }
            Err(e) => {
                warn!("Could not bind {}: {}", invocation.name, e);
                self.conversation
                    .push_system(format!("Error: {}. Please provide it and try again.", e));
            }
        }
    }

    /// Run a tool, update memory and report the result in the conversation.
    ///
    /// Designated tools fall back to local results on failure. Returns the
    /// output, if any.
    pub(super) async fn run_tool(&mut self, call: &ToolCall) -> Option<ToolOutput> {
        let kind = call.kind();
        info!("Executing tool {}", kind);

        let (output, note) = match self.agent.tools.execute(call).await {
            Ok(output) => (output, ""),
            Err(e) => {
                let message = match e {
                    ShabdaError::ToolExecution { message, .. } => message,
                    other => other.to_string(),
                };
                warn!("Tool {} failed: {}", kind, message);

                match local_fallback(call) {
                    Some(output) => {
                        info!("Using local fallback for {}", kind);
                        (output, " (local fallback)")
                    }
                    None => {
                        self.conversation.push_system(format!(
                            "Error: {} failed: {}. Please try a different approach.",
                            kind, message
                        ));
                        self.tool_calls.push(ToolCallRecord {
                            name: kind.to_string(),
                            arguments: call.arguments_json(),
                            result: format!("Error: {}", message),
                        });
                        return None;
                    }
                }
            }
        };

        self.memory.record(call, &output);
        let json = output.to_json();
        self.conversation
            .push_system(format!("Tool {} result{}: {}", kind, note, json));
        self.tool_calls.push(ToolCallRecord {
            name: kind.to_string(),
            arguments: call.arguments_json(),
            result: json,
        });

        Some(output)
    }
}
