// ABOUTME: Agent loop — prompts the model, turns each reply into tool calls, and records results.
// ABOUTME: Handles empty replies, repair, bundles, tool failures via a fallback, and cooperative exit.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::provider::ModelClient;
use super::signal::ExitSignal;
use super::state::{AgentLoopState, ConversationState, LoopPhase, strip_reasoning};
use crate::call::{CallRepairer, split_bundle, validate_call};
use crate::config::{AgentConfig, Config, WindowConfig};
use crate::error::ToolExecutionError;
use crate::message::Message;
use crate::prompt::InstructionBuilder;
use crate::session::{ExecutionRecord, MemorySink, RecordKind, RecordSink, emit_record};
use crate::tools::{Dispatcher, ToolRegistry};

/// Appended after an empty model reply.
pub const EMPTY_RESPONSE_NOTICE: &str =
    "Your last reply was empty. Reply with exactly one tool call.";

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The exit signal was observed, usually raised by a `finish` tool.
    Exited,
    /// Too many consecutive empty replies.
    Crashed,
    /// The fallback handler gave up on repeated tool failures.
    FallbackExhausted,
    IterationLimit,
}

/// What to do after a tool failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackAction {
    /// Keep going, recording the given text as the call's result if any.
    Continue(Option<String>),
    Exhausted,
}

/// Decides how the loop reacts to a failed tool call.
pub trait FallbackHandler: Send {
    fn handle(&mut self, error: &ToolExecutionError) -> FallbackAction;

    /// Called after a call succeeds.
    fn reset(&mut self) {}
}

/// Shows the error to the model and asks it to correct the call, up to a limit
/// of consecutive failures.
#[derive(Debug, Clone)]
pub struct CorrectiveFallback {
    max_attempts: u32,
    attempts: u32,
}

impl CorrectiveFallback {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            attempts: 0,
        }
    }
}

impl FallbackHandler for CorrectiveFallback {
    fn handle(&mut self, error: &ToolExecutionError) -> FallbackAction {
        self.attempts += 1;
        if self.attempts > self.max_attempts {
            return FallbackAction::Exhausted;
        }
        FallbackAction::Continue(Some(format!(
            "{}\n\nCorrect the call and try again, or use a different tool.",
            error.message
        )))
    }

    fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// Drives one conversation from an initial transcript to a [`RunOutcome`].
pub struct Agent {
    client: Arc<dyn ModelClient>,
    dispatcher: Dispatcher,
    repairer: CallRepairer,
    fallback: Box<dyn FallbackHandler>,
    records: Arc<dyn RecordSink>,
    instruction: String,
    agent_config: AgentConfig,
    window: WindowConfig,
    state: AgentLoopState,
    conversation: ConversationState,
    iterations: u32,
}

impl Agent {
    /// Build an agent with the default instruction, the corrective fallback and
    /// an in-memory record sink. Repair uses the same model client.
    pub fn new(
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        exit: ExitSignal,
        config: &Config,
    ) -> Self {
        let signatures = registry.signatures();
        let instruction = InstructionBuilder::new().build(&signatures);
        Self {
            repairer: CallRepairer::new(client.clone(), signatures),
            client,
            dispatcher: Dispatcher::new(registry),
            fallback: Box::new(CorrectiveFallback::new(config.agent.max_fallback_attempts)),
            records: Arc::new(MemorySink::new()),
            instruction,
            agent_config: config.agent.clone(),
            window: config.window.clone(),
            state: AgentLoopState::new(exit),
            conversation: ConversationState::default(),
            iterations: 0,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_fallback(mut self, fallback: impl FallbackHandler + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn with_records(mut self, records: Arc<dyn RecordSink>) -> Self {
        self.records = records;
        self
    }

    /// Use a separate client for call repair.
    pub fn with_repair_client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.repairer = CallRepairer::new(client, self.dispatcher.registry().signatures());
        self
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Transcript of the most recent run, untrimmed.
    pub fn transcript(&self) -> Vec<Message> {
        self.conversation.transcript()
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn phase(&self) -> LoopPhase {
        self.state.phase
    }

    /// Run until exit, crash, fallback exhaustion, or the iteration limit.
    ///
    /// Errors are returned only when the model client itself fails or the
    /// window cannot be bounded; tool failures go through the fallback handler.
    pub async fn run(&mut self, initial: Vec<Message>) -> anyhow::Result<RunOutcome> {
        let exit = self.state.exit.clone();
        self.state = AgentLoopState::new(exit.clone());
        self.conversation = ConversationState::new(initial, self.window.pinned_count);
        self.iterations = 0;
        self.fallback.reset();

        loop {
            if exit.is_set() {
                return Ok(self.exited());
            }
            if self.iterations >= self.agent_config.max_iterations {
                warn!(iterations = self.iterations, "iteration limit reached");
                return Ok(RunOutcome::IterationLimit);
            }
            self.iterations += 1;
            let link_id = format!("call-{}", self.iterations);

            self.state.transition(LoopPhase::AwaitingResponse);
            let window = self.conversation.bounded(&self.window)?;
            let reply = self.client.invoke(&self.instruction, &window).await?;
            let raw = reply.plain_text();

            if raw.trim().is_empty() {
                self.state.empty_responses += 1;
                self.state.transition(LoopPhase::RetryingEmpty);
                warn!(
                    count = self.state.empty_responses,
                    max = self.agent_config.max_empty_responses,
                    "empty model response"
                );
                if self.state.empty_responses >= self.agent_config.max_empty_responses {
                    self.state.transition(LoopPhase::Crashed);
                    emit_record(
                        self.records.as_ref(),
                        ExecutionRecord::new(
                            RecordKind::Crash,
                            None,
                            format!(
                                "model returned {} consecutive empty responses",
                                self.state.empty_responses
                            ),
                        ),
                    );
                    return Ok(RunOutcome::Crashed);
                }
                self.conversation.push(Message::human(EMPTY_RESPONSE_NOTICE));
                continue;
            }
            self.state.empty_responses = 0;

            let text = strip_reasoning(&raw).to_string();
            self.state.transition(LoopPhase::Validating);
            let Some(result) = self.dispatch(&text).await else {
                self.conversation.push(Message::assistant(text));
                return Ok(self.exited());
            };

            self.state.transition(LoopPhase::Recording);
            self.conversation
                .push(Message::tool_invocation(text, link_id.clone()));
            match result {
                Ok(output) => {
                    self.fallback.reset();
                    self.conversation.push(Message::tool_result(output, link_id));
                }
                Err(err) => {
                    warn!(tool = ?err.tool_name, error = %err.message, "tool call failed");
                    emit_record(
                        self.records.as_ref(),
                        ExecutionRecord::new(
                            RecordKind::ToolFailure,
                            err.tool_name.clone(),
                            err.message.clone(),
                        ),
                    );
                    match self.fallback.handle(&err) {
                        FallbackAction::Continue(note) => {
                            let content = note.unwrap_or_else(|| err.message.clone());
                            self.conversation.push(Message::tool_result(content, link_id));
                        }
                        FallbackAction::Exhausted => {
                            self.conversation
                                .push(Message::tool_result(err.message.clone(), link_id));
                            emit_record(
                                self.records.as_ref(),
                                ExecutionRecord::new(
                                    RecordKind::FallbackExhausted,
                                    err.tool_name.clone(),
                                    format!("fallback gave up after: {}", err.message),
                                ),
                            );
                            return Ok(RunOutcome::FallbackExhausted);
                        }
                    }
                }
            }
        }
    }

    /// Turn reply text into tool output. `None` means exit was requested
    /// before anything ran.
    async fn dispatch(&mut self, text: &str) -> Option<Result<String, ToolExecutionError>> {
        let exit = self.state.exit.clone();
        let registry = self.dispatcher.registry();
        let calls = split_bundle(text, |name| registry.is_bundleable(name));

        if calls.len() > 1 {
            if exit.is_set() {
                return None;
            }
            debug!(calls = calls.len(), "executing bundle");
            self.state.transition(LoopPhase::Executing);
            return Some(
                self.dispatcher
                    .execute_bundle(&calls, &mut self.state.filter, &exit)
                    .await,
            );
        }

        let code = if validate_call(text) {
            text.to_string()
        } else {
            info!("reply is not a single call; attempting repair");
            match self.repairer.repair(text).await {
                Ok(code) => code,
                Err(err) => return Some(Err(err)),
            }
        };

        if exit.is_set() {
            return None;
        }
        self.state.transition(LoopPhase::Executing);
        Some(self.dispatcher.execute(&code, &mut self.state.filter).await)
    }

    fn exited(&mut self) -> RunOutcome {
        self.state.transition(LoopPhase::Exited);
        info!(iterations = self.iterations, "agent exited");
        RunOutcome::Exited
    }
}
