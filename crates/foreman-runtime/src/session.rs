//! Per-session actor running the admin orchestration loop.
//!
//! One `Session` exists per session id. It processes one chat request at a
//! time (a second request is rejected while the first is in flight), keeps
//! message history in memory, and relies on a background flush task to make
//! history durable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use foreman_core::artifacts::Artifact;
use foreman_core::events::{BaseEvent, ForemanEvent};
use foreman_core::ids::SessionId;
use foreman_core::messages::{ChatMessage, TokenUsage, ToolCall};
use foreman_core::tasks::TaskStatus;
use foreman_core::worker::WorkerType;
use foreman_llm::{GenerateOptions, GenerateRequest, ReasoningBackend};
use foreman_store::MessageLog;
use foreman_tools::request::{DELEGATE_TO_WORKER, PLANNED_TASKS};
use foreman_tools::{ToolContext, ToolRegistry};

use crate::errors::RuntimeError;
use crate::events::EventEmitter;
use crate::phase::{Phase, PhaseContext, PhaseMachine};
use crate::prompt;

/// Default admin turn ceiling.
pub const DEFAULT_ADMIN_TURNS: u32 = 10;

/// Outcome metadata for one chat request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMetadata {
    /// Admin turns consumed.
    pub turns_used: u32,
    /// Names of tools executed, deduplicated, in first-use order.
    pub tools_used: Vec<String>,
    /// Successful delegations during this request.
    pub delegations: u32,
    /// Token totals across all turns.
    pub usage: TokenUsage,
}

/// What `chat` returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    /// Final answer, pause question, or best-effort text.
    pub response: String,
    /// Artifacts produced by delegations during this request.
    pub artifacts: Vec<Artifact>,
    /// Phase after the request.
    pub conversation_phase: Phase,
    /// Accounting.
    pub metadata: ChatMetadata,
}

/// Snapshot returned by [`Session::status`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// The session id.
    pub session_id: String,
    /// Phase context copy.
    pub phase: PhaseContext,
    /// Whether a chat request is in flight.
    pub busy: bool,
    /// In-memory message count.
    pub message_count: usize,
}

struct SessionState {
    phase: PhaseMachine,
    messages: Vec<ChatMessage>,
    /// Messages up to this index have been written to the durable log.
    flushed: usize,
    /// Bumped by `clear`. A flush whose snapshot predates the current
    /// generation must discard its batch instead of committing it.
    generation: u64,
}

/// The session actor.
pub struct Session {
    session_id: SessionId,
    backend: Arc<dyn ReasoningBackend>,
    registry: Arc<ToolRegistry>,
    history: Arc<dyn MessageLog>,
    emitter: EventEmitter,
    max_turns: u32,
    state: Mutex<SessionState>,
    busy: tokio::sync::Mutex<()>,
}

impl Session {
    /// Build a session over its collaborators.
    pub fn new(
        session_id: SessionId,
        backend: Arc<dyn ReasoningBackend>,
        registry: Arc<ToolRegistry>,
        history: Arc<dyn MessageLog>,
        emitter: EventEmitter,
        max_turns: u32,
    ) -> Self {
        Self {
            session_id,
            backend,
            registry,
            history,
            emitter,
            max_turns,
            state: Mutex::new(SessionState {
                phase: PhaseMachine::new(),
                messages: Vec::new(),
                flushed: 0,
                generation: 0,
            }),
            busy: tokio::sync::Mutex::new(()),
        }
    }

    /// Load previously persisted history into memory. Called once before
    /// the first chat on a resumed session.
    pub async fn hydrate(&self) -> Result<(), RuntimeError> {
        let persisted = self.history.load(self.session_id.as_str()).await?;
        let mut state = self.state.lock();
        state.flushed = persisted.len();
        state.messages = persisted;
        Ok(())
    }

    /// Spawn the background history flush. Independent of the request
    /// path; flush errors are swallowed and retried at the next tick.
    pub fn spawn_history_flush(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                let _ = ticker.tick().await;
                let Some(session) = weak.upgrade() else { break };
                if let Err(e) = session.flush_history().await {
                    warn!(error = %e, "history flush failed, will retry");
                }
            }
        })
    }

    /// Write unflushed in-memory messages to the durable log.
    ///
    /// The lock is not held across the append awaits, so `clear` can run
    /// mid-flush; the generation check makes such a flush discard its
    /// batch rather than commit cleared messages.
    pub async fn flush_history(&self) -> Result<(), RuntimeError> {
        let (pending, target, generation) = {
            let state = self.state.lock();
            let pending = state.messages.get(state.flushed..).unwrap_or_default().to_vec();
            (pending, state.messages.len(), state.generation)
        };
        if pending.is_empty() {
            return Ok(());
        }
        for message in &pending {
            if self.state.lock().generation != generation {
                debug!("history cleared mid-flush, discarding batch");
                return Ok(());
            }
            self.history.append(self.session_id.as_str(), message).await?;
        }
        let mut state = self.state.lock();
        if state.generation == generation {
            state.flushed = state.flushed.max(target).min(state.messages.len());
            debug!(flushed = pending.len(), "history flushed");
        }
        Ok(())
    }

    /// One chat request. Rejects with [`RuntimeError::SessionBusy`] if
    /// another request is in flight for this session.
    #[instrument(skip_all, fields(session = %self.session_id))]
    pub async fn chat(
        &self,
        message: &str,
        images: Vec<String>,
    ) -> Result<ChatOutcome, RuntimeError> {
        let Ok(_busy) = self.busy.try_lock() else {
            counter!("foreman_session_busy_rejections_total").increment(1);
            return Err(RuntimeError::SessionBusy {
                session_id: self.session_id.to_string(),
            });
        };
        gauge!("foreman_sessions_active").increment(1.0);
        let outcome = self.run_chat(message, images).await;
        gauge!("foreman_sessions_active").decrement(1.0);
        outcome
    }

    async fn run_chat(
        &self,
        message: &str,
        images: Vec<String>,
    ) -> Result<ChatOutcome, RuntimeError> {
        self.emit(|base| ForemanEvent::AgentStart { base });

        {
            let mut user = ChatMessage::user(message);
            user.images = images;
            self.state.lock().messages.push(user);
        }

        let mut metadata = ChatMetadata::default();
        let mut artifacts: Vec<Artifact> = Vec::new();
        let mut last_assistant_text = String::new();
        let definitions = self.registry.definitions();

        for turn in 1..=self.max_turns {
            let (phase, messages) = {
                let state = self.state.lock();
                (state.phase.current_phase(), state.messages.clone())
            };
            self.emit(|base| ForemanEvent::TurnStart { base, turn });

            // The admin only ever reasons and calls declared functions;
            // native search/code-execution is reserved for workers.
            let request = GenerateRequest {
                messages,
                system: prompt::admin_system(phase),
                options: GenerateOptions {
                    tools: definitions.clone(),
                    ..GenerateOptions::default()
                },
            };
            let response = self.backend.generate(&request).await?;

            metadata.turns_used = turn;
            metadata.usage.add(&response.usage);
            self.emit(|base| ForemanEvent::TurnEnd {
                base,
                turn,
                usage: response.usage.clone(),
            });

            if !response.text.is_empty() {
                last_assistant_text = response.text.clone();
                self.state.lock().messages.push(ChatMessage::assistant(&response.text));
            }

            if response.tool_calls.is_empty() {
                // Final answer. Phase transitions are driven by tool-call
                // side effects, never by this branch.
                return Ok(self.finish(response.text, artifacts, metadata));
            }

            match self
                .run_tool_batch(&response.tool_calls, &mut metadata, &mut artifacts)
                .await
            {
                BatchOutcome::PausedForUser(question) => {
                    return Ok(self.finish(question, artifacts, metadata));
                }
                BatchOutcome::Continue(results) => {
                    let body = serde_json::to_string(&json!({ "toolResults": results }))
                        .unwrap_or_default();
                    self.state.lock().messages.push(ChatMessage::tool(body));
                }
            }
        }

        // Degraded completion, not a failure: return the last assistant
        // text with the phase unchanged.
        info!(max_turns = self.max_turns, "admin turn ceiling reached");
        Ok(self.finish(last_assistant_text, artifacts, metadata))
    }

    /// Execute one tool-call batch sequentially, applying side effects.
    async fn run_tool_batch(
        &self,
        calls: &[ToolCall],
        metadata: &mut ChatMetadata,
        artifacts: &mut Vec<Artifact>,
    ) -> BatchOutcome {
        let mut results = Vec::new();

        for call in calls {
            let ctx = ToolContext {
                tool_call_id: call.id.clone(),
                session_id: self.session_id.to_string(),
                active_task_id: self.state.lock().phase.context().active_task_id,
                cancellation: CancellationToken::new(),
            };

            if !metadata.tools_used.contains(&call.name) {
                metadata.tools_used.push(call.name.clone());
            }
            self.emit(|base| ForemanEvent::ToolExecutionStart {
                base,
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                arguments: Some(call.arguments.clone()),
            });
            if call.name == DELEGATE_TO_WORKER {
                self.emit(|base| ForemanEvent::DelegationStart {
                    base,
                    worker_type: delegated_worker_type(call),
                    objective: call
                        .arguments
                        .get("objective")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                });
            }

            let started = Instant::now();
            let result = self.registry.execute(call, &ctx).await;
            self.emit(|base| ForemanEvent::ToolExecutionEnd {
                base,
                tool_call_id: call.id.clone(),
                tool_name: call.name.clone(),
                duration_ms: started.elapsed().as_millis() as u64,
                is_error: !result.success,
            });

            self.apply_side_effects(call, &result, metadata, artifacts);

            if ToolRegistry::is_user_input_required(&call.name, &result) {
                // Earlier results in this batch are discarded, later calls
                // never run.
                return BatchOutcome::PausedForUser(result.summary);
            }

            results.push(json!({
                "toolCallId": call.id,
                "tool": call.name,
                "result": result,
            }));
        }

        BatchOutcome::Continue(results)
    }

    fn apply_side_effects(
        &self,
        call: &ToolCall,
        result: &foreman_core::tools::ToolResult,
        metadata: &mut ChatMetadata,
        artifacts: &mut Vec<Artifact>,
    ) {
        if !result.success {
            return;
        }

        match call.name.as_str() {
            DELEGATE_TO_WORKER => {
                metadata.delegations += 1;
                if let Ok(delegated) = serde_json::from_value::<Vec<Artifact>>(
                    result.data["artifacts"].clone(),
                ) {
                    artifacts.extend(delegated);
                }
                self.emit(|base| ForemanEvent::DelegationEnd {
                    base,
                    worker_type: delegated_worker_type(call),
                    success: result.data["success"].as_bool().unwrap_or(true),
                    turns_used: result.data["metadata"]["turnsUsed"]
                        .as_u64()
                        .unwrap_or_default() as u32,
                });
            }
            PLANNED_TASKS => self.apply_task_side_effects(call, result),
            _ => {}
        }
    }

    /// Task tool side effects drive the phase machine.
    fn apply_task_side_effects(
        &self,
        call: &ToolCall,
        result: &foreman_core::tools::ToolResult,
    ) {
        let action = call
            .arguments
            .get("action")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let task_id = result.data["taskId"].as_str().unwrap_or_default().to_string();
        let status: Option<TaskStatus> =
            serde_json::from_value(result.data["status"].clone()).ok();

        if !task_id.is_empty() {
            self.emit(|base| ForemanEvent::TaskUpdated {
                base,
                task_id: task_id.clone(),
                status: status.unwrap_or(TaskStatus::Pending),
                step_number: call
                    .arguments
                    .get("stepNumber")
                    .and_then(Value::as_u64)
                    .map(|n| n as u32),
            });
        }

        let mut state = self.state.lock();
        match action {
            // Creating a plan puts the session to work on it. The table
            // permits this from discovery as well as planning.
            "new_task"
                if !task_id.is_empty()
                    && state.phase.current_phase() != Phase::Execution
                    && state.phase.can_transition(Phase::Execution) =>
            {
                let from = state.phase.current_phase();
                if state.phase.transition_to(Phase::Execution, "task created").is_ok() {
                    state.phase.set_active_task(task_id.clone(), Some(1));
                    drop(state);
                    self.emit_phase_change(from, Phase::Execution, "task created");
                }
            }
            "update_task"
                if status == Some(TaskStatus::Completed)
                    && state.phase.current_phase() == Phase::Execution =>
            {
                if state.phase.transition_to(Phase::Delivery, "task completed").is_ok() {
                    drop(state);
                    self.emit_phase_change(Phase::Execution, Phase::Delivery, "task completed");
                }
            }
            _ => {}
        }
    }

    fn finish(
        &self,
        response: String,
        artifacts: Vec<Artifact>,
        metadata: ChatMetadata,
    ) -> ChatOutcome {
        let turns_used = metadata.turns_used;
        self.emit(|base| ForemanEvent::AgentEnd { base, turns_used });
        ChatOutcome {
            response,
            artifacts,
            conversation_phase: self.state.lock().phase.current_phase(),
            metadata,
        }
    }

    /// Status snapshot.
    pub fn status(&self) -> SessionStatus {
        let state = self.state.lock();
        SessionStatus {
            session_id: self.session_id.to_string(),
            phase: state.phase.context(),
            busy: self.busy.try_lock().is_err(),
            message_count: state.messages.len(),
        }
    }

    /// In-memory message history.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.state.lock().messages.clone()
    }

    /// Drop all history and reset the phase machine to discovery.
    pub async fn clear(&self) -> Result<(), RuntimeError> {
        {
            // Reset memory and invalidate in-flight flush batches before
            // touching the log, so a concurrent flush cannot write cleared
            // messages back.
            let mut state = self.state.lock();
            state.generation += 1;
            state.messages.clear();
            state.flushed = 0;
            state.phase = PhaseMachine::new();
        }
        self.history.clear(self.session_id.as_str()).await?;
        Ok(())
    }

    /// Subscribe to this session's event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ForemanEvent> {
        self.emitter.subscribe()
    }

    fn emit(&self, build: impl FnOnce(BaseEvent) -> ForemanEvent) {
        self.emitter.emit(build(BaseEvent::now(self.session_id.as_str())));
    }

    fn emit_phase_change(&self, from: Phase, to: Phase, reason: &str) {
        self.emit(|base| ForemanEvent::PhaseChanged {
            base,
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.to_string(),
        });
    }
}

enum BatchOutcome {
    /// All calls ran; results to reinject as one synthetic tool message.
    Continue(Vec<serde_json::Value>),
    /// An `ask_user` call occurred; its summary is the response.
    PausedForUser(String),
}

fn delegated_worker_type(call: &ToolCall) -> WorkerType {
    call.arguments
        .get("workerType")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
