use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    config::AgentConfig,
    conversation::{Session, ToolCall, Turn},
    format_duration,
    llm::{ChatModel, ModelError, ModelReply, prompts::SYSTEM_PROMPT},
    preview,
    tools::ToolSet,
};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("gave up after {rounds} tool-call rounds without a final answer")]
    RoundLimit { rounds: usize },
}

/// Steps reported to `respond_with` callers while a reply is being built.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    ModelCall { round: usize },
    ToolCall { name: String, arguments: Value },
    ToolResult { name: String, ok: bool, preview: String },
    Answer,
}

#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Value,
    pub ok: bool,
    pub output: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct AgentReply {
    pub answer: String,
    /// Model calls made for this utterance.
    pub rounds: usize,
    pub tool_calls: Vec<ToolCallRecord>,
}

pub struct Agent<M: ChatModel> {
    model: M,
    tools: ToolSet,
    config: AgentConfig,
    system_prompt: String,
}

impl<M: ChatModel> Agent<M> {
    pub fn new(model: M, tools: ToolSet, mut config: AgentConfig) -> Self {
        config.max_tool_rounds = config.max_tool_rounds.max(1);
        let system_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| SYSTEM_PROMPT.to_string());

        Self {
            model,
            tools,
            config,
            system_prompt,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub async fn respond(
        &self,
        session: &mut Session,
        utterance: &str,
    ) -> Result<AgentReply, AgentError> {
        self.respond_with(session, utterance, |_| {}).await
    }

    /// Answers one user utterance, running tool rounds until the model replies
    /// without tool calls. On error the session is restored to where it was
    /// before the utterance.
    pub async fn respond_with<F>(
        &self,
        session: &mut Session,
        utterance: &str,
        on_event: F,
    ) -> Result<AgentReply, AgentError>
    where
        F: FnMut(&AgentEvent) + Send,
    {
        if session.ensure_system_prompt(&self.system_prompt) {
            debug!(prompt_len = self.system_prompt.len(), "system_init");
        }
        let checkpoint = session.len();

        let span = info_span!("respond", model = %self.model.name());
        let result = self
            .run_rounds(session, utterance, on_event)
            .instrument(span)
            .await;

        if let Err(err) = &result {
            warn!(
                error = %err,
                dropped_turns = session.len().saturating_sub(checkpoint),
                "respond_failed"
            );
            session.truncate(checkpoint);
        }

        result
    }

    async fn run_rounds<F>(
        &self,
        session: &mut Session,
        utterance: &str,
        mut on_event: F,
    ) -> Result<AgentReply, AgentError>
    where
        F: FnMut(&AgentEvent) + Send,
    {
        let started = Instant::now();
        let definitions = self.tools.definitions();
        let mut records = Vec::new();

        info!(utterance = %preview(utterance, 200), "user_turn");
        session.push(Turn::User(utterance.to_string()));

        for round in 1..=self.config.max_tool_rounds {
            on_event(&AgentEvent::ModelCall { round });
            let call_started = Instant::now();
            let reply = self.model.complete(session.turns(), &definitions).await?;

            match reply {
                ModelReply::Final(answer) => {
                    info!(
                        round,
                        answer_len = answer.len(),
                        elapsed = %format_duration(call_started.elapsed()),
                        "model_answer"
                    );
                    session.push(Turn::assistant(answer.clone()));
                    on_event(&AgentEvent::Answer);

                    info!(
                        rounds = round,
                        tool_calls = records.len(),
                        elapsed = %format_duration(started.elapsed()),
                        "respond_done"
                    );
                    return Ok(AgentReply {
                        answer,
                        rounds: round,
                        tool_calls: records,
                    });
                }
                ModelReply::ToolCalls { content, calls } => {
                    info!(
                        round,
                        call_count = calls.len(),
                        elapsed = %format_duration(call_started.elapsed()),
                        "model_tool_calls"
                    );
                    session.push(Turn::Assistant {
                        content,
                        tool_calls: calls.clone(),
                    });

                    for call in &calls {
                        let record = self.run_tool(session, call, &mut on_event);
                        records.push(record);
                    }
                }
            }
        }

        Err(AgentError::RoundLimit {
            rounds: self.config.max_tool_rounds,
        })
    }

    fn run_tool<F>(&self, session: &mut Session, call: &ToolCall, on_event: &mut F) -> ToolCallRecord
    where
        F: FnMut(&AgentEvent),
    {
        on_event(&AgentEvent::ToolCall {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });

        let started = Instant::now();
        let (ok, output) = match self.tools.execute(call) {
            Ok(output) => (true, output),
            Err(err) => (false, format!("Error: {err}")),
        };
        let elapsed = started.elapsed();

        on_event(&AgentEvent::ToolResult {
            name: call.name.clone(),
            ok,
            preview: preview(&output, 200),
        });
        debug!(
            tool = %call.name,
            ok,
            elapsed = %format_duration(elapsed),
            "tool_turn"
        );

        session.push(Turn::Tool {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content: output.clone(),
            is_error: !ok,
        });

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            ok,
            output,
            elapsed,
        }
    }
}
