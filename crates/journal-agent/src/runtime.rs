use std::time::Duration;

use serde_json::Value;
use tracing::{info, instrument, warn};

use journal_drafts::DraftEngine;
use journal_store::types::MessageRole;
use journal_store::{Store, Tx};
use journal_tasks::TaskManager;
use journal_templates::TemplateProvider;

use crate::error::{AgentError, Result};
use crate::llm::{LlmClient, LlmError, Message, Role, ToolDefinition};
use crate::tools::{self, ToolContext};

/// Bounded per-turn tool-call budget.
const TOOL_CALL_BUDGET: usize = 8;

/// Backoff schedule for transport-error retries.
const RETRY_BACKOFF_MS: [u64; 2] = [100, 400];

const BASE_SYSTEM_PROMPT: &str = "You are a journaling assistant. Help the user reflect on \
their day, capture structured notes, and keep their task list current. Use the available \
tools to record content rather than only replying in text.";

/// One turn's reply, ready to hand back across the HTTP edge.
pub struct TurnResult {
    pub text: String,
    pub session_id: String,
    pub updated_draft_data: serde_json::Map<String, Value>,
    pub tool_calls: Vec<ToolCallRecord>,
    pub overflow: bool,
}

pub struct ToolCallRecord {
    pub name: String,
    pub input: Value,
    pub output: String,
    pub is_error: bool,
}

/// Builds `AgentContext`, drives the tool-call loop, and persists messages
/// for one user turn.
pub struct AgentRuntime {
    llm: Box<dyn LlmClient>,
}

impl AgentRuntime {
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Retries transport errors only, never an API rejection (never on a
    /// 4xx from the model), and never a timeout (it already waited the
    /// full hard timeout once).
    async fn complete_with_retry(
        &self,
        system: &str,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<crate::llm::LlmResponse> {
        let mut attempt = 0usize;
        loop {
            match self.llm.complete(system, history, tools).await {
                Ok(r) => return Ok(r),
                Err(LlmError::Timeout) => return Err(AgentError::UpstreamTimeout),
                Err(LlmError::Transport(e)) if attempt < RETRY_BACKOFF_MS.len() => {
                    warn!(attempt, error = %e, "LLM transport error, retrying");
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS[attempt])).await;
                    attempt += 1;
                }
                Err(e) => return Err(AgentError::UpstreamUnavailable(e.to_string())),
            }
        }
    }

    #[instrument(skip(self, store, tx, templates, tasks, utterance))]
    #[allow(clippy::too_many_arguments)]
    pub async fn turn(
        &self,
        store: &Store,
        tx: &Tx<'_>,
        templates: &TemplateProvider,
        tasks: &TaskManager,
        user_id: &str,
        session_id: &str,
        utterance: &str,
    ) -> Result<TurnResult> {
        store
            .get_session_for_user(tx, user_id, session_id)?
            .ok_or_else(|| AgentError::NotFound(format!("session {session_id}")))?;

        store.get_or_create_preferences(tx, user_id)?;
        let sections = templates.effective_sections(store, tx, user_id)?;
        let mut draft = DraftEngine::load(store, tx, session_id, user_id)?;
        let history_rows = store.get_messages_ordered(tx, session_id)?;

        // Persist the incoming utterance first so the turn is never lost
        // even if the LLM call that follows fails.
        store.append_message(tx, session_id, MessageRole::User, utterance, serde_json::json!({}))?;

        let empty_sections: Vec<&str> = sections
            .iter()
            .filter(|s| !draft.draft_data.contains_key(&s.name))
            .map(|s| s.name.as_str())
            .collect();
        let system = if empty_sections.is_empty() {
            BASE_SYSTEM_PROMPT.to_string()
        } else {
            format!(
                "{BASE_SYSTEM_PROMPT}\n\nSections still empty this session: {}.",
                empty_sections.join(", ")
            )
        };

        let mut history: Vec<Message> = history_rows
            .iter()
            .map(|m| Message {
                role: match m.role {
                    MessageRole::User => Role::User,
                    MessageRole::Assistant | MessageRole::System => Role::Assistant,
                },
                content: m.content.clone(),
            })
            .collect();
        history.push(Message { role: Role::User, content: utterance.to_string() });

        let ctx = ToolContext {
            store,
            tx,
            templates,
            tasks,
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        };
        let tool_defs = tools::definitions();

        let mut calls_made = 0usize;
        let mut overflow = false;
        let mut tool_calls = Vec::new();
        let mut reply_text = String::new();

        loop {
            let response = self.complete_with_retry(&system, &history, &tool_defs).await?;

            if response.tool_calls.is_empty() {
                reply_text = response.text;
                break;
            }
            if calls_made >= TOOL_CALL_BUDGET {
                warn!(session_id, "tool-call budget exhausted");
                overflow = true;
                reply_text = response.text;
                break;
            }

            history.push(Message { role: Role::Assistant, content: response.text });

            for call in &response.tool_calls {
                if calls_made >= TOOL_CALL_BUDGET {
                    overflow = true;
                    break;
                }
                let outcome =
                    tools::dispatch(&ctx, self.llm.as_ref(), draft.clone(), &call.name, call.input.clone()).await;
                draft = outcome.draft.clone();
                calls_made += 1;
                history.push(Message {
                    role: Role::User,
                    content: format!("[tool_result:{}] {}", call.name, outcome.content),
                });
                tool_calls.push(ToolCallRecord {
                    name: call.name.clone(),
                    input: call.input.clone(),
                    output: outcome.content,
                    is_error: outcome.is_error,
                });
            }

            if overflow {
                break;
            }
        }

        if overflow && reply_text.trim().is_empty() {
            reply_text = "I've made several updates but reached my tool-call limit for this turn — \
let me know if you'd like to continue."
                .to_string();
        }

        let metadata = serde_json::json!({
            "overflow": overflow,
            "tool_calls": tool_calls.iter().map(|t| serde_json::json!({
                "name": t.name,
                "is_error": t.is_error,
            })).collect::<Vec<_>>(),
        });
        store.append_message(tx, session_id, MessageRole::Assistant, &reply_text, metadata)?;

        info!(session_id, calls_made, overflow, "turn complete");

        Ok(TurnResult {
            text: reply_text,
            session_id: session_id.to_string(),
            updated_draft_data: draft.draft_data,
            tool_calls,
            overflow,
        })
    }
}
