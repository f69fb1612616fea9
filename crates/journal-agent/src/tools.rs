use serde_json::Value;
use tracing::instrument;

use journal_drafts::DraftEngine;
use journal_store::types::{JournalDraft, PreferencesPatch};
use journal_store::{Store, Tx};
use journal_tasks::TaskManager;
use journal_templates::TemplateProvider;

use crate::error::Result;
use crate::llm::{LlmClient, ToolDefinition};
use crate::structurer::Structurer;

/// Everything a tool handler needs, scoped to one turn.
pub struct ToolContext<'a> {
    pub store: &'a Store,
    pub tx: &'a Tx<'a>,
    pub templates: &'a TemplateProvider,
    pub tasks: &'a TaskManager,
    pub user_id: String,
    pub session_id: String,
}

/// Text handed back to the model as this call's `tool_result`, plus the
/// draft snapshot after the call (unchanged for tools that don't touch it).
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
    pub draft: JournalDraft,
}

impl ToolOutcome {
    fn ok(content: impl Into<String>, draft: JournalDraft) -> Self {
        Self { content: content.into(), is_error: false, draft }
    }

    fn err(content: impl Into<String>, draft: JournalDraft) -> Self {
        Self { content: content.into(), is_error: true, draft }
    }
}

/// The fixed tool set for `conversation_type = "journaling"`.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "structure_journal".into(),
            description: "Classify raw user text into the active template's sections and merge it into the session draft.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        },
        ToolDefinition {
            name: "save_journal".into(),
            description: "Finalize the session draft into a journal entry. Only call this once the user has confirmed.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"confirm": {"type": "boolean"}},
                "required": ["confirm"]
            }),
        },
        ToolDefinition {
            name: "update_preferences".into(),
            description: "Update the user's journaling preferences (purpose, goals, challenges, feedback style, glossary).".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "purpose_statement": {"type": "string"},
                    "long_term_goals": {"type": "array", "items": {"type": "string"}},
                    "known_challenges": {"type": "array", "items": {"type": "string"}},
                    "preferred_feedback_style": {"type": "string"},
                    "personal_glossary": {"type": "object"}
                }
            }),
        },
        ToolDefinition {
            name: "get_template_info".into(),
            description: "Return the active template's section catalogue.".into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "reload_template".into(),
            description: "Refresh the process-wide default template.".into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "create_task".into(),
            description: "Create a task on the user's task list.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "priority": {"type": "integer"},
                    "due_date": {"type": "string"}
                },
                "required": ["title"]
            }),
        },
        ToolDefinition {
            name: "list_tasks".into(),
            description: "List the user's tasks in canonical order.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"include_completed": {"type": "boolean"}}
            }),
        },
        ToolDefinition {
            name: "complete_task".into(),
            description: "Mark a task completed.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"task_id": {"type": "string"}},
                "required": ["task_id"]
            }),
        },
        ToolDefinition {
            name: "delete_task".into(),
            description: "Delete a task.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {"task_id": {"type": "string"}},
                "required": ["task_id"]
            }),
        },
    ]
}

/// Runs one named tool call. Each handler below wraps its own database
/// writes in a savepoint so a failing call rolls back only its own effect;
/// the turn (and the rest of its tool calls) continues regardless.
#[instrument(skip(ctx, llm, draft, input))]
pub async fn dispatch(
    ctx: &ToolContext<'_>,
    llm: &dyn LlmClient,
    draft: JournalDraft,
    name: &str,
    input: Value,
) -> ToolOutcome {
    let before = draft.clone();
    let result = match name {
        "structure_journal" => structure_journal(ctx, llm, draft, input).await,
        "save_journal" => save_journal(ctx, draft, input),
        "update_preferences" => update_preferences(ctx, draft, input),
        "get_template_info" => get_template_info(ctx, draft),
        "reload_template" => reload_template(ctx, draft),
        "create_task" => create_task(ctx, draft, input).await,
        "list_tasks" => list_tasks(ctx, draft, input).await,
        "complete_task" => complete_task(ctx, draft, input).await,
        "delete_task" => delete_task(ctx, draft, input).await,
        other => Ok(ToolOutcome::err(format!("unknown tool: {other}"), before.clone())),
    };
    result.unwrap_or_else(|e| ToolOutcome::err(e.to_string(), before))
}

async fn structure_journal(
    ctx: &ToolContext<'_>,
    llm: &dyn LlmClient,
    draft: JournalDraft,
    input: Value,
) -> Result<ToolOutcome> {
    let Some(text) = input.get("text").and_then(|v| v.as_str()) else {
        return Ok(ToolOutcome::err("'text' is required", draft));
    };
    let sections = ctx.templates.effective_sections(ctx.store, ctx.tx, &ctx.user_id)?;
    let structurer = Structurer::new(llm);
    let patch = structurer.structure(text, &sections).await?;
    if patch.is_empty() {
        return Ok(ToolOutcome::ok("no structurable content found", draft));
    }
    let keys: Vec<String> = patch.keys().cloned().collect();
    let updated = ctx.tx.savepoint("structure_journal", |_conn| -> Result<JournalDraft> {
        Ok(DraftEngine::merge_patch(ctx.store, ctx.tx, draft, patch, &sections)?)
    })?;
    Ok(ToolOutcome::ok(format!("updated sections: {}", keys.join(", ")), updated))
}

fn save_journal(ctx: &ToolContext<'_>, draft: JournalDraft, input: Value) -> Result<ToolOutcome> {
    let confirm = input.get("confirm").and_then(|v| v.as_bool()).unwrap_or(false);
    if !confirm {
        return Ok(ToolOutcome::ok("not saved: confirm must be true", draft));
    }
    if draft.draft_data.is_empty() {
        return Ok(ToolOutcome::err("draft is empty, nothing to save", draft));
    }
    ctx.tx.savepoint("save_journal", |_conn| -> Result<ToolOutcome> {
        let entry = DraftEngine::finalize(ctx.store, ctx.tx, draft)?;
        let fresh = DraftEngine::load(ctx.store, ctx.tx, &ctx.session_id, &ctx.user_id)?;
        Ok(ToolOutcome::ok(format!("saved as entry {}", entry.id), fresh))
    })
}

fn update_preferences(ctx: &ToolContext<'_>, draft: JournalDraft, input: Value) -> Result<ToolOutcome> {
    let patch: PreferencesPatch =
        serde_json::from_value(input.get("updates").cloned().unwrap_or(input)).unwrap_or_default();
    ctx.tx.savepoint("update_preferences", |_conn| -> Result<()> {
        ctx.store.upsert_preferences(ctx.tx, &ctx.user_id, &patch)?;
        Ok(())
    })?;
    Ok(ToolOutcome::ok("preferences updated", draft))
}

fn get_template_info(ctx: &ToolContext<'_>, draft: JournalDraft) -> Result<ToolOutcome> {
    let sections = ctx.templates.effective_sections(ctx.store, ctx.tx, &ctx.user_id)?;
    let text = serde_json::to_string(&sections).map_err(journal_store::StoreError::from)?;
    Ok(ToolOutcome::ok(text, draft))
}

fn reload_template(ctx: &ToolContext<'_>, draft: JournalDraft) -> Result<ToolOutcome> {
    ctx.templates.reload()?;
    Ok(ToolOutcome::ok("default template reloaded", draft))
}

async fn create_task(ctx: &ToolContext<'_>, draft: JournalDraft, input: Value) -> Result<ToolOutcome> {
    let Some(title) = input.get("title").and_then(|v| v.as_str()) else {
        return Ok(ToolOutcome::err("'title' is required", draft));
    };
    let description = input.get("description").and_then(|v| v.as_str());
    let priority = input.get("priority").and_then(|v| v.as_i64());
    let due_date = input.get("due_date").and_then(|v| v.as_str());
    let task = ctx
        .tasks
        .create_task(ctx.store, ctx.tx, &ctx.user_id, title, description, priority, due_date, Some(&ctx.session_id))
        .await?;
    Ok(ToolOutcome::ok(format!("created task {} at priority {}", task.id, task.priority), draft))
}

async fn list_tasks(ctx: &ToolContext<'_>, draft: JournalDraft, input: Value) -> Result<ToolOutcome> {
    let include_completed = input.get("include_completed").and_then(|v| v.as_bool()).unwrap_or(false);
    let tasks = ctx.tasks.list_tasks(ctx.store, ctx.tx, &ctx.user_id, include_completed).await?;
    let text = serde_json::to_string(&tasks).map_err(journal_store::StoreError::from)?;
    Ok(ToolOutcome::ok(text, draft))
}

async fn complete_task(ctx: &ToolContext<'_>, draft: JournalDraft, input: Value) -> Result<ToolOutcome> {
    let Some(task_id) = input.get("task_id").and_then(|v| v.as_str()) else {
        return Ok(ToolOutcome::err("'task_id' is required", draft));
    };
    let task = ctx.tasks.complete_task(ctx.store, ctx.tx, &ctx.user_id, task_id).await?;
    Ok(ToolOutcome::ok(format!("task {} completed", task.id), draft))
}

async fn delete_task(ctx: &ToolContext<'_>, draft: JournalDraft, input: Value) -> Result<ToolOutcome> {
    let Some(task_id) = input.get("task_id").and_then(|v| v.as_str()) else {
        return Ok(ToolOutcome::err("'task_id' is required", draft));
    };
    ctx.tasks.delete_task(ctx.store, ctx.tx, &ctx.user_id, task_id).await?;
    Ok(ToolOutcome::ok(format!("task {task_id} deleted"), draft))
}
