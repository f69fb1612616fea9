use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: String,
    pub revoked: bool,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub purpose_statement: Option<String>,
    #[serde(default)]
    pub long_term_goals: Vec<String>,
    #[serde(default)]
    pub known_challenges: Vec<String>,
    pub preferred_feedback_style: Option<String>,
    #[serde(default)]
    pub personal_glossary: HashMap<String, String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserPreferences {
    /// Defaults for a lazily-created row.
    pub fn default_for(user_id: &str, now: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            purpose_statement: None,
            long_term_goals: Vec::new(),
            known_challenges: Vec::new(),
            preferred_feedback_style: None,
            personal_glossary: HashMap::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Partial update payload accepted by `POST /user/preferences` and the
/// `update_preferences` tool. List fields replace; the glossary map merges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesPatch {
    #[serde(default)]
    pub purpose_statement: Option<String>,
    #[serde(default)]
    pub long_term_goals: Option<Vec<String>>,
    #[serde(default)]
    pub known_challenges: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_feedback_style: Option<String>,
    #[serde(default)]
    pub personal_glossary: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSection {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTemplate {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub sections: Vec<TemplateSection>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(format!("unknown message role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub conversation_type: String,
    pub is_active: bool,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalDraft {
    pub id: String,
    pub session_id: String,
    pub user_id: String,
    pub draft_data: serde_json::Map<String, Value>,
    pub is_finalized: bool,
    /// Side-channel notes (e.g. unknown-section warnings) that are not
    /// themselves draft content.
    #[serde(default)]
    pub metadata: Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub title: String,
    pub structured_data: serde_json::Map<String, Value>,
    pub raw_text: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: i64,
    pub is_completed: bool,
    pub completed_at: Option<String>,
    pub due_date: Option<String>,
    pub source_session_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Partial update accepted by `PUT /tasks/{id}`. Priority is deliberately
/// not settable here — only `create_task`, `complete_task`/`delete_task`
/// (via recompaction), and `reorder_tasks` may change it, so the
/// contiguous-sequence invariant always goes through code that maintains it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// One entry of a `POST /tasks/reorder` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOrder {
    pub task_id: String,
    pub new_priority: i64,
}
