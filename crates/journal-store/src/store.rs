use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::instrument;

use journal_core::ids::{new_id, now};

use crate::error::{Result, StoreError};
use crate::tx::Tx;
use crate::types::*;

/// Transactional, user-scoped persistence handle.
///
/// Wraps a single SQLite connection behind a `Mutex` — sufficient for the
/// single-node target this system is sized for.
pub struct Store {
    db: Mutex<Connection>,
}

impl Store {
    /// Wrap an already-open connection, creating the schema if absent.
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open every mutation for one HTTP request under a single transaction.
    pub fn begin(&self) -> Result<Tx<'_>> {
        Tx::begin(self.db.lock().expect("store mutex poisoned"))
    }

    /// Debug-mode cross-user guard: fails loudly instead of silently
    /// leaking another user's row.
    fn assert_owned(expected_user_id: &str, row_user_id: &str) {
        debug_assert_eq!(
            expected_user_id, row_user_id,
            "cross-user row access: expected user {expected_user_id}, got row for {row_user_id}"
        );
    }

    // ---------------------------------------------------------------- users

    #[instrument(skip(self, tx, password_hash))]
    pub fn create_user(
        &self,
        tx: &Tx<'_>,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<User> {
        let id = new_id();
        let ts = now();
        let existing: Option<i64> = tx
            .conn()
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1",
                params![username],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }
        tx.conn().execute(
            "INSERT INTO users (id, username, email, password_hash, is_active, is_verified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, 0, ?5, ?5)",
            params![id, username, email, password_hash, ts],
        )?;
        Ok(User {
            id,
            username: username.to_string(),
            email: email.map(String::from),
            password_hash: password_hash.to_string(),
            is_active: true,
            is_verified: false,
            created_at: ts.clone(),
            updated_at: ts,
        })
    }

    pub fn get_user_by_username(&self, tx: &Tx<'_>, username: &str) -> Result<Option<User>> {
        tx.conn()
            .query_row(
                "SELECT id, username, email, password_hash, is_active, is_verified, created_at, updated_at
                 FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn get_user_by_id(&self, tx: &Tx<'_>, user_id: &str) -> Result<Option<User>> {
        tx.conn()
            .query_row(
                "SELECT id, username, email, password_hash, is_active, is_verified, created_at, updated_at
                 FROM users WHERE id = ?1",
                params![user_id],
                row_to_user,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn deactivate_user(&self, tx: &Tx<'_>, user_id: &str) -> Result<()> {
        let ts = now();
        tx.conn().execute(
            "UPDATE users SET is_active = 0, updated_at = ?2 WHERE id = ?1",
            params![user_id, ts],
        )?;
        tx.conn().execute(
            "UPDATE auth_sessions SET revoked = 1, updated_at = ?2 WHERE user_id = ?1",
            params![user_id, ts],
        )?;
        Ok(())
    }

    // ---------------------------------------------------------- auth sessions

    #[instrument(skip(self, tx, token_hash))]
    pub fn create_auth_session(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        token_hash: &str,
        expires_at: &str,
        user_agent: Option<&str>,
        ip: Option<&str>,
    ) -> Result<AuthSession> {
        let id = new_id();
        let ts = now();
        tx.conn().execute(
            "INSERT INTO auth_sessions (id, user_id, token_hash, expires_at, revoked, user_agent, ip, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?7)",
            params![id, user_id, token_hash, expires_at, user_agent, ip, ts],
        )?;
        Ok(AuthSession {
            id,
            user_id: user_id.to_string(),
            token_hash: token_hash.to_string(),
            expires_at: expires_at.to_string(),
            revoked: false,
            user_agent: user_agent.map(String::from),
            ip: ip.map(String::from),
            created_at: ts.clone(),
            updated_at: ts,
        })
    }

    pub fn get_auth_session_by_token_hash(
        &self,
        tx: &Tx<'_>,
        token_hash: &str,
    ) -> Result<Option<AuthSession>> {
        tx.conn()
            .query_row(
                "SELECT id, user_id, token_hash, expires_at, revoked, user_agent, ip, created_at, updated_at
                 FROM auth_sessions WHERE token_hash = ?1",
                params![token_hash],
                row_to_auth_session,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn revoke_auth_session(&self, tx: &Tx<'_>, session_id: &str) -> Result<()> {
        tx.conn().execute(
            "UPDATE auth_sessions SET revoked = 1, updated_at = ?2 WHERE id = ?1",
            params![session_id, now()],
        )?;
        Ok(())
    }

    // ---------------------------------------------------------- preferences

    #[instrument(skip(self, tx))]
    pub fn get_or_create_preferences(&self, tx: &Tx<'_>, user_id: &str) -> Result<UserPreferences> {
        if let Some(p) = self.get_preferences(tx, user_id)? {
            return Ok(p);
        }
        let ts = now();
        let prefs = UserPreferences::default_for(user_id, &ts);
        tx.conn().execute(
            "INSERT INTO user_preferences
             (user_id, purpose_statement, long_term_goals, known_challenges, preferred_feedback_style, personal_glossary, created_at, updated_at)
             VALUES (?1, NULL, '[]', '[]', NULL, '{}', ?2, ?2)",
            params![user_id, ts],
        )?;
        Ok(prefs)
    }

    fn get_preferences(&self, tx: &Tx<'_>, user_id: &str) -> Result<Option<UserPreferences>> {
        tx.conn()
            .query_row(
                "SELECT user_id, purpose_statement, long_term_goals, known_challenges,
                        preferred_feedback_style, personal_glossary, created_at, updated_at
                 FROM user_preferences WHERE user_id = ?1",
                params![user_id],
                row_to_preferences,
            )
            .optional()
            .map_err(StoreError::from)?
            .transpose()
    }

    #[instrument(skip(self, tx, patch))]
    pub fn upsert_preferences(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        patch: &PreferencesPatch,
    ) -> Result<UserPreferences> {
        let mut current = self.get_or_create_preferences(tx, user_id)?;
        if let Some(v) = &patch.purpose_statement {
            current.purpose_statement = Some(v.clone());
        }
        if let Some(v) = &patch.long_term_goals {
            current.long_term_goals = v.clone();
        }
        if let Some(v) = &patch.known_challenges {
            current.known_challenges = v.clone();
        }
        if let Some(v) = &patch.preferred_feedback_style {
            current.preferred_feedback_style = Some(v.clone());
        }
        if let Some(v) = &patch.personal_glossary {
            for (k, val) in v {
                current.personal_glossary.insert(k.clone(), val.clone());
            }
        }
        current.updated_at = now();
        tx.conn().execute(
            "UPDATE user_preferences
             SET purpose_statement = ?2, long_term_goals = ?3, known_challenges = ?4,
                 preferred_feedback_style = ?5, personal_glossary = ?6, updated_at = ?7
             WHERE user_id = ?1",
            params![
                user_id,
                current.purpose_statement,
                serde_json::to_string(&current.long_term_goals)?,
                serde_json::to_string(&current.known_challenges)?,
                current.preferred_feedback_style,
                serde_json::to_string(&current.personal_glossary)?,
                current.updated_at,
            ],
        )?;
        Ok(current)
    }

    // ------------------------------------------------------------- templates

    #[instrument(skip(self, tx))]
    pub fn get_active_template(&self, tx: &Tx<'_>, user_id: &str) -> Result<Option<UserTemplate>> {
        tx.conn()
            .query_row(
                "SELECT id, user_id, name, sections, is_active, created_at, updated_at
                 FROM user_templates WHERE user_id = ?1 AND is_active = 1",
                params![user_id],
                row_to_template,
            )
            .optional()
            .map_err(StoreError::from)?
            .transpose()
    }

    /// Replaces the user's active template, deactivating any prior one
    /// (invariant: at most one active template per user).
    #[instrument(skip(self, tx, sections))]
    pub fn set_active_template(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        name: &str,
        sections: &[TemplateSection],
    ) -> Result<UserTemplate> {
        let ts = now();
        tx.conn().execute(
            "UPDATE user_templates SET is_active = 0, updated_at = ?2 WHERE user_id = ?1 AND is_active = 1",
            params![user_id, ts],
        )?;
        let id = new_id();
        let sections_json = serde_json::to_string(sections)?;
        tx.conn().execute(
            "INSERT INTO user_templates (id, user_id, name, sections, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![id, user_id, name, sections_json, ts],
        )?;
        Ok(UserTemplate {
            id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            sections: sections.to_vec(),
            is_active: true,
            created_at: ts.clone(),
            updated_at: ts,
        })
    }

    // --------------------------------------------------------- chat sessions

    #[instrument(skip(self, tx, metadata))]
    pub fn create_session(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        conversation_type: &str,
        metadata: Value,
    ) -> Result<ChatSession> {
        let id = new_id();
        let ts = now();
        tx.conn().execute(
            "INSERT INTO chat_sessions (id, user_id, conversation_type, is_active, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?5)",
            params![id, user_id, conversation_type, serde_json::to_string(&metadata)?, ts],
        )?;
        Ok(ChatSession {
            id,
            user_id: user_id.to_string(),
            conversation_type: conversation_type.to_string(),
            is_active: true,
            metadata,
            created_at: ts.clone(),
            updated_at: ts,
        })
    }

    #[instrument(skip(self, tx))]
    pub fn get_session_for_user(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<ChatSession>> {
        let row = tx
            .conn()
            .query_row(
                "SELECT id, user_id, conversation_type, is_active, metadata, created_at, updated_at
                 FROM chat_sessions WHERE id = ?1 AND user_id = ?2",
                params![session_id, user_id],
                row_to_session,
            )
            .optional()
            .map_err(StoreError::from)?
            .transpose()?;
        if let Some(s) = &row {
            Self::assert_owned(user_id, &s.user_id);
        }
        Ok(row)
    }

    pub fn list_sessions_for_user(&self, tx: &Tx<'_>, user_id: &str) -> Result<Vec<ChatSession>> {
        let mut stmt = tx.conn().prepare(
            "SELECT id, user_id, conversation_type, is_active, metadata, created_at, updated_at
             FROM chat_sessions WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_session)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(|inner| inner))
            .collect()
    }

    // --------------------------------------------------------- chat messages

    #[instrument(skip(self, tx, content, metadata))]
    pub fn append_message(
        &self,
        tx: &Tx<'_>,
        session_id: &str,
        role: MessageRole,
        content: &str,
        metadata: Value,
    ) -> Result<ChatMessage> {
        let id = new_id();
        let ts = now();
        tx.conn().execute(
            "INSERT INTO chat_messages (id, session_id, role, content, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, session_id, role.as_str(), content, serde_json::to_string(&metadata)?, ts],
        )?;
        Ok(ChatMessage {
            id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            metadata,
            created_at: ts,
        })
    }

    pub fn get_messages_ordered(&self, tx: &Tx<'_>, session_id: &str) -> Result<Vec<ChatMessage>> {
        let mut stmt = tx.conn().prepare(
            "SELECT id, session_id, role, content, metadata, created_at
             FROM chat_messages WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![session_id], row_to_message)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(|inner| inner))
            .collect()
    }

    pub fn count_messages(&self, tx: &Tx<'_>, session_id: &str) -> Result<i64> {
        tx.conn()
            .query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE session_id = ?1",
                params![session_id],
                |r| r.get(0),
            )
            .map_err(StoreError::from)
    }

    // -------------------------------------------------------------- drafts

    #[instrument(skip(self, tx))]
    pub fn get_or_create_draft(
        &self,
        tx: &Tx<'_>,
        session_id: &str,
        user_id: &str,
    ) -> Result<JournalDraft> {
        if let Some(d) = self.get_draft_by_session(tx, session_id)? {
            Self::assert_owned(user_id, &d.user_id);
            return Ok(d);
        }
        let id = new_id();
        let ts = now();
        tx.conn().execute(
            "INSERT INTO journal_drafts (id, session_id, user_id, draft_data, is_finalized, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, '{}', 0, '{}', ?4, ?4)",
            params![id, session_id, user_id, ts],
        )?;
        Ok(JournalDraft {
            id,
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            draft_data: serde_json::Map::new(),
            is_finalized: false,
            metadata: serde_json::json!({}),
            created_at: ts.clone(),
            updated_at: ts,
        })
    }

    fn get_draft_by_session(&self, tx: &Tx<'_>, session_id: &str) -> Result<Option<JournalDraft>> {
        tx.conn()
            .query_row(
                "SELECT id, session_id, user_id, draft_data, is_finalized, metadata, created_at, updated_at
                 FROM journal_drafts WHERE session_id = ?1 AND is_finalized = 0",
                params![session_id],
                row_to_draft,
            )
            .optional()
            .map_err(StoreError::from)?
            .transpose()
    }

    #[instrument(skip(self, tx, draft))]
    pub fn save_draft(&self, tx: &Tx<'_>, draft: &JournalDraft) -> Result<()> {
        let ts = now();
        tx.conn().execute(
            "UPDATE journal_drafts SET draft_data = ?2, metadata = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                draft.id,
                serde_json::to_string(&draft.draft_data)?,
                serde_json::to_string(&draft.metadata)?,
                ts
            ],
        )?;
        Ok(())
    }

    /// Atomically writes the finalized entry and clears the draft. Both
    /// statements run under the caller's open `tx`, so a mid-way failure
    /// rolls back the whole turn.
    #[instrument(skip(self, tx, entry))]
    pub fn insert_entry_and_clear_draft(
        &self,
        tx: &Tx<'_>,
        draft_id: &str,
        entry: &JournalEntry,
    ) -> Result<()> {
        tx.conn().execute(
            "INSERT INTO journal_entries (id, user_id, session_id, title, structured_data, raw_text, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.user_id,
                entry.session_id,
                entry.title,
                serde_json::to_string(&entry.structured_data)?,
                entry.raw_text,
                serde_json::to_string(&entry.metadata)?,
                entry.created_at,
            ],
        )?;
        tx.conn().execute(
            "UPDATE journal_drafts SET draft_data = '{}', is_finalized = 1, updated_at = ?2 WHERE id = ?1",
            params![draft_id, now()],
        )?;
        Ok(())
    }

    pub fn get_journal_entries(&self, tx: &Tx<'_>, user_id: &str) -> Result<Vec<JournalEntry>> {
        let mut stmt = tx.conn().prepare(
            "SELECT id, user_id, session_id, title, structured_data, raw_text, metadata, created_at
             FROM journal_entries WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_entry)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(|inner| inner))
            .collect()
    }

    pub fn get_journal_entry(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        entry_id: &str,
    ) -> Result<Option<JournalEntry>> {
        let row = tx
            .conn()
            .query_row(
                "SELECT id, user_id, session_id, title, structured_data, raw_text, metadata, created_at
                 FROM journal_entries WHERE id = ?1 AND user_id = ?2",
                params![entry_id, user_id],
                row_to_entry,
            )
            .optional()
            .map_err(StoreError::from)?
            .transpose()?;
        if let Some(e) = &row {
            Self::assert_owned(user_id, &e.user_id);
        }
        Ok(row)
    }

    // --------------------------------------------------------------- tasks

    pub fn list_tasks(&self, tx: &Tx<'_>, user_id: &str, include_completed: bool) -> Result<Vec<Task>> {
        let sql = if include_completed {
            "SELECT id, user_id, title, description, priority, is_completed, completed_at, due_date, source_session_id, created_at, updated_at
             FROM tasks WHERE user_id = ?1
             ORDER BY is_completed ASC, priority ASC, created_at ASC"
        } else {
            "SELECT id, user_id, title, description, priority, is_completed, completed_at, due_date, source_session_id, created_at, updated_at
             FROM tasks WHERE user_id = ?1 AND is_completed = 0
             ORDER BY priority ASC, created_at ASC"
        };
        let mut stmt = tx.conn().prepare(sql)?;
        let rows = stmt.query_map(params![user_id], row_to_task)?;
        rows.map(|r| r.map_err(StoreError::from).and_then(|inner| inner))
            .collect()
    }

    pub fn get_task(&self, tx: &Tx<'_>, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        let row = tx
            .conn()
            .query_row(
                "SELECT id, user_id, title, description, priority, is_completed, completed_at, due_date, source_session_id, created_at, updated_at
                 FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
                row_to_task,
            )
            .optional()
            .map_err(StoreError::from)?
            .transpose()?;
        if let Some(t) = &row {
            Self::assert_owned(user_id, &t.user_id);
        }
        Ok(row)
    }

    #[instrument(skip(self, tx))]
    pub fn create_task(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        title: &str,
        description: Option<&str>,
        priority: Option<i64>,
        due_date: Option<&str>,
        source_session_id: Option<&str>,
    ) -> Result<Task> {
        let count: i64 = tx.conn().query_row(
            "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND is_completed = 0",
            params![user_id],
            |r| r.get(0),
        )?;
        let priority = priority.unwrap_or(count + 1);
        if !(1..=count + 1).contains(&priority) {
            return Err(StoreError::Validation(format!(
                "priority must be between 1 and {}",
                count + 1
            )));
        }
        // Shift existing priorities at/after the insertion point to keep the
        // contiguous-sequence invariant.
        tx.conn().execute(
            "UPDATE tasks SET priority = priority + 1, updated_at = ?3
             WHERE user_id = ?1 AND is_completed = 0 AND priority >= ?2",
            params![user_id, priority, now()],
        )?;
        let id = new_id();
        let ts = now();
        tx.conn().execute(
            "INSERT INTO tasks (id, user_id, title, description, priority, is_completed, completed_at, due_date, source_session_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6, ?7, ?8, ?8)",
            params![id, user_id, title, description, priority, due_date, source_session_id, ts],
        )?;
        Ok(Task {
            id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: description.map(String::from),
            priority,
            is_completed: false,
            completed_at: None,
            due_date: due_date.map(String::from),
            source_session_id: source_session_id.map(String::from),
            created_at: ts.clone(),
            updated_at: ts,
        })
    }

    #[instrument(skip(self, tx, patch))]
    pub fn update_task(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        task_id: &str,
        patch: &TaskPatch,
    ) -> Result<Task> {
        let mut task = self
            .get_task(tx, user_id, task_id)?
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
        if let Some(v) = &patch.title {
            task.title = v.clone();
        }
        if patch.description.is_some() {
            task.description = patch.description.clone();
        }
        if patch.due_date.is_some() {
            task.due_date = patch.due_date.clone();
        }
        task.updated_at = now();
        tx.conn().execute(
            "UPDATE tasks SET title = ?2, description = ?3, priority = ?4, due_date = ?5, updated_at = ?6
             WHERE id = ?1",
            params![task.id, task.title, task.description, task.priority, task.due_date, task.updated_at],
        )?;
        Ok(task)
    }

    #[instrument(skip(self, tx))]
    pub fn complete_task(&self, tx: &Tx<'_>, user_id: &str, task_id: &str) -> Result<Task> {
        let mut task = self
            .get_task(tx, user_id, task_id)?
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))?;
        let ts = now();
        task.is_completed = true;
        task.completed_at = Some(ts.clone());
        task.updated_at = ts.clone();
        // priority is left intact; completed tasks fall out of the
        // incomplete ordering entirely rather than being renumbered.
        tx.conn().execute(
            "UPDATE tasks SET is_completed = 1, completed_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![task.id, ts],
        )?;
        self.recompact_priorities(tx, user_id)?;
        self.get_task(tx, user_id, task_id)?
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))
    }

    #[instrument(skip(self, tx))]
    pub fn delete_task(&self, tx: &Tx<'_>, user_id: &str, task_id: &str) -> Result<()> {
        let rows = tx.conn().execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("task {task_id}")));
        }
        self.recompact_priorities(tx, user_id)?;
        Ok(())
    }

    /// Renumbers incomplete tasks to `1..N` with no gaps, preserving
    /// relative order.
    fn recompact_priorities(&self, tx: &Tx<'_>, user_id: &str) -> Result<()> {
        let ids: Vec<String> = {
            let mut stmt = tx.conn().prepare(
                "SELECT id FROM tasks WHERE user_id = ?1 AND is_completed = 0 ORDER BY priority ASC, created_at ASC",
            )?;
            let rows = stmt.query_map(params![user_id], |r| r.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        let ts = now();
        for (idx, id) in ids.iter().enumerate() {
            tx.conn().execute(
                "UPDATE tasks SET priority = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, (idx + 1) as i64, ts],
            )?;
        }
        Ok(())
    }

    /// Applies a reorder iff `orderings` is a bijection between the
    /// incomplete task ids and `1..N`.
    #[instrument(skip(self, tx, orderings))]
    pub fn reorder_tasks(&self, tx: &Tx<'_>, user_id: &str, orderings: &[TaskOrder]) -> Result<()> {
        let incomplete: Vec<String> = {
            let mut stmt = tx
                .conn()
                .prepare("SELECT id FROM tasks WHERE user_id = ?1 AND is_completed = 0")?;
            let rows = stmt.query_map(params![user_id], |r| r.get::<_, String>(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let n = incomplete.len();
        let mut seen_ids = std::collections::HashSet::new();
        let mut seen_priorities = std::collections::HashSet::new();
        for o in orderings {
            if !incomplete.contains(&o.task_id) {
                return Err(StoreError::Conflict(format!(
                    "reorder references unknown or completed task {}",
                    o.task_id
                )));
            }
            if !seen_ids.insert(o.task_id.clone()) {
                return Err(StoreError::Conflict(format!(
                    "reorder lists task {} more than once",
                    o.task_id
                )));
            }
            if o.new_priority < 1 || o.new_priority as usize > n {
                return Err(StoreError::Conflict(format!(
                    "reorder priority {} out of range 1..{n}",
                    o.new_priority
                )));
            }
            if !seen_priorities.insert(o.new_priority) {
                return Err(StoreError::Conflict(format!(
                    "reorder priority {} used more than once",
                    o.new_priority
                )));
            }
        }
        if orderings.len() != n || seen_ids.len() != n {
            return Err(StoreError::Conflict(
                "reorder must cover every incomplete task exactly once".to_string(),
            ));
        }

        let ts = now();
        for o in orderings {
            tx.conn().execute(
                "UPDATE tasks SET priority = ?2, updated_at = ?3 WHERE id = ?1",
                params![o.task_id, o.new_priority, ts],
            )?;
        }
        Ok(())
    }
}

// ------------------------------------------------------------- row mappers

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        is_verified: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_auth_session(row: &Row<'_>) -> rusqlite::Result<AuthSession> {
    Ok(AuthSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        token_hash: row.get(2)?,
        expires_at: row.get(3)?,
        revoked: row.get::<_, i64>(4)? != 0,
        user_agent: row.get(5)?,
        ip: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_preferences(row: &Row<'_>) -> rusqlite::Result<Result<UserPreferences>> {
    let goals_json: String = row.get(2)?;
    let challenges_json: String = row.get(3)?;
    let glossary_json: String = row.get(5)?;
    Ok((|| -> Result<UserPreferences> {
        Ok(UserPreferences {
            user_id: row.get(0)?,
            purpose_statement: row.get(1)?,
            long_term_goals: serde_json::from_str(&goals_json)?,
            known_challenges: serde_json::from_str(&challenges_json)?,
            preferred_feedback_style: row.get(4)?,
            personal_glossary: serde_json::from_str(&glossary_json)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    })())
}

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<Result<UserTemplate>> {
    let sections_json: String = row.get(3)?;
    Ok((|| -> Result<UserTemplate> {
        Ok(UserTemplate {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            sections: serde_json::from_str(&sections_json)?,
            is_active: row.get::<_, i64>(4)? != 0,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    })())
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Result<ChatSession>> {
    let metadata_json: String = row.get(4)?;
    Ok((|| -> Result<ChatSession> {
        Ok(ChatSession {
            id: row.get(0)?,
            user_id: row.get(1)?,
            conversation_type: row.get(2)?,
            is_active: row.get::<_, i64>(3)? != 0,
            metadata: serde_json::from_str(&metadata_json)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    })())
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Result<ChatMessage>> {
    let role_str: String = row.get(2)?;
    let metadata_json: String = row.get(4)?;
    Ok((|| -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: row.get(0)?,
            session_id: row.get(1)?,
            role: role_str
                .parse()
                .map_err(StoreError::Validation)?,
            content: row.get(3)?,
            metadata: serde_json::from_str(&metadata_json)?,
            created_at: row.get(5)?,
        })
    })())
}

fn row_to_draft(row: &Row<'_>) -> rusqlite::Result<Result<JournalDraft>> {
    let draft_json: String = row.get(3)?;
    let metadata_json: String = row.get(5)?;
    Ok((|| -> Result<JournalDraft> {
        Ok(JournalDraft {
            id: row.get(0)?,
            session_id: row.get(1)?,
            user_id: row.get(2)?,
            draft_data: serde_json::from_str(&draft_json)?,
            is_finalized: row.get::<_, i64>(4)? != 0,
            metadata: serde_json::from_str(&metadata_json)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    })())
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Result<JournalEntry>> {
    let structured_json: String = row.get(4)?;
    let metadata_json: String = row.get(6)?;
    Ok((|| -> Result<JournalEntry> {
        Ok(JournalEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            session_id: row.get(2)?,
            title: row.get(3)?,
            structured_data: serde_json::from_str(&structured_json)?,
            raw_text: row.get(5)?,
            metadata: serde_json::from_str(&metadata_json)?,
            created_at: row.get(7)?,
        })
    })())
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Result<Task>> {
    Ok((|| -> Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            priority: row.get(4)?,
            is_completed: row.get::<_, i64>(5)? != 0,
            completed_at: row.get(6)?,
            due_date: row.get(7)?,
            source_session_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    })())
}
