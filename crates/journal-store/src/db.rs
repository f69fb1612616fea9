use rusqlite::Connection;

use crate::error::Result;

/// Initialise the full schema in `conn`. Idempotent — safe to call on every
/// startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT    NOT NULL PRIMARY KEY,
            username        TEXT    NOT NULL UNIQUE,
            email           TEXT    UNIQUE,
            password_hash   TEXT    NOT NULL,
            is_active       INTEGER NOT NULL DEFAULT 1,
            is_verified     INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS auth_sessions (
            id              TEXT    NOT NULL PRIMARY KEY,
            user_id         TEXT    NOT NULL REFERENCES users(id),
            token_hash      TEXT    NOT NULL,
            expires_at      TEXT    NOT NULL,
            revoked         INTEGER NOT NULL DEFAULT 0,
            user_agent      TEXT,
            ip              TEXT,
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_auth_sessions_token_hash ON auth_sessions (token_hash);
        CREATE INDEX IF NOT EXISTS idx_auth_sessions_user_id ON auth_sessions (user_id);

        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id                  TEXT NOT NULL PRIMARY KEY REFERENCES users(id),
            purpose_statement        TEXT,
            long_term_goals          TEXT NOT NULL DEFAULT '[]',
            known_challenges         TEXT NOT NULL DEFAULT '[]',
            preferred_feedback_style TEXT,
            personal_glossary        TEXT NOT NULL DEFAULT '{}',
            created_at               TEXT NOT NULL,
            updated_at               TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_templates (
            id              TEXT    NOT NULL PRIMARY KEY,
            user_id         TEXT    NOT NULL REFERENCES users(id),
            name            TEXT    NOT NULL,
            sections        TEXT    NOT NULL DEFAULT '[]',
            is_active       INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_user_templates_user_id ON user_templates (user_id);

        CREATE TABLE IF NOT EXISTS chat_sessions (
            id                  TEXT    NOT NULL PRIMARY KEY,
            user_id             TEXT    NOT NULL REFERENCES users(id),
            conversation_type   TEXT    NOT NULL DEFAULT 'journaling',
            is_active           INTEGER NOT NULL DEFAULT 1,
            metadata            TEXT    NOT NULL DEFAULT '{}',
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_sessions_user_id ON chat_sessions (user_id);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id              TEXT    NOT NULL PRIMARY KEY,
            session_id      TEXT    NOT NULL REFERENCES chat_sessions(id),
            role            TEXT    NOT NULL,
            content         TEXT    NOT NULL,
            metadata        TEXT    NOT NULL DEFAULT '{}',
            created_at      TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_messages_session_id_created_at
            ON chat_messages (session_id, created_at);

        CREATE TABLE IF NOT EXISTS journal_drafts (
            id              TEXT    NOT NULL PRIMARY KEY,
            session_id      TEXT    NOT NULL UNIQUE REFERENCES chat_sessions(id),
            user_id         TEXT    NOT NULL REFERENCES users(id),
            draft_data      TEXT    NOT NULL DEFAULT '{}',
            is_finalized    INTEGER NOT NULL DEFAULT 0,
            metadata        TEXT    NOT NULL DEFAULT '{}',
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS journal_entries (
            id                  TEXT    NOT NULL PRIMARY KEY,
            user_id             TEXT    NOT NULL REFERENCES users(id),
            session_id          TEXT    REFERENCES chat_sessions(id),
            title               TEXT    NOT NULL,
            structured_data     TEXT    NOT NULL DEFAULT '{}',
            raw_text            TEXT,
            metadata            TEXT    NOT NULL DEFAULT '{}',
            created_at          TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_journal_entries_user_id ON journal_entries (user_id, created_at);

        CREATE TABLE IF NOT EXISTS tasks (
            id                  TEXT    NOT NULL PRIMARY KEY,
            user_id             TEXT    NOT NULL REFERENCES users(id),
            title               TEXT    NOT NULL,
            description         TEXT,
            priority            INTEGER NOT NULL,
            is_completed        INTEGER NOT NULL DEFAULT 0,
            completed_at        TEXT,
            due_date            TEXT,
            source_session_id   TEXT,
            created_at          TEXT    NOT NULL,
            updated_at          TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks (user_id, is_completed, priority);
        ",
    )?;
    Ok(())
}
