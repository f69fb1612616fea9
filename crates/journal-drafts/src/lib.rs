pub mod error;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

use journal_store::types::{JournalDraft, JournalEntry, TemplateSection};
use journal_store::{Store, Tx};

pub use error::{DraftError, Result};

/// Owns the per-session working draft.
pub struct DraftEngine;

impl DraftEngine {
    /// Loads the session's draft, creating an empty one if none exists yet.
    #[instrument(skip(store, tx))]
    pub fn load(store: &Store, tx: &Tx<'_>, session_id: &str, user_id: &str) -> Result<JournalDraft> {
        Ok(store.get_or_create_draft(tx, session_id, user_id)?)
    }

    /// Merges `patch` into `draft.draft_data` and persists the result.
    ///
    /// Unknown section names are accepted verbatim with a warning recorded
    /// in `draft.metadata["warnings"]` rather than rejected, since the
    /// active template may have been edited mid-session.
    #[instrument(skip(store, tx, draft, patch, known_sections))]
    pub fn merge_patch(
        store: &Store,
        tx: &Tx<'_>,
        mut draft: JournalDraft,
        patch: serde_json::Map<String, Value>,
        known_sections: &[TemplateSection],
    ) -> Result<JournalDraft> {
        for (section, value) in patch {
            if !known_sections.iter().any(|s| s.name == section) {
                warn!(section = %section, "patch targets a section absent from the active template");
                record_warning(&mut draft, &format!("unknown section: {section}"));
            }
            let merged = match draft.draft_data.remove(&section) {
                None => value,
                Some(existing) => merge_value(existing, value),
            };
            draft.draft_data.insert(section, merged);
        }
        store.save_draft(tx, &draft)?;
        Ok(draft)
    }

    /// Atomically snapshots the draft into a new `JournalEntry`, clears
    /// `draft_data`, and marks the draft finalized.
    #[instrument(skip(store, tx, draft))]
    pub fn finalize(store: &Store, tx: &Tx<'_>, draft: JournalDraft) -> Result<JournalEntry> {
        if draft.draft_data.is_empty() {
            return Err(DraftError::EmptyDraft);
        }
        let title = generate_title(&draft.draft_data);
        let entry = JournalEntry {
            id: journal_core::ids::new_id(),
            user_id: draft.user_id.clone(),
            session_id: Some(draft.session_id.clone()),
            title,
            structured_data: draft.draft_data.clone(),
            raw_text: None,
            metadata: serde_json::json!({}),
            created_at: journal_core::ids::now(),
        };
        store.insert_entry_and_clear_draft(tx, &draft.id, &entry)?;
        info!(entry_id = %entry.id, session_id = %draft.session_id, "draft finalized");
        Ok(entry)
    }
}

fn record_warning(draft: &mut JournalDraft, message: &str) {
    let warnings = draft
        .metadata
        .as_object_mut()
        .expect("draft metadata is always a JSON object")
        .entry("warnings")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = warnings {
        list.push(Value::String(message.to_string()));
    }
}

/// Section-level merge rule: string+string concatenates with a newline,
/// list+list appends without dedup, map+map shallow-merges, and any type
/// mismatch coerces the existing value into a list.
fn merge_value(existing: Value, incoming: Value) -> Value {
    match (existing, incoming) {
        (Value::String(a), Value::String(b)) => Value::String(format!("{a}\n{b}")),
        (Value::Array(mut a), Value::Array(b)) => {
            a.extend(b);
            Value::Array(a)
        }
        (Value::Object(mut a), Value::Object(b)) => {
            a.extend(b);
            Value::Object(a)
        }
        (existing, incoming) => {
            let mut list = match existing {
                Value::Array(a) => a,
                other => vec![other],
            };
            match incoming {
                Value::Array(b) => list.extend(b),
                other => list.push(other),
            }
            Value::Array(list)
        }
    }
}

/// First 50 characters of the first non-empty section value, trimmed with
/// collapsed whitespace; falls back to a dated placeholder.
fn generate_title(draft_data: &serde_json::Map<String, Value>) -> String {
    for value in draft_data.values() {
        if let Some(text) = first_text(value) {
            let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !collapsed.is_empty() {
                let truncated: String = collapsed.chars().take(50).collect();
                return truncated;
            }
        }
    }
    format!("Journal Entry — {}", Utc::now().format("%Y-%m-%d"))
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        Value::Object(map) => map.values().find_map(first_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_templates::builtin_default_sections;
    use rusqlite::Connection;

    fn open() -> Store {
        Store::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn load_is_idempotent_and_creates_an_empty_draft() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "alice", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        let first = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        let second = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.draft_data.is_empty());
        tx.commit().unwrap();
    }

    #[test]
    fn merge_patch_concatenates_strings_with_newline() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "bob", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        let draft = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        let sections = builtin_default_sections();

        let mut patch = serde_json::Map::new();
        patch.insert("General Reflection".into(), serde_json::json!("felt good"));
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch, &sections).unwrap();

        let mut patch2 = serde_json::Map::new();
        patch2.insert("General Reflection".into(), serde_json::json!("also tired"));
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch2, &sections).unwrap();

        assert_eq!(
            draft.draft_data.get("General Reflection").unwrap(),
            &serde_json::json!("felt good\nalso tired")
        );
        tx.commit().unwrap();
    }

    #[test]
    fn merge_patch_appends_lists_without_dedup() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "carol", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        let draft = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        let sections = builtin_default_sections();

        let mut patch = serde_json::Map::new();
        patch.insert("Things Done".into(), serde_json::json!(["ran"]));
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch, &sections).unwrap();

        let mut patch2 = serde_json::Map::new();
        patch2.insert("Things Done".into(), serde_json::json!(["ran"]));
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch2, &sections).unwrap();

        assert_eq!(
            draft.draft_data.get("Things Done").unwrap(),
            &serde_json::json!(["ran", "ran"])
        );
        tx.commit().unwrap();
    }

    #[test]
    fn merge_patch_coerces_type_conflict_into_a_list() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "dan", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        let draft = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        let sections = builtin_default_sections();

        let mut patch = serde_json::Map::new();
        patch.insert("Goals".into(), serde_json::json!("run a marathon"));
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch, &sections).unwrap();

        let mut patch2 = serde_json::Map::new();
        patch2.insert("Goals".into(), serde_json::json!(["learn rust"]));
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch2, &sections).unwrap();

        assert_eq!(
            draft.draft_data.get("Goals").unwrap(),
            &serde_json::json!(["run a marathon", "learn rust"])
        );
        tx.commit().unwrap();
    }

    #[test]
    fn merge_patch_records_warning_for_unknown_section() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "erin", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        let draft = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        let sections = builtin_default_sections();

        let mut patch = serde_json::Map::new();
        patch.insert("Mystery Section".into(), serde_json::json!("something"));
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch, &sections).unwrap();

        assert!(draft.draft_data.contains_key("Mystery Section"));
        let warnings = draft.metadata.get("warnings").unwrap().as_array().unwrap();
        assert_eq!(warnings.len(), 1);
        tx.commit().unwrap();
    }

    #[test]
    fn finalize_rejects_an_empty_draft() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "finn", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        let draft = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        let err = DraftEngine::finalize(&store, &tx, draft).unwrap_err();
        assert!(matches!(err, DraftError::EmptyDraft));
        tx.commit().unwrap();
    }

    #[test]
    fn finalize_snapshots_draft_and_clears_it() {
        let store = open();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "gina", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        let draft = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        let sections = builtin_default_sections();

        let mut patch = serde_json::Map::new();
        patch.insert(
            "General Reflection".into(),
            serde_json::json!("  a very reflective   day indeed  "),
        );
        let draft = DraftEngine::merge_patch(&store, &tx, draft, patch, &sections).unwrap();

        let old_draft_id = draft.id.clone();
        let entry = DraftEngine::finalize(&store, &tx, draft).unwrap();
        assert_eq!(entry.title, "a very reflective day indeed");
        assert_eq!(
            entry.structured_data.get("General Reflection").unwrap(),
            &serde_json::json!("  a very reflective   day indeed  ")
        );

        // the prior draft is finalized, so loading the session again opens a
        // fresh, empty one rather than resurrecting the finalized row.
        let fresh = DraftEngine::load(&store, &tx, &session.id, &user.id).unwrap();
        assert!(fresh.draft_data.is_empty());
        assert_ne!(fresh.id, old_draft_id);
        tx.commit().unwrap();
    }

    #[test]
    fn generate_title_falls_back_when_draft_has_no_text_content() {
        let mut data = serde_json::Map::new();
        data.insert("Goals".into(), serde_json::json!([]));
        let title = generate_title(&data);
        assert!(title.starts_with("Journal Entry —"));
    }
}
