pub mod error;

use std::sync::RwLock;

use tracing::{debug, info, instrument};

use journal_store::types::TemplateSection;
use journal_store::{Store, Tx};

pub use error::{Result, TemplateError};

/// Returns the process-wide default section catalogue.
pub fn builtin_default_sections() -> Vec<TemplateSection> {
    let section = |name: &str, description: &str, aliases: &[&str]| TemplateSection {
        name: name.to_string(),
        description: description.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        section(
            "General Reflection",
            "Free-form reflection on the day or moment.",
            &["Reflection", "Journal"],
        ),
        section("Things Done", "Concrete activities completed.", &["Accomplishments", "Did"]),
        section("Events", "Notable things that happened.", &["Happenings"]),
        section(
            "Thoughts & Feelings",
            "Emotional state and internal narrative.",
            &["Emotional State", "Feelings", "Mood"],
        ),
        section(
            "Trading Journal",
            "Trades placed, positions taken, rationale.",
            &["Trades", "Positions"],
        ),
        section(
            "Market Thoughts",
            "Views on market conditions and outlook.",
            &["Market", "Outlook"],
        ),
        section("Goals", "Goals, intentions, and next steps.", &["Intentions", "Next Steps"]),
    ]
}

/// Returns the effective template for a user: per-user override if active,
/// else the process-wide default.
///
/// The default template has a process-wide cache, refreshed only via
/// `reload()` — never on a timer.
pub struct TemplateProvider {
    default_sections: RwLock<Vec<TemplateSection>>,
}

impl TemplateProvider {
    pub fn new() -> Self {
        Self {
            default_sections: RwLock::new(builtin_default_sections()),
        }
    }

    /// Returns the user's active template sections, or the cached default.
    #[instrument(skip(self, store, tx))]
    pub fn effective_sections(
        &self,
        store: &Store,
        tx: &Tx<'_>,
        user_id: &str,
    ) -> Result<Vec<TemplateSection>> {
        if let Some(template) = store.get_active_template(tx, user_id)? {
            debug!(user_id, "using per-user active template");
            return Ok(template.sections);
        }
        Ok(self
            .default_sections
            .read()
            .expect("template cache poisoned")
            .clone())
    }

    /// Refreshes the process-wide default from its source of truth — the
    /// compiled-in catalogue. A future on-disk source would slot in here
    /// without changing callers.
    #[instrument(skip(self))]
    pub fn reload(&self) -> Result<()> {
        let mut guard = self.default_sections.write().expect("template cache poisoned");
        *guard = builtin_default_sections();
        info!("default template reloaded");
        Ok(())
    }
}

impl Default for TemplateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn falls_back_to_default_when_no_active_template() {
        let store = Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let provider = TemplateProvider::new();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "alice", None, "hash").unwrap();
        let sections = provider.effective_sections(&store, &tx, &user.id).unwrap();
        assert_eq!(sections.len(), builtin_default_sections().len());
        tx.commit().unwrap();
    }

    #[test]
    fn prefers_per_user_active_template() {
        let store = Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let provider = TemplateProvider::new();
        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "bob", None, "hash").unwrap();
        let custom = vec![TemplateSection {
            name: "Gratitude".into(),
            description: "Things to be grateful for.".into(),
            aliases: vec![],
        }];
        store.set_active_template(&tx, &user.id, "custom", &custom).unwrap();
        let sections = provider.effective_sections(&store, &tx, &user.id).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Gratitude");
        tx.commit().unwrap();
    }

    #[test]
    fn reload_resets_default_cache() {
        let provider = TemplateProvider::new();
        provider.reload().unwrap();
        assert_eq!(
            provider.default_sections.read().unwrap().len(),
            builtin_default_sections().len()
        );
    }
}
