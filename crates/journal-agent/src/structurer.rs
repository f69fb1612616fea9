use serde_json::Value;
use tracing::warn;

use journal_store::types::TemplateSection;

use crate::error::{AgentError, Result};
use crate::llm::{LlmClient, LlmError, Message, Role};

/// Splits a raw user utterance into a section-keyed patch.
pub struct Structurer<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> Structurer<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    pub async fn structure(
        &self,
        raw_text: &str,
        sections: &[TemplateSection],
    ) -> Result<serde_json::Map<String, Value>> {
        let system = build_system_prompt(sections);
        let history = [Message {
            role: Role::User,
            content: raw_text.to_string(),
        }];

        let response = self
            .llm
            .complete(&system, &history, &[])
            .await
            .map_err(|e| match e {
                LlmError::Transport(_) | LlmError::Api { .. } => {
                    AgentError::UpstreamUnavailable(e.to_string())
                }
                LlmError::Timeout => AgentError::UpstreamTimeout,
                LlmError::Parse(_) => AgentError::StructuringFailed,
            })?;

        let raw_patch: Value = match serde_json::from_str(response.text.trim()) {
            Ok(v) => v,
            Err(_) => return Err(AgentError::StructuringFailed),
        };
        let Value::Object(map) = raw_patch else {
            return Err(AgentError::StructuringFailed);
        };

        Ok(resolve_aliases(map, sections))
    }
}

fn build_system_prompt(sections: &[TemplateSection]) -> String {
    let catalogue = sections
        .iter()
        .map(|s| {
            let aliases = if s.aliases.is_empty() {
                String::new()
            } else {
                format!(" (aliases: {})", s.aliases.join(", "))
            };
            format!("- {}: {}{}", s.name, s.description, aliases)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You split a journal entry's raw text into the sections below. \
         Respond with a single JSON object whose keys are section names and \
         whose values are strings or lists of strings. Omit sections with no \
         relevant content. Respond with JSON only, no surrounding prose.\n\n{catalogue}"
    )
}

/// Rewrites any key matching a known alias to its canonical section name;
/// unknown keys pass through untouched.
fn resolve_aliases(
    map: serde_json::Map<String, Value>,
    sections: &[TemplateSection],
) -> serde_json::Map<String, Value> {
    let mut resolved = serde_json::Map::new();
    for (key, value) in map {
        let canonical = sections
            .iter()
            .find(|s| s.name == key || s.aliases.iter().any(|a| a == &key))
            .map(|s| s.name.clone());
        match canonical {
            Some(name) => {
                resolved.insert(name, value);
            }
            None => {
                warn!(key = %key, "structurer emitted a key outside the template catalogue");
                resolved.insert(key, value);
            }
        }
    }
    resolved
}
