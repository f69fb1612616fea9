pub mod error;
pub mod llm;
pub mod runtime;
pub mod structurer;
pub mod tools;

pub use error::{AgentError, Result};
pub use llm::{AnthropicClient, LlmClient};
pub use runtime::{AgentRuntime, TurnResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llm::{LlmError, LlmResponse, Message, ToolCall, ToolDefinition};
    use journal_tasks::TaskManager;
    use journal_templates::TemplateProvider;
    use rusqlite::Connection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted LLM: replays a fixed sequence of responses, one per call.
    struct ScriptedLlm {
        responses: Mutex<Vec<LlmResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(mut responses: Vec<LlmResponse>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _system: &str,
            _history: &[Message],
            _tools: &[ToolDefinition],
        ) -> std::result::Result<LlmResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| LlmError::Parse("script exhausted".into()))
        }
    }

    fn text_response(text: &str) -> LlmResponse {
        LlmResponse { text: text.to_string(), tool_calls: Vec::new(), stop_reason: "end_turn".to_string() }
    }

    fn tool_call_response(name: &str, input: serde_json::Value) -> LlmResponse {
        LlmResponse {
            text: String::new(),
            tool_calls: vec![ToolCall { id: "call_1".into(), name: name.to_string(), input }],
            stop_reason: "tool_use".to_string(),
        }
    }

    #[tokio::test]
    async fn turn_persists_user_and_assistant_messages() {
        let store = journal_store::Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let templates = TemplateProvider::new();
        let tasks = TaskManager::new();

        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "alice", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        tx.commit().unwrap();

        let llm = ScriptedLlm::new(vec![text_response("Got it, noted.")]);
        let runtime = AgentRuntime::new(Box::new(llm));

        let tx = store.begin().unwrap();
        let result = runtime
            .turn(&store, &tx, &templates, &tasks, &user.id, &session.id, "felt great today")
            .await
            .unwrap();
        assert_eq!(result.text, "Got it, noted.");
        assert!(!result.overflow);

        let messages = store.get_messages_ordered(&tx, &session.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "felt great today");
        assert_eq!(messages[1].content, "Got it, noted.");
        tx.commit().unwrap();
    }

    #[tokio::test]
    async fn turn_executes_a_tool_call_and_returns_final_reply() {
        let store = journal_store::Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let templates = TemplateProvider::new();
        let tasks = TaskManager::new();

        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "bob", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        tx.commit().unwrap();

        let llm = ScriptedLlm::new(vec![
            tool_call_response("create_task", serde_json::json!({"title": "stretch before bed"})),
            text_response("Added that task for you."),
        ]);
        let runtime = AgentRuntime::new(Box::new(llm));

        let tx = store.begin().unwrap();
        let result = runtime
            .turn(&store, &tx, &templates, &tasks, &user.id, &session.id, "remind me to stretch before bed")
            .await
            .unwrap();
        assert_eq!(result.text, "Added that task for you.");
        assert_eq!(result.tool_calls.len(), 1);
        assert!(!result.tool_calls[0].is_error);
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        let tasks_list = store.list_tasks(&tx, &user.id, false).unwrap();
        assert_eq!(tasks_list.len(), 1);
        assert_eq!(tasks_list[0].title, "stretch before bed");
        tx.commit().unwrap();
    }

    #[tokio::test]
    async fn turn_sets_overflow_when_tool_budget_is_exhausted() {
        let store = journal_store::Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let templates = TemplateProvider::new();
        let tasks = TaskManager::new();

        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "carol", None, "hash").unwrap();
        let session = store.create_session(&tx, &user.id, "journaling", serde_json::json!({})).unwrap();
        tx.commit().unwrap();

        let mut responses = Vec::new();
        for _ in 0..9 {
            responses.push(tool_call_response("list_tasks", serde_json::json!({"include_completed": false})));
        }
        let llm = ScriptedLlm::new(responses);
        let runtime = AgentRuntime::new(Box::new(llm));

        let tx = store.begin().unwrap();
        let result = runtime
            .turn(&store, &tx, &templates, &tasks, &user.id, &session.id, "keep checking my tasks")
            .await
            .unwrap();
        assert!(result.overflow);
        tx.commit().unwrap();
    }

    #[tokio::test]
    async fn turn_fails_loudly_for_unknown_session() {
        let store = journal_store::Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let templates = TemplateProvider::new();
        let tasks = TaskManager::new();

        let tx = store.begin().unwrap();
        let user = store.create_user(&tx, "dan", None, "hash").unwrap();
        tx.commit().unwrap();

        let llm = ScriptedLlm::new(vec![text_response("unreachable")]);
        let runtime = AgentRuntime::new(Box::new(llm));

        let tx = store.begin().unwrap();
        let err = runtime
            .turn(&store, &tx, &templates, &tasks, &user.id, "missing-session", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
        tx.commit().unwrap();
    }
}
