//! Rolling-summary regeneration (§4.10): "when `messages_since_summary >=
//! threshold`, regenerate the summary from everything older than the last
//! `k` messages and replace it."

use argo_types::{ArgoError, CompletionRequest, Provider, Role, SessionSummary, WireMessage};

use crate::store::SessionStore;

const SUMMARY_MODEL_TEMPERATURE: f32 = 0.2;
const SUMMARY_MAX_TOKENS: u32 = 512;

fn render_summary_prompt(previous: Option<&str>, messages: &[argo_types::Message]) -> String {
    let mut prompt = String::new();
    if let Some(previous) = previous {
        prompt.push_str("Existing summary:\n");
        prompt.push_str(previous);
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "Update the summary above to also cover the following messages. \
         Keep it concise and in plain prose; preserve facts, decisions, and \
         open threads, dropping small talk.\n\n",
    );
    for message in messages {
        let role = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        prompt.push_str(&format!("{role}: {}\n", message.content));
    }
    prompt
}

/// If `session_id` has accumulated at least `threshold` messages since its
/// last summary, regenerate the summary over everything older than the most
/// recent `keep_recent` messages and replace it. Returns whether a
/// regeneration happened.
pub async fn regenerate_summary_if_due(
    store: &dyn SessionStore,
    provider: &dyn Provider,
    session_id: &str,
    threshold: u64,
    keep_recent: usize,
) -> Result<bool, ArgoError> {
    let since = store.messages_since_summary(session_id).await?;
    if since < threshold {
        return Ok(false);
    }

    let total = store.message_count(session_id).await? as usize;
    let previous = store.live_summary(session_id).await?;
    let to_summarize = total.saturating_sub(keep_recent).max(1);
    let messages = store.last_messages(session_id, to_summarize).await?;
    if messages.is_empty() {
        return Ok(false);
    }

    let prompt = render_summary_prompt(previous.as_ref().map(|s| s.summary_text.as_str()), &messages);
    let request = CompletionRequest {
        model: String::new(),
        messages: vec![
            WireMessage::system("You maintain a running summary of a conversation."),
            WireMessage::user(prompt),
        ],
        temperature: SUMMARY_MODEL_TEMPERATURE,
        max_tokens: SUMMARY_MAX_TOKENS,
        stop: Vec::new(),
    };
    let response = provider.complete(request).await?;

    store
        .replace_summary(SessionSummary {
            session_id: session_id.to_string(),
            summary_text: response.text,
            updated_at: chrono::Utc::now(),
            message_count_at_update: total as u64,
        })
        .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySessionStore;
    use argo_types::{CompletionResponse, Message, ProviderError};
    use async_trait::async_trait;

    struct StubProvider {
        reply: String,
    }

    #[async_trait]
    impl Provider for StubProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                text: self.reply.clone(),
            })
        }
    }

    #[tokio::test]
    async fn skips_regeneration_below_threshold() {
        let store = InMemorySessionStore::new();
        store.ensure_session("s1").await.unwrap();
        for i in 0..5 {
            store
                .append_message(Message::new("s1", Role::User, format!("m{i}")))
                .await
                .unwrap();
        }
        let provider = StubProvider {
            reply: "summary".to_string(),
        };
        let regenerated = regenerate_summary_if_due(&store, &provider, "s1", 20, 10)
            .await
            .unwrap();
        assert!(!regenerated);
        assert!(store.live_summary("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn regenerates_and_replaces_when_due() {
        let store = InMemorySessionStore::new();
        store.ensure_session("s1").await.unwrap();
        for i in 0..20 {
            store
                .append_message(Message::new("s1", Role::User, format!("m{i}")))
                .await
                .unwrap();
        }
        let provider = StubProvider {
            reply: "a fresh summary".to_string(),
        };
        let regenerated = regenerate_summary_if_due(&store, &provider, "s1", 10, 5)
            .await
            .unwrap();
        assert!(regenerated);
        let live = store.live_summary("s1").await.unwrap().unwrap();
        assert_eq!(live.summary_text, "a fresh summary");
        assert_eq!(live.message_count_at_update, 20);
    }

    #[tokio::test]
    async fn second_call_is_a_no_op_until_more_messages_arrive() {
        let store = InMemorySessionStore::new();
        store.ensure_session("s1").await.unwrap();
        for i in 0..10 {
            store
                .append_message(Message::new("s1", Role::User, format!("m{i}")))
                .await
                .unwrap();
        }
        let provider = StubProvider {
            reply: "summary v1".to_string(),
        };
        assert!(regenerate_summary_if_due(&store, &provider, "s1", 10, 5)
            .await
            .unwrap());
        assert!(!regenerate_summary_if_due(&store, &provider, "s1", 10, 5)
            .await
            .unwrap());
    }
}
