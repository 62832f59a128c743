//! Assembles the ordered chat message list sent to the LLM transport each
//! iteration (§4.2).

use argo_types::{Message, WireMessage};

/// Builds the five-item ordered message list PromptBuilder emits each
/// iteration. `E` (the transient messages) is passed in freshly rebuilt by
/// the caller every iteration from `R`/`H` — this builder never
/// accumulates state across iterations itself.
#[derive(Debug, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Construct a builder. Stateless — exists as a named seam so the
    /// assembly logic below isn't a bare free function.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Flatten the turn's inputs into the wire-level message list (§4.2):
    ///
    /// 1. System: `base_system` (identity) + `mode_description` (tool
    ///    instructions live only here).
    /// 2. System: the assembled six-layer context block, if non-empty.
    /// 3. The last `short_term` messages, verbatim, in role order.
    /// 4. User: `user_text`.
    /// 5. Transient `E`: tool results, reflection nudges, the research
    ///    checklist — each as its own system message, in order.
    #[must_use]
    pub fn build(
        &self,
        base_system: &str,
        mode_description: &str,
        context_block: &str,
        short_term: &[Message],
        user_text: &str,
        transient: &[String],
    ) -> Vec<WireMessage> {
        let mut out = Vec::with_capacity(3 + short_term.len() + transient.len());

        out.push(WireMessage::system(format!(
            "{base_system}\n\n{mode_description}"
        )));

        if !context_block.trim().is_empty() {
            out.push(WireMessage::system(context_block.to_string()));
        }

        for message in short_term {
            out.push(match message.role {
                argo_types::Role::User => WireMessage::user(message.content.clone()),
                argo_types::Role::Assistant => WireMessage::assistant(message.content.clone()),
                argo_types::Role::System => WireMessage::system(message.content.clone()),
            });
        }

        out.push(WireMessage::user(user_text.to_string()));

        for extra in transient {
            out.push(WireMessage::system(extra.clone()));
        }

        out
    }
}
