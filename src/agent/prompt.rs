use crate::locale::Phrases;
use crate::models::{Message, MessageRole, RequestEnvelope, Turn, TurnRole, WebinarContext};

pub const TOPIC_DELIMITER: &str = ", ";

/// Assembles grounded prompts. Pure: no I/O, no state beyond the phrase table.
#[derive(Clone, Copy)]
pub struct PromptBuilder {
    phrases: &'static Phrases,
}

impl PromptBuilder {
    pub fn new(phrases: &'static Phrases) -> Self {
        Self { phrases }
    }

    pub fn system_instruction(&self, context: &WebinarContext) -> String {
        let p = self.phrases;
        let directives = p
            .directives
            .iter()
            .enumerate()
            .map(|(i, d)| format!("{}. {d}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{identity}\n\n\
             {context_heading}\n\
             Title: {title}\n\
             Description: {description}\n\
             Topics: {topics}\n\n\
             {directives_heading}\n\
             {directives}",
            identity = p.assistant_identity,
            context_heading = p.context_heading,
            title = context.title,
            description = context.description,
            topics = context.topics.join(TOPIC_DELIMITER),
            directives_heading = p.directives_heading,
        )
    }

    /// Maps stored messages to gateway turns. System messages are dropped;
    /// anything that is not a model turn is sent as a user turn.
    pub fn turns(&self, history: &[Message]) -> Vec<Turn> {
        history
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    MessageRole::System => return None,
                    MessageRole::Model => TurnRole::Assistant,
                    MessageRole::User => TurnRole::User,
                };
                Some(Turn { role, text: m.text.clone() })
            })
            .collect()
    }

    pub fn envelope(
        &self,
        context: &WebinarContext,
        history: &[Message],
        new_user_text: &str,
    ) -> RequestEnvelope {
        RequestEnvelope {
            system_instruction: self.system_instruction(context),
            prior_turns: self.turns(history),
            new_user_text: new_user_text.to_string(),
        }
    }

    pub fn summary_prompt(&self, description: &str, topics: &[String]) -> String {
        self.phrases.summary_prompt_for(description, &topics.join(TOPIC_DELIMITER))
    }
}
