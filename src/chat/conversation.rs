// SPDX-License-Identifier: Apache-2.0

use tablechat_core::{Message, Role};

/// Ordered message history of one chat.
///
/// Index 0 always holds the single system message. Everything after it is
/// append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.messages[0].content_str()
    }

    /// Replace the system message in place
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.messages[0] = Message::system(prompt);
    }

    /// Drop everything but the system message
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// History shown to a user: no system message, no tool plumbing
    pub fn visible_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().skip(1).filter(|m| match m.role {
            Role::User => true,
            Role::Assistant => m.tool_calls.is_none(),
            Role::System | Role::Tool => false,
        })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    /// Append the messages of a finished turn
    pub(crate) fn commit(&mut self, turn: Vec<Message>) {
        self.messages.extend(
            turn.into_iter()
                .filter(|m| m.role != Role::System),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablechat_core::ToolCallRequest;

    #[test]
    fn system_prompt_is_replaced_not_duplicated() {
        let mut conversation = Conversation::new("first");
        conversation.commit(vec![Message::user("hi"), Message::assistant("hello")]);
        conversation.set_system_prompt("second");
        conversation.set_system_prompt("third");

        let systems = conversation
            .messages()
            .iter()
            .filter(|m| m.role == Role::System)
            .count();
        assert_eq!(systems, 1);
        assert_eq!(conversation.messages()[0].role, Role::System);
        assert_eq!(conversation.system_prompt(), "third");
        assert_eq!(conversation.len(), 3);
    }

    #[test]
    fn clear_keeps_system_message() {
        let mut conversation = Conversation::new("sys");
        conversation.commit(vec![Message::user("a")]);
        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(conversation.messages(), &[Message::system("sys")]);
    }

    #[test]
    fn commit_never_adds_system_messages() {
        let mut conversation = Conversation::new("sys");
        conversation.commit(vec![Message::system("rogue"), Message::user("u")]);
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.system_prompt(), "sys");
    }

    #[test]
    fn visible_messages_hide_tool_plumbing() {
        let mut conversation = Conversation::new("sys");
        let call = ToolCallRequest::new("c1", "list_tables", Default::default());
        conversation.commit(vec![
            Message::user("u"),
            Message::assistant_tool_calls(None, vec![call]),
            Message::tool("c1", "result"),
            Message::assistant("answer"),
        ]);
        let visible: Vec<&str> = conversation.visible_messages().map(|m| m.content_str()).collect();
        assert_eq!(visible, vec!["u", "answer"]);
    }
}
