//! Chat transcript types shared by the terminal UI and the one-shot commands.

use serde::Serialize;

use crate::format::format_message;

/// Who sent a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

/// A single chat turn. Messages are only ever appended to a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            text: text.into(),
        }
    }

    /// Render the message as a chat bubble.
    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"message-bubble {}\"><div class=\"chat-bubble\"><div class=\"chat-text\">{}</div></div></div>",
            self.sender.as_str(),
            format_message(self.text.as_str())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bubble_wraps_formatted_text() {
        let msg = Message::ai("try `print(1)`");
        assert_eq!(
            msg.to_html(),
            "<div class=\"message-bubble ai\"><div class=\"chat-bubble\"><div class=\"chat-text\">try <code class=\"inline-code\">print(1)</code></div></div></div>"
        );
    }

    #[test]
    fn test_user_bubble_escapes_input() {
        let html = Message::user("<b>hi</b>").to_html();
        assert!(html.starts_with("<div class=\"message-bubble user\">"));
        assert!(html.contains("&lt;b&gt;hi&lt;/b&gt;"));
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("q")).unwrap();
        assert_eq!(json, r#"{"sender":"user","text":"q"}"#);
    }
}
