/// A platform-neutral inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Command { name: String, args: Vec<String> },
    Text { body: String },
    Callback { token: String },
}

impl Event {
    /// Builds an event from a raw chat message. A leading `/` makes it a command;
    /// a `@botname` suffix on the command is dropped.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        match trimmed.strip_prefix('/') {
            Some(rest) if !rest.is_empty() => {
                let mut parts = rest.split_whitespace();
                let head = parts.next().unwrap_or_default();
                let name = head.split('@').next().unwrap_or(head).to_lowercase();
                Event::Command {
                    name,
                    args: parts.map(str::to_string).collect(),
                }
            }
            _ => Event::Text {
                body: trimmed.to_string(),
            },
        }
    }
}

/// Who sent an event, plus the event itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub user_id: i64,
    pub display_name: String,
    pub event: Event,
}

impl Incoming {
    pub fn new(user_id: i64, display_name: impl Into<String>, event: Event) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            event,
        }
    }
}

/// Parsed form of a callback token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Answer(String),
    StartTest(String),
}

impl CallbackAction {
    pub fn parse(token: &str) -> Option<Self> {
        let (kind, payload) = token.split_once(':')?;
        match kind {
            "answer" => Some(CallbackAction::Answer(payload.to_string())),
            "starttest" => Some(CallbackAction::StartTest(payload.to_string())),
            _ => None,
        }
    }
}

pub fn answer_token(letter: &str) -> String {
    format!("answer:{}", letter)
}

pub fn start_test_token(test_id: i64) -> String {
    format!("starttest:{}", test_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceButton {
    pub label: String,
    pub token: String,
}

impl ChoiceButton {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buttons {
    /// Buttons that answer with a callback token.
    Choices(Vec<Vec<ChoiceButton>>),
    /// Persistent menu whose buttons send their label back as text.
    Menu(Vec<Vec<String>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: String,
    pub buttons: Option<Buttons>,
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            buttons: None,
        }
    }

    pub fn with_buttons(body: impl Into<String>, buttons: Buttons) -> Self {
        Self {
            body: body.into(),
            buttons: Some(buttons),
        }
    }

    /// Tokens of every choice button, in display order.
    pub fn choice_tokens(&self) -> Vec<&str> {
        match &self.buttons {
            Some(Buttons::Choices(rows)) => rows
                .iter()
                .flatten()
                .map(|button| button.token.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_split_into_name_and_args() {
        assert_eq!(
            Event::from_text("/addlink A1 https://t.me/x 5"),
            Event::Command {
                name: "addlink".to_string(),
                args: vec!["A1".into(), "https://t.me/x".into(), "5".into()],
            }
        );
        assert_eq!(
            Event::from_text("/Done@quiz_bot"),
            Event::Command {
                name: "done".to_string(),
                args: vec![],
            }
        );
    }

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(
            Event::from_text("  Capital of France?  "),
            Event::Text {
                body: "Capital of France?".to_string()
            }
        );
        assert_eq!(
            Event::from_text("/"),
            Event::Text {
                body: "/".to_string()
            }
        );
    }

    #[test]
    fn callback_tokens_parse() {
        assert_eq!(
            CallbackAction::parse("answer:b"),
            Some(CallbackAction::Answer("b".to_string()))
        );
        assert_eq!(
            CallbackAction::parse("starttest:7"),
            Some(CallbackAction::StartTest("7".to_string()))
        );
        assert_eq!(CallbackAction::parse("bogus:1"), None);
        assert_eq!(CallbackAction::parse("answer"), None);
    }
}
