/// The person on the other end of a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
}

impl ChatUser {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// What the chat transport delivered: free text or a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Text(String),
    Callback(String),
}

/// One inbound chat event, already attributed to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub user: ChatUser,
    pub input: ChatInput,
}

impl ChatEvent {
    pub fn text(user: ChatUser, text: impl Into<String>) -> Self {
        Self {
            user,
            input: ChatInput::Text(text.into()),
        }
    }

    pub fn callback(user: ChatUser, token: impl Into<String>) -> Self {
        Self {
            user,
            input: ChatInput::Callback(token.into()),
        }
    }
}
