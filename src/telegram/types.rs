//! Bot API wire structures, limited to the fields the bot reads or sends.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatEvent, ChatUser};
use crate::session_actor::Reply;

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<TgUser>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl TgUser {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

impl From<&TgUser> for ChatUser {
    fn from(user: &TgUser) -> Self {
        ChatUser::new(user.id.to_string(), user.full_name())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TgUser,
    pub message: Option<Message>,
    pub data: Option<String>,
}

/// What one update asks of the bot, if anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub chat_id: i64,
    pub event: ChatEvent,
    /// Set for button presses, which must be acknowledged.
    pub callback_id: Option<String>,
}

impl Update {
    /// Text messages and button presses become chat events. Everything else
    /// (edits, stickers, channel posts) is ignored.
    pub fn into_inbound(self) -> Option<Inbound> {
        if let Some(query) = self.callback_query {
            let chat_id = query.message.as_ref().map(|m| m.chat.id).unwrap_or(query.from.id);
            let data = query.data?;
            return Some(Inbound {
                chat_id,
                event: ChatEvent::callback(ChatUser::from(&query.from), data),
                callback_id: Some(query.id),
            });
        }

        let message = self.message?;
        let text = message.text?;
        let user = message
            .from
            .as_ref()
            .map(ChatUser::from)
            .unwrap_or_else(|| ChatUser::new(message.chat.id.to_string(), ""));
        Some(Inbound {
            chat_id: message.chat.id,
            event: ChatEvent::text(user, text),
            callback_id: None,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SendMessage {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl SendMessage {
    pub fn from_reply(chat_id: i64, reply: Reply) -> Self {
        let reply_markup = (!reply.buttons.is_empty()).then(|| InlineKeyboardMarkup {
            inline_keyboard: reply
                .buttons
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|button| InlineKeyboardButton {
                            text: button.label,
                            callback_data: button.token,
                        })
                        .collect()
                })
                .collect(),
        });

        Self {
            chat_id,
            text: reply.text,
            reply_markup,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetUpdates {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackQuery {
    pub callback_query_id: String,
}
