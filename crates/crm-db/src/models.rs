use serde::{Deserialize, Serialize};

/// Whether a message was received from (incoming) or sent to (outgoing)
/// the external contact. Stored as TEXT, guarded by a CHECK constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Text,
    Photo,
    Video,
    Document,
    None,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Text => "text",
            MediaType::Photo => "photo",
            MediaType::Video => "video",
            MediaType::Document => "document",
            MediaType::None => "none",
        }
    }
}

/// A locally tracked person/lead, possibly linked to a Telegram account.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub note: Option<String>,
    /// Set once the platform has resolved this contact to an account.
    pub telegram_user_id: Option<i64>,
    pub date_added: i64,
}

/// One directional message in a contact's conversation. Immutable once
/// written; `(contact_id, message_id)` is the dedup key for re-synced
/// history.
#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub contact_id: i64,
    /// The platform's own message id within the conversation.
    pub message_id: i64,
    pub direction: Direction,
    pub text: String,
    pub media_type: MediaType,
    pub media_file_id: Option<String>,
    pub timestamp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub telegram_user_id: i64,
    pub date_added: i64,
}
