//! Persisted records.
//!
//! Field names on the wire match what existing embed widgets already parse
//! (`ID`, `Name`, `Replies`, ...), so the serde renames are part of the API.

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use crate::cache::GuestbookId;

pub type MessageId = u64;
pub type AdminId = u64;

// == Admin User ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub id: AdminId,
    pub username: String,
    pub display_name: String,
}

impl AdminUser {
    /// Name shown on replies: the display name if set, otherwise the username.
    pub fn reply_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}

// == Guestbook ==
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Guestbook {
    pub id: GuestbookId,
    pub website_url: String,
    pub admin_user_id: AdminId,
    pub requires_approval: bool,
    pub challenge_question: String,
    pub challenge_answer: String,
    pub challenge_hint: String,
    /// Comma-separated, normalised origins; empty allows every origin
    pub allowed_origins: String,
}

// == Message ==
/// A top-level message or a reply.
///
/// Stored flat; `replies` is only populated when the store assembles a
/// thread for the public API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(rename = "ID")]
    pub id: MessageId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub text: String,
    pub website: Option<String>,
    pub approved: bool,
    #[serde(rename = "GuestbookID")]
    pub guestbook_id: GuestbookId,
    #[serde(rename = "ParentMessageID")]
    pub parent_message_id: Option<MessageId>,
    pub replies: Vec<Message>,
    /// Admin who wrote this reply, used to cascade display-name changes
    #[serde(skip)]
    pub author_admin_id: Option<AdminId>,
}

impl Message {
    pub fn is_reply(&self) -> bool {
        self.parent_message_id.is_some()
    }
}
