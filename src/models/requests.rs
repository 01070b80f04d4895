//! Request DTOs for the guestbook API
//!
//! Defines the structure of incoming form, JSON, and query payloads.

use serde::Deserialize;

/// Longest accepted message or reply body, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 2500;

/// Page size used when `limit` is absent or out of range.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size a client may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

// == Page Query ==
/// Query string of the v2 message endpoint.
///
/// Values are kept as raw strings so that malformed input falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub limit: Option<String>,
}

impl PageQuery {
    /// Resolves `(page, limit)` with defaults applied.
    pub fn resolve(&self) -> (u32, u32) {
        let page = self
            .page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|&page| page > 0)
            .unwrap_or(1);

        let limit = self
            .limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|limit| (1..=MAX_PAGE_LIMIT).contains(limit))
            .unwrap_or(DEFAULT_PAGE_LIMIT);

        (page, limit)
    }
}

// == Submit Form ==
/// Public form posted by a visitor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub website: String,
    #[serde(default, rename = "challengeQuestionAnswer")]
    pub challenge_answer: String,
}

impl SubmitForm {
    /// Validates the trimmed fields.
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.name.trim().is_empty() {
            return Some("Name cannot be empty".to_string());
        }
        if self.text.trim().is_empty() {
            return Some("Message cannot be empty".to_string());
        }
        validate_length(self.text.trim(), "Message")
    }
}

// == Guestbook Form ==
/// Admin form creating or editing a guestbook.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuestbookForm {
    #[serde(default)]
    pub website_url: String,
    /// Checkbox: present as "on" when ticked
    #[serde(default)]
    pub requires_approval: Option<String>,
    #[serde(default)]
    pub challenge_question: String,
    #[serde(default)]
    pub challenge_answer: String,
    #[serde(default)]
    pub challenge_hint: String,
    #[serde(default)]
    pub allowed_origins: String,
}

// == Edit Message Form ==
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditMessageForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub website: String,
    #[serde(default, rename = "isApproved")]
    pub is_approved: Option<String>,
}

impl EditMessageForm {
    pub fn approved(&self) -> bool {
        self.is_approved.as_deref() == Some("on")
    }
}

// == Reply Form ==
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyForm {
    #[serde(default)]
    pub text: String,
}

impl ReplyForm {
    pub fn validate(&self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            return Some("Reply text cannot be empty".to_string());
        }
        validate_length(text, "Reply")
    }
}

// == Bulk Delete Request ==
/// JSON body of the bulk delete endpoint; ids arrive as strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub message_ids: Vec<String>,
}

impl BulkDeleteRequest {
    /// Parses every id as a positive integer.
    pub fn parse_ids(&self) -> Result<Vec<u64>, String> {
        if self.message_ids.is_empty() {
            return Err("No messages specified for deletion".to_string());
        }

        self.message_ids
            .iter()
            .map(|raw| match raw.trim().parse::<u64>() {
                Ok(id) if id > 0 => Ok(id),
                _ => Err(format!("Invalid message ID: {raw}")),
            })
            .collect()
    }
}

// == Settings Form ==
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub display_name: String,
}

fn validate_length(text: &str, label: &str) -> Option<String> {
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Some(format!(
            "{label} is too long, maximum length is {MAX_MESSAGE_LENGTH} characters"
        ));
    }
    None
}
