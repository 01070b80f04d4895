//! Records and DTOs for the guestbook API
//!
//! `entities` holds what the store persists; `requests` and `responses`
//! define the HTTP payloads.

pub mod entities;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use entities::{AdminId, AdminUser, Guestbook, GuestbookId, Message, MessageId};
pub use requests::{
    BulkDeleteRequest, EditMessageForm, GuestbookForm, PageQuery, ReplyForm, SettingsForm,
    SubmitForm, DEFAULT_PAGE_LIMIT, MAX_MESSAGE_LENGTH, MAX_PAGE_LIMIT,
};
pub use responses::{HealthResponse, PaginatedMessages, Pagination};
