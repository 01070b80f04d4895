//! Admin write paths
//!
//! Authentication happens upstream; the proxy forwards the signed-in
//! username in `X-Forwarded-User`. Every mutation that can change what the
//! public read endpoints return invalidates the affected guestbooks before
//! the store write guard is released.

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::request::Parts,
    response::Redirect,
    Form, Json,
};
use tracing::info;

use super::handlers::AppState;
use super::origin::validate_origins;
use crate::error::{AppError, Result};
use crate::models::{
    BulkDeleteRequest, EditMessageForm, GuestbookForm, GuestbookId, MessageId, ReplyForm,
    SettingsForm,
};
use crate::store::{GuestbookSettings, MessageUpdate, NewGuestbook, NewMessage};

/// Header carrying the authenticated admin's username.
pub const FORWARDED_USER_HEADER: &str = "x-forwarded-user";

// == Admin Identity ==
/// Username of the signed-in admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .headers
            .get(FORWARDED_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(|user| AdminIdentity(user.to_string()))
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Handler for POST /admin/guestbook/new
pub async fn create_guestbook_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Form(form): Form<GuestbookForm>,
) -> Result<Redirect> {
    let allowed_origins = validate_origins(&form.allowed_origins)?;

    let mut store = state.store.write().await;
    let admin = store.ensure_admin(&username);
    let guestbook = store.create_guestbook(NewGuestbook {
        website_url: form.website_url.trim().to_string(),
        admin_user_id: admin.id,
        requires_approval: form.requires_approval.as_deref() == Some("on"),
        challenge_question: form.challenge_question.trim().to_string(),
        challenge_answer: form.challenge_answer.trim().to_string(),
        challenge_hint: form.challenge_hint.trim().to_string(),
        allowed_origins,
    });

    info!(admin = %username, guestbook_id = guestbook.id, "created guestbook");
    Ok(Redirect::to("/admin"))
}

/// Handler for POST /admin/guestbook/:guestbook_id/edit
///
/// Replaces the guestbook's settings. Cached bodies hold only messages, so
/// nothing is invalidated; the new allow list and challenge apply to the
/// next request.
pub async fn edit_guestbook_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Path(guestbook_id): Path<GuestbookId>,
    Form(form): Form<GuestbookForm>,
) -> Result<Redirect> {
    let allowed_origins = validate_origins(&form.allowed_origins)?;

    let mut store = state.store.write().await;
    store.owner_of(guestbook_id, &username)?;
    let guestbook = store.update_guestbook(
        guestbook_id,
        GuestbookSettings {
            website_url: form.website_url.trim().to_string(),
            requires_approval: form.requires_approval.as_deref() == Some("on"),
            challenge_question: form.challenge_question.trim().to_string(),
            challenge_answer: form.challenge_answer.trim().to_string(),
            challenge_hint: form.challenge_hint.trim().to_string(),
            allowed_origins,
        },
    )?;

    info!(
        admin = %username,
        guestbook_id,
        requires_approval = guestbook.requires_approval,
        "updated guestbook settings"
    );
    Ok(Redirect::to(&format!("/admin/guestbook/{guestbook_id}/edit")))
}

/// Handler for POST /admin/guestbook/:guestbook_id/delete
pub async fn delete_guestbook_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Path(guestbook_id): Path<GuestbookId>,
) -> Result<Redirect> {
    let mut store = state.store.write().await;
    store.owner_of(guestbook_id, &username)?;

    store.delete_guestbook(guestbook_id)?;
    state.cache.invalidate_guestbook(guestbook_id);

    info!(admin = %username, guestbook_id, "deleted guestbook");
    Ok(Redirect::to("/admin"))
}

/// Handler for POST /admin/guestbook/:guestbook_id/message/:message_id/edit
pub async fn edit_message_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Path((guestbook_id, message_id)): Path<(GuestbookId, MessageId)>,
    Form(form): Form<EditMessageForm>,
) -> Result<Redirect> {
    let mut store = state.store.write().await;
    store.owner_of(guestbook_id, &username)?;
    store.message_in(guestbook_id, message_id)?;

    let website = form.website.trim();
    store.update_message(
        message_id,
        MessageUpdate {
            name: form.name.trim().to_string(),
            text: form.text.trim().to_string(),
            website: (!website.is_empty()).then(|| website.to_string()),
            approved: form.approved(),
        },
    )?;
    state.cache.invalidate_guestbook(guestbook_id);

    info!(admin = %username, guestbook_id, message_id, "edited message");
    Ok(Redirect::to(&format!("/admin/guestbook/{guestbook_id}")))
}

/// Handler for POST /admin/guestbook/:guestbook_id/message/:message_id/delete
pub async fn delete_message_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Path((guestbook_id, message_id)): Path<(GuestbookId, MessageId)>,
) -> Result<Redirect> {
    let mut store = state.store.write().await;
    store.owner_of(guestbook_id, &username)?;
    store.message_in(guestbook_id, message_id)?;

    store.delete_message(message_id)?;
    state.cache.invalidate_guestbook(guestbook_id);

    info!(admin = %username, guestbook_id, message_id, "deleted message");
    Ok(Redirect::to(&format!("/admin/guestbook/{guestbook_id}")))
}

/// Handler for POST /admin/guestbook/:guestbook_id/message/:message_id/reply
///
/// Replies are one level deep and published immediately.
pub async fn reply_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Path((guestbook_id, message_id)): Path<(GuestbookId, MessageId)>,
    Form(form): Form<ReplyForm>,
) -> Result<Redirect> {
    if let Some(error_msg) = form.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let mut store = state.store.write().await;
    let admin = store.owner_of(guestbook_id, &username)?;
    if store.message_in(guestbook_id, message_id)?.is_reply() {
        return Err(AppError::InvalidRequest(
            "Cannot reply to a reply".to_string(),
        ));
    }

    let reply = store.create_message(NewMessage {
        guestbook_id,
        name: admin.reply_name().to_string(),
        text: form.text.trim().to_string(),
        website: None,
        approved: true,
        parent_message_id: Some(message_id),
        author_admin_id: Some(admin.id),
    })?;
    state.cache.invalidate_guestbook(guestbook_id);

    info!(
        admin = %username,
        guestbook_id,
        message_id,
        reply_id = reply.id,
        "replied to message"
    );
    Ok(Redirect::to(&format!("/admin/guestbook/{guestbook_id}")))
}

/// Handler for POST /admin/guestbook/:guestbook_id/messages/bulk-delete
pub async fn bulk_delete_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Path(guestbook_id): Path<GuestbookId>,
    body: std::result::Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> Result<&'static str> {
    let mut store = state.store.write().await;
    store.owner_of(guestbook_id, &username)?;

    let Json(request) =
        body.map_err(|_| AppError::InvalidRequest("Invalid request body".to_string()))?;
    let message_ids = request.parse_ids().map_err(AppError::InvalidRequest)?;

    let message_count = store.bulk_delete(guestbook_id, &message_ids)?;
    state.cache.invalidate_guestbook(guestbook_id);

    info!(
        admin = %username,
        guestbook_id,
        message_count,
        message_ids = ?message_ids,
        "bulk deleted messages"
    );
    Ok("Messages deleted successfully")
}

/// Handler for POST /admin/settings
///
/// Renames the admin's existing replies so cached threads never show the
/// old name.
pub async fn settings_handler(
    State(state): State<AppState>,
    AdminIdentity(username): AdminIdentity,
    Form(form): Form<SettingsForm>,
) -> Result<Redirect> {
    let mut store = state.store.write().await;
    let admin = store.ensure_admin(&username);
    let admin = store.set_display_name(admin.id, form.display_name.trim())?;

    let touched = store.rename_replies(admin.id, admin.reply_name());
    for guestbook_id in &touched {
        state.cache.invalidate_guestbook(*guestbook_id);
    }

    info!(
        admin = %username,
        guestbook_count = touched.len(),
        "updated display name"
    );
    Ok(Redirect::to("/admin/settings"))
}
