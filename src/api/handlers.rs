//! API Handlers
//!
//! Public read endpoints, the visitor submit form, and service endpoints.
//!
//! Read handlers hold the store's read guard from the store query until the
//! result is cached, and every writer invalidates while still holding the
//! write guard. A response computed from pre-write data can therefore never
//! be cached after the write's invalidation.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use super::origin::{check_origin_allowed, OriginDecision};
use crate::cache::{CacheStatsSnapshot, GuestbookId, MessageCache};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{HealthResponse, PageQuery, PaginatedMessages, Pagination, SubmitForm};
use crate::store::{MemoryStore, NewMessage};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read-path cache, internally synchronised
    pub cache: Arc<MessageCache>,
    /// Source of truth
    pub store: Arc<RwLock<MemoryStore>>,
}

impl AppState {
    pub fn new(cache: MessageCache, store: MemoryStore) -> Self {
        Self {
            cache: Arc::new(cache),
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Creates a new AppState with an empty store and a cache sized from
    /// configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = MessageCache::new(config.cache_capacity, config.cache_ttl())?;
        Ok(Self::new(cache, MemoryStore::new()))
    }
}

/// Serialises a body and tags it with the cache outcome.
fn cached_json<T: Serialize + ?Sized>(
    body: &T,
    hit: bool,
    origin: &OriginDecision,
) -> Result<Response> {
    let bytes = serde_json::to_vec(body).map_err(|e| AppError::Internal(e.to_string()))?;

    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        bytes,
    )
        .into_response();
    let headers = response.headers_mut();
    headers.insert(
        X_CACHE,
        HeaderValue::from_static(if hit { "HIT" } else { "MISS" }),
    );
    origin.apply(headers);
    Ok(response)
}

/// Handler for GET /api/v1/get-guestbook-messages/:guestbook_id
///
/// Returns every approved top-level message with its approved replies.
pub async fn messages_v1_handler(
    State(state): State<AppState>,
    Path(guestbook_id): Path<GuestbookId>,
    headers: HeaderMap,
) -> Result<Response> {
    let store = state.store.read().await;
    let guestbook = store.guestbook(guestbook_id)?;
    let origin = check_origin_allowed(&headers, &guestbook.allowed_origins)?;

    if let Some(messages) = state.cache.get_messages(guestbook_id) {
        return cached_json(messages.as_slice(), true, &origin);
    }

    let messages = store.approved_threads(guestbook_id, 0, None);
    let response = cached_json(&messages, false, &origin)?;
    state.cache.set_messages(guestbook_id, messages);
    Ok(response)
}

/// Handler for GET /api/v2/get-guestbook-messages/:guestbook_id
///
/// Returns one page of threads plus pagination metadata.
pub async fn messages_v2_handler(
    State(state): State<AppState>,
    Path(guestbook_id): Path<GuestbookId>,
    Query(query): Query<PageQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let store = state.store.read().await;
    let guestbook = store.guestbook(guestbook_id)?;
    let origin = check_origin_allowed(&headers, &guestbook.allowed_origins)?;

    let (page, limit) = query.resolve();
    if let Some(cached) = state.cache.get_paginated_response(guestbook_id, page, limit) {
        return cached_json(cached.as_ref(), true, &origin);
    }

    let total = match state.cache.get_count(guestbook_id) {
        Some(total) => total,
        None => {
            let total = store.count_approved_messages(guestbook_id);
            state.cache.set_count(guestbook_id, total);
            total
        }
    };

    let pagination = Pagination::new(page, limit, total);
    let messages = store.approved_threads(guestbook_id, pagination.offset(), Some(limit as usize));
    let body = serde_json::to_value(PaginatedMessages {
        messages,
        pagination,
    })
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let response = cached_json(&body, false, &origin)?;
    state
        .cache
        .set_paginated_response(guestbook_id, page, limit, body);
    Ok(response)
}

/// Handler for POST /guestbook/:guestbook_id/submit
///
/// Stores a visitor message and redirects back to the guestbook page.
pub async fn submit_handler(
    State(state): State<AppState>,
    Path(guestbook_id): Path<GuestbookId>,
    Form(form): Form<SubmitForm>,
) -> Result<Redirect> {
    let mut store = state.store.write().await;
    let guestbook = store.guestbook(guestbook_id)?;

    // A question without a stored answer accepts any reply.
    if !guestbook.challenge_question.trim().is_empty() {
        let expected = guestbook.challenge_answer.trim().to_lowercase();
        let given = form.challenge_answer.trim().to_lowercase();
        if !expected.is_empty() && given != expected {
            return Err(AppError::Unauthorized(
                "Incorrect challenge answer".to_string(),
            ));
        }
    }

    if let Some(error_msg) = form.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let website = form.website.trim();
    let approved = !guestbook.requires_approval;
    let message = store.create_message(NewMessage {
        guestbook_id,
        name: form.name.trim().to_string(),
        text: form.text.trim().to_string(),
        website: (!website.is_empty()).then(|| website.to_string()),
        approved,
        ..Default::default()
    })?;
    state.cache.invalidate_guestbook(guestbook_id);
    drop(store);

    info!(
        guestbook_id,
        message_id = message.id,
        approved,
        "visitor message submitted"
    );
    Ok(Redirect::to(&format!("/guestbook/{guestbook_id}")))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<CacheStatsSnapshot> {
    Json(state.cache.stats())
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
