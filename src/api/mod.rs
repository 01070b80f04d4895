//! API Module
//!
//! HTTP handlers and routing for the guestbook service.
//!
//! # Endpoints
//! - `GET /api/v1/get-guestbook-messages/:guestbook_id` - All threads
//! - `GET /api/v2/get-guestbook-messages/:guestbook_id` - One page of threads
//! - `POST /guestbook/:guestbook_id/submit` - Visitor message
//! - `POST /admin/...` - Guestbook and message administration
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod admin;
pub mod handlers;
pub mod origin;
pub mod routes;

pub use admin::AdminIdentity;
pub use handlers::*;
pub use routes::create_router;
