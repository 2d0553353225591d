//! Inbound change notifications for threadcard.
//!
//! The axum listener acknowledges store webhooks and hands record ids to the
//! [`NotificationRouter`] worker over a bounded queue; the worker posts an
//! update card into the thread the record was created from.

pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;

pub use error::{ApiError, WebhookError};
pub use router::{ChatNotifier, Delivery, NotificationRouter, ThreadLink};
pub use routes::{create_router, start_server};
pub use state::{RecordEvent, WebhookState};
