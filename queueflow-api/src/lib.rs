//! QueueFlow messaging API
//!
//! Routes `GET */status`, `POST */enqueue` and `POST */publish` requests to
//! the queue and topic adapters. The same [`MessagingApi`] is hosted either
//! by an axum server ([`server`]) or by the AWS Lambda Runtime API loop
//! ([`lambda`]).

pub mod lambda;
pub mod router;
pub mod server;

pub use router::{ApiRequest, DispatchError, MessagingApi};
pub use server::create_router;
