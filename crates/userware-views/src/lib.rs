//! # userware-views
//!
//! The request pipeline for userware. This crate provides:
//!
//! - [`middleware`] - The [`Middleware`](middleware::Middleware) trait and the
//!   onion-model [`MiddlewarePipeline`](middleware::MiddlewarePipeline)
//! - [`session`] - Session storage backends and [`SessionMiddleware`](session::SessionMiddleware)
//! - [`messages`] - One-time notifications stored in the session
//! - [`server`] - [`UserwareApp`](server::UserwareApp), which bridges a route
//!   table and a pipeline into an axum `Router`
//!
//! Middleware sees requests in the order it was added and responses in
//! reverse. Per-request state (the session, the authenticated account) is
//! carried in the request's extensions as shared handles, so a mutation made
//! by a view is visible to every middleware on the way out.

pub mod messages;
pub mod middleware;
pub mod server;
pub mod session;

pub use messages::{Message, MessageLevel, Messages, MessagesMiddleware};
pub use middleware::{Middleware, MiddlewarePipeline, ViewHandler};
pub use server::UserwareApp;
pub use session::{
    InMemorySessionBackend, Session, SessionBackend, SessionData, SessionMiddleware,
};
