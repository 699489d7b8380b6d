//! Cardsign webhook server library.
//!
//! Exposes the building blocks (config, state, router, routes) so the
//! binary entrypoint and the integration tests share the exact same
//! middleware stack and handlers.

pub mod config;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
