//! Domain types and pure logic shared across the cardsign workspace.
//!
//! Holds the card/document data model, the bridge error taxonomy, webhook
//! trigger detection, and the outbound service port traits. This crate has
//! no I/O; everything here is unit-testable without a network.

pub mod error;
pub mod fields;
pub mod services;
pub mod trigger;
pub mod types;

pub use error::{BridgeError, BridgeResult};
