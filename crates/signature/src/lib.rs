//! REST client for the signature SaaS (document creation and signing).

pub mod client;

pub use client::{SignatureClient, DEFAULT_POLICY};
