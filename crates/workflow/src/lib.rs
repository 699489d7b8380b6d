//! GraphQL client for the workflow SaaS (card queries and mutations).

pub mod client;

pub use client::{WorkflowClient, DEFAULT_POLICY};
