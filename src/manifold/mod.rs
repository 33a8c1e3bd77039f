//! # Manifold Module
//!
//! [`Venue`](crate::exec::venue::Venue) implementation over the Manifold
//! Markets REST API.

/// HTTP client
pub mod client;
/// API wire types
pub mod types;

pub use client::{ManifoldClient, DEFAULT_BASE_URL};
