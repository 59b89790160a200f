//! Library crate for hunt-back, exposing modules for binaries and integration tests.

/// Configuration file and environment settings.
pub mod config;
/// Persistence layer.
pub mod dao;
/// Request and response bodies.
pub mod dto;
/// Service and HTTP errors.
pub mod error;
/// HTTP routes.
pub mod routes;
/// Business logic.
pub mod services;
/// Domain model and shared application state.
pub mod state;
