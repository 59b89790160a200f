/// Save request body.
pub mod game;
/// Health check body.
pub mod health;
/// Request validation rules.
pub mod validation;
