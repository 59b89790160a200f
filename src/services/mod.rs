/// Named analytics events.
pub mod audit_events;
/// Outbound collaborators: push, audit sink, end-game scheduler.
pub mod dispatch;
/// OpenAPI documentation generation.
pub mod documentation;
/// Pure action processing against the stored game.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Push audience selection.
pub mod notifications;
/// Save orchestration and the end-game worker.
pub mod save_game_service;
/// Completion check, ranking and winner resolution.
pub mod scoring;
/// Storage connection supervision.
pub mod storage_supervisor;
/// Exception reporting.
pub mod telemetry;
