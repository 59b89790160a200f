/// Game persistence backends behind the compare-and-swap [`game_store::GameStore`] trait.
pub mod game_store;
/// Stored record with its version token.
pub mod models;
/// Backend-neutral storage errors.
pub mod storage;
