// Library root: re-exports all modules so integration tests and external
// consumers can access the crate's public API.

pub mod board;
pub mod broadcast;
pub mod config;
pub mod draft;
pub mod error;
pub mod lock;
pub mod protocol;
pub mod rooms;
pub mod settle;
pub mod store;
pub mod ws_server;
