// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod db;
pub mod protocol;
pub mod rooms;
pub mod state;
pub mod types;
pub mod ws;
