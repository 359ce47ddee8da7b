// Public API for integration tests and potential library usage

pub mod api;
pub mod bots;
pub mod broadcast;
pub mod config;
pub mod mirror;
pub mod protocol;
pub mod state;
pub mod timer;
pub mod types;
pub mod ws;
