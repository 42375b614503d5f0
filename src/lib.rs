// Public API for integration tests and embedding the engine in another host

pub mod broadcast;
pub mod commands;
pub mod config;
pub mod engine;
pub mod manager;
pub mod protocol;
pub mod session;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;
