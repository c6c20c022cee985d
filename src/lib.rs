pub mod apis;
pub mod classify;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod types;

// Layered boundaries: fetch ports and their reqwest implementation
pub mod app;
pub mod infra;

// Change detection for payloads that are only reprocessed when they change
pub mod gateway;
