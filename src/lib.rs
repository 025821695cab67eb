pub mod ai;
pub mod analyzer;
pub mod api;
pub mod cache;
pub mod config;
pub mod decision;
pub mod errors;
pub mod guidelines;
pub mod health;
pub mod orchestrator;
pub mod rate;
pub mod store;
pub mod types;
