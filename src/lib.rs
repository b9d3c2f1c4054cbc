pub mod banner;
pub mod classify;
pub mod commands;
pub mod config;
pub mod consts;
pub mod engine;
pub mod export;
pub mod orchestrator;
pub mod readiness;
pub mod samples;
pub mod spinner;
pub mod state;
pub mod transform;
