// Library root: re-exports all modules so the CLI and integration tests can
// reach the engine's public API.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod import;
pub mod metrics;
