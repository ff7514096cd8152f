pub mod config;
pub mod error;
pub mod passes;
pub mod telemetry;
