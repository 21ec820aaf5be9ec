pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod tasks;
pub mod templating;

// Layered boundaries: domain shapes, use cases behind ports, adapters
pub mod app;
pub mod domain;
pub mod infra;
