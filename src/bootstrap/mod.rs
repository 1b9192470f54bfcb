//! Setup for the main tracker application.
//!
//! The [`app::setup`] function reads the configuration and initialises
//! tracing; the [`jobs`] submodules start the application services.
pub mod app;
pub mod config;
pub mod jobs;
pub mod tracing;
