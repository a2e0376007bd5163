//! # Train Runtime
//!
//! Runs Train applications:
//! - The per-request lifecycle pipeline with its `onHandle` error boundary
//! - The [`Application`] owning options, shared data and hooks
//! - An HTTP/1.1 server built on hyper
//! - Graceful shutdown with signal handling

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod application;
pub mod pipeline;
pub mod server;
pub mod shutdown;

pub use application::Application;
pub use pipeline::{HandleOutcome, Resolution, INTERNAL_ERROR_MESSAGE};
pub use server::Server;
pub use shutdown::{ShutdownSignal, SignalHandler};

/// Runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    /// Server is initializing
    Initializing,
    /// Server is running
    Running,
    /// Server is shutting down
    ShuttingDown,
    /// Server is stopped
    Stopped,
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::application::Application;
    pub use crate::server::Server;
    pub use crate::shutdown::{ShutdownSignal, SignalHandler};
    pub use crate::RuntimeState;
    pub use train_config::AppOptions;
    pub use train_core::prelude::*;
    pub use train_router::{Handler, HookRegistry, Router};
}
