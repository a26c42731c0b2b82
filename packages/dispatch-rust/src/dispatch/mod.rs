//! Request dispatch framework.
//!
//! This module implements the dispatch pipeline behind every broker call:
//!
//! 1. **Parameters** (`call`): `Dispatch` plus the `DispatchError` taxonomy
//! 2. **Middleware** (`middleware`): Tower layers (metrics, deadline, broker)
//! 3. **Dispatcher** (`dispatcher`): Entry point that resolves destinations and runs the pipeline
//! 4. **Configuration** (`config`): Publisher identity, destinations, timeouts

pub mod call;
pub mod config;
pub mod dispatcher;
pub mod middleware;

// Re-export key types for convenient access.
pub use call::{Branch, Dispatch, DispatchError, DispatchResult};
pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
