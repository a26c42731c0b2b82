//! Broker transport implementations.

pub mod memory;

pub use memory::MemoryBroker;
