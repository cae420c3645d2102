//! Adapters behind the engine's repository and zone ports.

#[cfg(test)]
pub mod memory;
pub mod mysql;
