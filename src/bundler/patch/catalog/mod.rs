//! Built-in patch catalog.
//!
//! Keys are stable identifiers; several entries may target the same
//! package family (`@vercel/*` keys all patch `@ai-sdk/*` providers).

mod fetch;
mod gateway;
mod opentelemetry;
mod vercel_ai;

use crate::bundler::registry::{Registry, RegistryError};

/// Registers every built-in patch module.
pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    gateway::register(registry)?;
    fetch::register(registry)?;
    vercel_ai::register(registry)?;
    opentelemetry::register(registry)?;
    Ok(())
}
