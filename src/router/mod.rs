//! Note router - binds note identities to device endpoints
//!
//! The router is built once per session from the mapping configuration and
//! is read-only afterwards. Dispatch fans out to every binding that shares
//! the incoming note identity, in registration order.

#[cfg(test)]
mod tests;

use crate::config::MappingConfig;
use crate::devices::{Device, DeviceRegistry};
use crate::error::{PlayError, Result};
use crate::note::{NoteCommand, NoteIdentity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// A note identity bound to a device endpoint
#[derive(Clone)]
pub struct Binding {
    pub device: Arc<dyn Device>,
    pub endpoint: String,
    pub identity: NoteIdentity,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("device", &self.device.name())
            .field("endpoint", &self.endpoint)
            .field("identity", &self.identity.to_string())
            .finish()
    }
}

/// Routes note events to their bound endpoints
#[derive(Debug, Default)]
pub struct NoteRouter {
    /// Bindings in registration order
    bindings: Vec<Binding>,
    /// Identity → binding indices (ascending)
    index: HashMap<NoteIdentity, Vec<usize>>,
}

impl NoteRouter {
    /// Build all bindings, failing fast on the first invalid mapping
    pub fn from_mappings(mappings: &[MappingConfig], devices: &DeviceRegistry) -> Result<Self> {
        let mut router = Self::default();

        for mapping in mappings {
            let device = devices
                .get(&mapping.device)
                .ok_or_else(|| PlayError::UnknownDeviceReference(mapping.device.clone()))?;

            let identity = NoteIdentity::new(mapping.channel, &mapping.note, mapping.octave)
                .map_err(|e| match e {
                    PlayError::InvalidNoteIdentity(reason) => PlayError::InvalidNoteIdentity(
                        format!("mapping for {} {}: {}", mapping.device, mapping.endpoint, reason),
                    ),
                    other => other,
                })?;

            device.check_endpoint(&mapping.endpoint)?;

            router.add_binding(Binding {
                device: device.clone(),
                endpoint: mapping.endpoint.clone(),
                identity,
            });
        }

        info!(
            "Registered {} bindings for {} note identities",
            router.bindings.len(),
            router.index.len()
        );
        Ok(router)
    }

    fn add_binding(&mut self, binding: Binding) {
        debug!(
            "Binding {} → {}.{}",
            binding.identity,
            binding.device.name(),
            binding.endpoint
        );
        self.index
            .entry(binding.identity)
            .or_default()
            .push(self.bindings.len());
        self.bindings.push(binding);
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Bindings for one identity, in registration order
    pub fn bindings_for(&self, identity: &NoteIdentity) -> impl Iterator<Item = &Binding> {
        self.index
            .get(identity)
            .into_iter()
            .flatten()
            .map(|&idx| &self.bindings[idx])
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Call every endpoint bound to `identity`
    ///
    /// Returns the number of endpoint calls made. A failing device call is
    /// logged and does not prevent the remaining calls.
    pub async fn dispatch(&self, identity: &NoteIdentity, command: NoteCommand) -> usize {
        let mut calls = 0;
        for binding in self.bindings_for(identity) {
            trace!(
                note = %identity,
                device = binding.device.name(),
                endpoint = %binding.endpoint,
                %command,
                "Dispatching"
            );
            if let Err(e) = binding.device.call_endpoint(&binding.endpoint, command).await {
                warn!(
                    "Device '{}' endpoint {} failed for {}: {}",
                    binding.device.name(),
                    binding.endpoint,
                    command,
                    e
                );
            }
            calls += 1;
        }
        calls
    }
}
