//! Keyed registry of request/response post-processing hooks.
//!
//! A deployment registers modifiers for specific {service, version,
//! request, response} tuples; the streaming layer looks one up per
//! assembled observation and applies it when present. The registry is
//! explicitly constructed and passed in — there is deliberately no
//! process-wide instance, so each test builds its own.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observation::Observation;

/// Request type a modifier is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    GetObservation,
    GetObservationById,
    GetDataAvailability,
}

/// Response type a modifier is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseKind {
    GetObservation,
    GetObservationById,
    GetDataAvailability,
}

/// Composite lookup key: one registration per
/// {service, version, request, response} tuple.
///
/// Value equality plus `Hash` makes the registry a plain map lookup
/// instead of polymorphic dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModifierKey {
    pub service: String,
    pub version: String,
    pub request: RequestKind,
    pub response: Option<ResponseKind>,
}

impl ModifierKey {
    /// Request-only key (no response type).
    pub fn new(service: impl Into<String>, version: impl Into<String>, request: RequestKind) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            request,
            response: None,
        }
    }

    /// Narrow the key to a request/response pair.
    #[must_use]
    pub fn with_response(mut self, response: ResponseKind) -> Self {
        self.response = Some(response);
        self
    }
}

/// Failure inside a response modifier.
///
/// Surfaced distinctly so callers can tell a broken hook from storage
/// trouble.
#[derive(Debug, Error)]
#[error("response modifier failed: {0}")]
pub struct ModifierError(pub String);

/// Post-processing hook applied to each assembled observation.
pub trait ResponseModifier: Send + Sync {
    fn modify(&self, observation: &mut Observation) -> Result<(), ModifierError>;
}

/// Explicitly constructed lookup table of response modifiers.
///
/// Lookups are O(1) amortized; a miss means no-op for the caller.
#[derive(Default)]
pub struct ModifierRegistry {
    modifiers: HashMap<ModifierKey, Arc<dyn ResponseModifier>>,
}

impl ModifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier under a key, replacing any previous entry.
    pub fn register(&mut self, key: ModifierKey, modifier: Arc<dyn ResponseModifier>) {
        if self.modifiers.insert(key.clone(), modifier).is_some() {
            tracing::warn!(service = %key.service, version = %key.version, "replaced existing response modifier");
        }
    }

    /// Look up the modifier declared for `key`, if any.
    #[must_use]
    pub fn lookup(&self, key: &ModifierKey) -> Option<Arc<dyn ResponseModifier>> {
        self.modifiers.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &ModifierKey) -> bool {
        self.modifiers.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierRegistry").field("registered", &self.modifiers.len()).finish()
    }
}
