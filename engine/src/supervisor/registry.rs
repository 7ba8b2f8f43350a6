//! Capability registry
//!
//! Maps executor identity to the executor instance and its capability
//! description. Registration is an explicit, ordered bootstrap step, and the
//! registry can be mutated while queries are in flight (dynamic registration
//! at any depth of the hierarchy), so mutations are serialized against
//! concurrent lookups with a read-write lock.

use crate::supervisor::error::RegistryError;
use sdk::{Executor, ExecutorDescriptor};
use std::sync::{Arc, RwLock};

/// What to do when a registration collides with an existing identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPolicy {
    /// Fail loudly on a duplicate identity (default): silently shadowing a
    /// capability during hierarchical composition is how delegation bugs hide
    #[default]
    Reject,

    /// Explicitly overwrite the previous registration
    Replace,
}

/// Registry of executors available for delegation
pub struct CapabilityRegistry {
    executors: RwLock<Vec<Arc<dyn Executor>>>,
    policy: RegistrationPolicy,
}

impl CapabilityRegistry {
    /// Create an empty registry with the default (reject) policy
    pub fn new() -> Self {
        Self::with_policy(RegistrationPolicy::default())
    }

    /// Create an empty registry with an explicit duplicate policy
    pub fn with_policy(policy: RegistrationPolicy) -> Self {
        Self {
            executors: RwLock::new(Vec::new()),
            policy,
        }
    }

    /// Register an executor under its descriptor identity
    pub fn register(&self, executor: Arc<dyn Executor>) -> Result<(), RegistryError> {
        let identity = executor.descriptor().identity.clone();
        let mut executors = self.executors.write().expect("registry lock poisoned");

        if let Some(position) = executors
            .iter()
            .position(|e| e.descriptor().identity == identity)
        {
            match self.policy {
                RegistrationPolicy::Reject => {
                    return Err(RegistryError::DuplicateRegistration(identity));
                }
                RegistrationPolicy::Replace => {
                    tracing::info!(identity, "replacing registered executor");
                    executors[position] = executor;
                    return Ok(());
                }
            }
        }

        tracing::info!(identity, "registered executor");
        executors.push(executor);
        Ok(())
    }

    /// Remove an executor by identity
    pub fn deregister(&self, identity: &str) -> Result<Arc<dyn Executor>, RegistryError> {
        let mut executors = self.executors.write().expect("registry lock poisoned");
        let position = executors
            .iter()
            .position(|e| e.descriptor().identity == identity)
            .ok_or_else(|| RegistryError::NotFound(identity.to_string()))?;

        tracing::info!(identity, "deregistered executor");
        Ok(executors.remove(position))
    }

    /// Exact-match, case-sensitive lookup by identity
    pub fn lookup(&self, identity: &str) -> Option<Arc<dyn Executor>> {
        self.executors
            .read()
            .expect("registry lock poisoned")
            .iter()
            .find(|e| e.descriptor().identity == identity)
            .cloned()
    }

    /// All descriptors in registration order
    pub fn list_all(&self) -> Vec<ExecutorDescriptor> {
        self.executors
            .read()
            .expect("registry lock poisoned")
            .iter()
            .map(|e| e.descriptor().clone())
            .collect()
    }

    /// Number of registered executors
    pub fn len(&self) -> usize {
        self.executors.read().expect("registry lock poisoned").len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
