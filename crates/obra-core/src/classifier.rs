//! Cached node-name classification
//!
//! Scenes exported from modelling tools repeat the same node names many
//! times (one per instance), so the classifier remembers the outcome per
//! lowercased name.

use std::collections::HashMap;

use crate::registry::{ServiceDefinition, ServiceRegistry};

/// Service registry with a name -> service lookup cache
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: ServiceRegistry,
    cache: HashMap<String, Option<usize>>,
}

impl Classifier {
    pub fn new(registry: ServiceRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Index of the service claiming `node_name`, using the cache
    pub fn classify_index(&mut self, node_name: &str) -> Option<usize> {
        if node_name.is_empty() {
            return None;
        }
        let key = node_name.to_lowercase();
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let result = self.registry.classify_index(&key);
        self.cache.insert(key, result);
        result
    }

    /// Service claiming `node_name`; `None` means no override applies
    pub fn classify(&mut self, node_name: &str) -> Option<&ServiceDefinition> {
        let index = self.classify_index(node_name)?;
        self.registry.services().get(index)
    }

    /// Name of the service claiming `node_name`
    pub fn service_name(&mut self, node_name: &str) -> Option<&str> {
        self.classify(node_name).map(|s| s.service_name.as_str())
    }

    /// Number of distinct names seen so far
    pub fn cached_names(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
