//! Snapshot-based schema registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;

/// A logical schema known to the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    /// Logical schema name, as clients request it
    pub name: String,
    /// Names of the data sources backing this schema
    pub data_sources: Vec<String>,
}

impl SchemaDescriptor {
    /// Create a descriptor with no data sources
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_sources: Vec::new(),
        }
    }

    /// Set the backing data sources.
    pub fn with_data_sources(mut self, data_sources: Vec<String>) -> Self {
        self.data_sources = data_sources;
        self
    }
}

/// Immutable mapping from schema name to descriptor.
#[derive(Debug, Default)]
pub struct SchemaSnapshot {
    schemas: HashMap<String, Arc<SchemaDescriptor>>,
}

impl SchemaSnapshot {
    /// Build a snapshot from descriptors. Later duplicates win.
    pub fn new(descriptors: impl IntoIterator<Item = SchemaDescriptor>) -> Self {
        let schemas = descriptors
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(d)))
            .collect();
        Self { schemas }
    }

    /// Build a snapshot from the `schemas` section of the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.schemas.iter().map(|(name, schema)| {
            SchemaDescriptor::new(name.clone()).with_data_sources(schema.data_sources.clone())
        }))
    }

    /// Exact, case-sensitive lookup
    pub fn get(&self, name: &str) -> Option<Arc<SchemaDescriptor>> {
        self.schemas.get(name).cloned()
    }

    /// Whether a schema with this exact name exists
    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Number of schemas
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Whether the snapshot holds no schemas
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Schema names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Read-only lookup of logical schemas.
pub trait SchemaResolver: Send + Sync {
    /// Resolve a schema by exact name against the current snapshot.
    fn resolve(&self, name: &str) -> Option<Arc<SchemaDescriptor>>;
}

/// Process-wide registry holding the current [`SchemaSnapshot`].
///
/// The lock guards only the pointer: readers hold it long enough to clone the
/// `Arc`, and [`SchemaRegistry::reload`] swaps in a new snapshot. A reader that
/// already holds a snapshot keeps using it after a reload.
#[derive(Debug)]
pub struct SchemaRegistry {
    current: RwLock<Arc<SchemaSnapshot>>,
    generation: AtomicU64,
}

impl SchemaRegistry {
    /// Create a registry serving `snapshot`
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a registry from configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(SchemaSnapshot::from_config(config))
    }

    /// Create a shared registry from configuration
    pub fn shared(config: &Config) -> Arc<Self> {
        Arc::new(Self::from_config(config))
    }

    /// The snapshot currently served
    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Replace the current snapshot, returning the new generation number.
    pub fn reload(&self, snapshot: SchemaSnapshot) -> u64 {
        let schema_count = snapshot.len();
        *self.current.write() = Arc::new(snapshot);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        info!(generation, schema_count, "Schema registry reloaded");
        generation
    }

    /// Number of reloads applied since creation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new(SchemaSnapshot::default())
    }
}

impl SchemaResolver for SchemaRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<SchemaDescriptor>> {
        self.snapshot().get(name)
    }
}
