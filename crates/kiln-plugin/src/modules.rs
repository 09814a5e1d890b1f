//! Module info registry — lazily created, shared metadata per module id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::trace;

/// Mutable metadata record for one module.
///
/// Plugins accumulate facts about a module here across multiple hook
/// calls; every lookup for the same id observes the same record.
#[derive(Debug, Clone, Default)]
pub struct ModuleInfo {
    /// The module id this record belongs to.
    pub id: String,
    /// Plugin-defined metadata fields.
    pub meta: HashMap<String, serde_json::Value>,
}

impl ModuleInfo {
    /// Creates an empty record for the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            meta: HashMap::new(),
        }
    }
}

/// Shared handle to a module info record.
pub type ModuleInfoHandle = Arc<RwLock<ModuleInfo>>;

/// Registry of module info records, keyed by module id.
///
/// Records are created on first access and persist until [`clear`]
/// is called; handles returned for the same id are identical, so
/// mutations through one handle are visible through every other.
///
/// [`clear`]: ModuleInfoRegistry::clear
#[derive(Debug, Default)]
pub struct ModuleInfoRegistry {
    /// Module id → shared record.
    modules: RwLock<HashMap<String, ModuleInfoHandle>>,
}

impl ModuleInfoRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the record for `id`, creating it on first access.
    pub async fn get_or_create(&self, id: &str) -> ModuleInfoHandle {
        {
            let modules = self.modules.read().await;
            if let Some(info) = modules.get(id) {
                return info.clone();
            }
        }

        let mut modules = self.modules.write().await;
        // A racing caller may have created the record between the locks.
        modules
            .entry(id.to_string())
            .or_insert_with(|| {
                trace!(module_id = %id, "Module info record created");
                Arc::new(RwLock::new(ModuleInfo::new(id)))
            })
            .clone()
    }

    /// Gets the record for `id` without creating it.
    pub async fn get(&self, id: &str) -> Option<ModuleInfoHandle> {
        self.modules.read().await.get(id).cloned()
    }

    /// Returns the number of records.
    pub async fn len(&self) -> usize {
        self.modules.read().await.len()
    }

    /// Returns whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.modules.read().await.is_empty()
    }

    /// Removes all records. For long-lived hosts that would otherwise
    /// grow without bound.
    pub async fn clear(&self) {
        self.modules.write().await.clear();
    }
}
