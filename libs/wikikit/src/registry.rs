use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::compat::VersionGate;
use crate::descriptor::ModuleDescriptor;

/// Copy `modules` into a fresh ordered set, dropping duplicate names.
///
/// The first descriptor seen for a name wins; later ones are discarded, not
/// merged. The result iterates ascending by module name and is detached
/// from the input, so it stays valid while the source collection keeps
/// changing.
pub fn dedup_modules<I>(modules: I) -> BTreeSet<ModuleDescriptor>
where
    I: IntoIterator<Item = ModuleDescriptor>,
{
    // BTreeSet::insert keeps the existing element on an equal key.
    modules.into_iter().collect()
}

/// Contract every concrete module registry fulfills.
///
/// Implementations must hand out snapshots: returned collections stay valid
/// and unchanged while the registry itself keeps mutating.
pub trait ModuleRegistry {
    /// All currently registered descriptors, duplicate-free and ordered by
    /// module name.
    fn modules(&self) -> BTreeSet<ModuleDescriptor>;

    /// Descriptor registered under `name`, if any.
    fn module_info(&self, name: &str) -> Option<ModuleDescriptor>;
}

/// Structured errors for module registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("module '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("module '{module}' is not compatible with engine version {engine_version}")]
    Incompatible {
        module: String,
        engine_version: semver::Version,
    },
}

/// Module registry owned by an engine.
///
/// Holds an opaque handle to the owning engine, a [`VersionGate`] fixed at
/// construction, and the registered descriptors. `E` is never inspected;
/// it is stored for module code that needs its way back to the engine.
pub struct EngineModuleRegistry<E> {
    engine: Arc<E>,
    gate: VersionGate,
    modules: RwLock<BTreeMap<String, ModuleDescriptor>>,
}

impl<E> EngineModuleRegistry<E> {
    pub fn new(engine: Arc<E>, gate: VersionGate) -> Self {
        Self {
            engine,
            gate,
            modules: RwLock::new(BTreeMap::new()),
        }
    }

    /// Handle to the owning engine.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn gate(&self) -> &VersionGate {
        &self.gate
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    /// Register a single descriptor.
    ///
    /// Fails when the name is already taken or the gate rejects the
    /// module's declared version range.
    pub fn register(&self, module: ModuleDescriptor) -> Result<(), RegistryError> {
        if !self.gate.is_compatible(&module) {
            return Err(RegistryError::Incompatible {
                module: module.to_string(),
                engine_version: self.gate.engine_version().clone(),
            });
        }

        let mut modules = self.modules.write();
        if modules.contains_key(&module.name) {
            return Err(RegistryError::AlreadyRegistered(module.name));
        }
        modules.insert(module.name.clone(), module);
        Ok(())
    }

    /// Register every descriptor produced by `modules`, deduplicating the
    /// input first.
    ///
    /// Incompatible modules are skipped with a warning and names that are
    /// already registered keep their existing entry. Returns how many
    /// descriptors were accepted.
    pub fn register_all<I>(&self, modules: I) -> usize
    where
        I: IntoIterator<Item = ModuleDescriptor>,
    {
        let mut accepted = Vec::new();

        for module in dedup_modules(modules) {
            if !self.gate.is_compatible(&module) {
                tracing::warn!(
                    module = %module,
                    engine_version = %self.gate.engine_version(),
                    "Skipping module outside its supported version range"
                );
                continue;
            }

            let mut map = self.modules.write();
            if map.contains_key(&module.name) {
                tracing::debug!(module = %module.name, "Module already registered, keeping existing entry");
                continue;
            }
            accepted.push(module.name.clone());
            map.insert(module.name.clone(), module);
        }

        if !accepted.is_empty() {
            tracing::info!(modules = ?accepted, "Registered modules");
        }
        accepted.len()
    }
}

impl<E> ModuleRegistry for EngineModuleRegistry<E> {
    fn modules(&self) -> BTreeSet<ModuleDescriptor> {
        self.modules.read().values().cloned().collect()
    }

    fn module_info(&self, name: &str) -> Option<ModuleDescriptor> {
        self.modules.read().get(name).cloned()
    }
}

impl<E> std::fmt::Debug for EngineModuleRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.modules.read().keys().cloned().collect();
        f.debug_struct("EngineModuleRegistry")
            .field("engine_version", self.gate.engine_version())
            .field("modules", &names)
            .finish()
    }
}
