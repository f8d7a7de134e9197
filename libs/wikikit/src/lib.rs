//! # WikiKit - Engine Module Registry
//!
//! Building blocks for a wiki engine's extension system: module descriptors
//! with declared version ranges, a compatibility gate against the running
//! engine version, and an engine-owned registry with snapshot-safe
//! enumeration.
//!
//! ## Features
//!
//! - **Name-keyed descriptors**: a module's identity is its name; dedup and
//!   ordering fall out of one consistent key
//! - **Version gating**: modules declare `min_version`/`max_version` bounds
//!   checked against the engine version, with an opt-in bypass
//! - **Snapshot-safe enumeration**: registries hand out detached, ordered
//!   collections that stay valid while the registry keeps changing
//!
//! ## Basic Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wikikit::{EngineModuleRegistry, ModuleDescriptor, ModuleRegistry, VersionGate};
//!
//! let gate = VersionGate::new(semver::Version::new(2, 11, 0));
//! let registry = EngineModuleRegistry::new(Arc::new(engine), gate);
//! registry.register(ModuleDescriptor::new("table-of-contents")?)?;
//!
//! for module in registry.modules() {
//!     println!("{module}");
//! }
//! ```

pub mod compat;
pub mod descriptor;
pub mod registry;

pub use compat::{host_version, VersionGate};
pub use descriptor::{DescriptorError, ModuleDescriptor};
pub use registry::{dedup_modules, EngineModuleRegistry, ModuleRegistry, RegistryError};

// Re-export the config types the gate consumes.
pub use wikikit_bootstrap::config::{AppConfig, RegistryConfig};
