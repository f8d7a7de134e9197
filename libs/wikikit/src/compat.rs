use semver::Version;
use wikikit_bootstrap::config::{AppConfig, RegistryConfig};

use crate::descriptor::ModuleDescriptor;

/// Decides whether a module's declared version range covers the running
/// engine version.
///
/// The bypass flag is fixed at construction; there is no runtime toggle.
#[derive(Debug, Clone)]
pub struct VersionGate {
    engine_version: Version,
    load_incompatible: bool,
}

impl VersionGate {
    /// Gate that enforces version checking against `engine_version`.
    pub fn new(engine_version: Version) -> Self {
        Self {
            engine_version,
            load_incompatible: false,
        }
    }

    /// Gate that accepts every module regardless of its declared range.
    pub fn permissive(engine_version: Version) -> Self {
        Self {
            engine_version,
            load_incompatible: true,
        }
    }

    /// Gate configured by the registry config section.
    pub fn from_config(cfg: &RegistryConfig, engine_version: Version) -> Self {
        Self {
            engine_version,
            load_incompatible: cfg.load_incompatible,
        }
    }

    /// Gate built straight from the application config; the engine version
    /// string comes from the `engine` section.
    pub fn from_app_config(cfg: &AppConfig) -> Result<Self, semver::Error> {
        let engine_version = Version::parse(&cfg.engine.version)?;
        Ok(Self::from_config(&cfg.registry, engine_version))
    }

    /// Version of the engine this gate checks against.
    pub fn engine_version(&self) -> &Version {
        &self.engine_version
    }

    /// True if the module may be loaded into this engine.
    ///
    /// An absent bound is always satisfied on that side. In bypass mode
    /// every module passes.
    pub fn is_compatible(&self, module: &ModuleDescriptor) -> bool {
        if self.load_incompatible {
            return true;
        }

        let above_min = module
            .min_version
            .as_ref()
            .map_or(true, |min| self.engine_version >= *min);
        let below_max = module
            .max_version
            .as_ref()
            .map_or(true, |max| self.engine_version <= *max);

        above_min && below_max
    }
}

/// Version this crate was compiled as; the default engine version.
pub fn host_version() -> Version {
    // CARGO_PKG_VERSION is always valid semver.
    Version::parse(env!("CARGO_PKG_VERSION")).expect("crate version is valid semver")
}
