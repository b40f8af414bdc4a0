use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Locations of the legacy stores and the master database
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreConfig {
    pub items: PathBuf,
    pub routes: PathBuf,
    pub mission: PathBuf,
    pub products: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    stores: StoreConfig,
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[stores]
items = "items.db"
routes = "routes.db"
mission = "MissionData.db"
products = "products.db"
target = "master.db"
"#;

/// Per-store path overrides from the command line
#[derive(Debug, Clone, Default)]
pub struct StoreOverrides {
    pub items: Option<PathBuf>,
    pub routes: Option<PathBuf>,
    pub mission: Option<PathBuf>,
    pub products: Option<PathBuf>,
    pub target: Option<PathBuf>,
}

impl StoreConfig {
    /// Load store locations.
    ///
    /// Search order:
    /// 1. `explicit` (error if it cannot be read)
    /// 2. `config.toml` in the platform config directory
    /// 3. The embedded default, relative to the working directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Some(dirs) = ProjectDirs::from("", "", "route-consolidator") {
            let path = dirs.config_dir().join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
            tracing::debug!("no config at {}", path.display());
        }

        tracing::info!("Using default embedded store configuration");
        Self::parse(DEFAULT_CONFIG)
    }

    /// Read a config file; relative store paths resolve against its directory
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;

        match path.parent() {
            Some(base) => Ok(config.relative_to(base)),
            None => Ok(config),
        }
    }

    fn parse(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.stores)
    }

    fn relative_to(self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            items: resolve(self.items),
            routes: resolve(self.routes),
            mission: resolve(self.mission),
            products: resolve(self.products),
            target: resolve(self.target),
        }
    }

    /// Apply command-line paths over the loaded ones
    pub fn with_overrides(self, overrides: StoreOverrides) -> Self {
        Self {
            items: overrides.items.unwrap_or(self.items),
            routes: overrides.routes.unwrap_or(self.routes),
            mission: overrides.mission.unwrap_or(self.mission),
            products: overrides.products.unwrap_or(self.products),
            target: overrides.target.unwrap_or(self.target),
        }
    }
}
