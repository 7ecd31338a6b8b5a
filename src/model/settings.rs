use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use crate::model::repo::{Credentials, RepositoryRef};

pub const ACCESS_TOKEN_KEY: &str = "github_branch_tester_access_token";
pub const REPO_KEY: &str = "github_branch_tester_repo";

/// Named string values persisted across runs.
pub trait ConfigStore {
    fn get(&self, key: &str, default: &str) -> String;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Reads the repository identifier, falling back to `default_repo`.
pub fn read_repository(
    store: &dyn ConfigStore,
    default_repo: &str,
) -> crate::error::Result<RepositoryRef> {
    store.get(REPO_KEY, default_repo).parse()
}

pub fn read_credentials(store: &dyn ConfigStore) -> Credentials {
    Credentials::new(store.get(ACCESS_TOKEN_KEY, ""))
}

/// Flat string table stored as TOML. Every `get` re-reads the file.
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `settings.toml` in the project config directory.
    pub fn open_default() -> Result<Self> {
        let proj_dirs = directories::ProjectDirs::from("", "", "branch-tester")
            .ok_or_else(|| anyhow!("cannot determine config directory"))?;
        Ok(Self::new(proj_dirs.config_dir().join("settings.toml")))
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }
}

impl ConfigStore for TomlSettingsStore {
    fn get(&self, key: &str, default: &str) -> String {
        match self.read_table() {
            Ok(mut table) => table.remove(key).unwrap_or_else(|| default.to_string()),
            Err(err) => {
                tracing::warn!("settings unavailable, using default for {key}: {err:#}");
                default.to_string()
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut table = self.read_table()?;
        table.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string(&table)?)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
}

#[cfg(test)]
impl MemorySettingsStore {
    pub fn with(values: &[(&str, &str)]) -> Self {
        Self {
            values: values
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
impl ConfigStore for MemorySettingsStore {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
