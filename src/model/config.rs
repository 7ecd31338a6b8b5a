use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub github: GitHubConfig,
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Root directory branch archives are extracted into.
    pub plugins_dir: String,
    /// Repository used until one is saved in the settings store.
    pub default_repo: String,
    /// Overrides the `<repo>-<branch>` directory name archives unpack into.
    #[serde(default)]
    pub plugin_dir_template: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub api_url: String,
    pub web_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// `COMPOSER_HOME` for the composer step only.
    pub composer_home: String,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let mut user_str = None;
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "branch-tester") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                user_str = Some(fs::read_to_string(&config_path)?);
            }
        }

        let mut config = Self::layered(user_str.as_deref())?;
        config.general.plugins_dir = expand_tilde(&config.general.plugins_dir)?;
        config.build.composer_home = expand_tilde(&config.build.composer_home)?;

        Ok(config)
    }

    pub fn defaults() -> Result<Self> {
        Self::layered(None)
    }

    /// Bundled defaults with the user file merged over them key by key, so
    /// a user file only needs the values it changes.
    fn layered(user: Option<&str>) -> Result<Self> {
        let mut merged: toml::Value = toml::from_str(include_str!("../../config/default.toml"))?;
        if let Some(user) = user {
            merge(&mut merged, toml::from_str(user)?);
        }
        Ok(merged.try_into()?)
    }

    pub fn plugins_dir(&self) -> PathBuf {
        PathBuf::from(&self.general.plugins_dir)
    }

    pub fn composer_home(&self) -> PathBuf {
        PathBuf::from(&self.build.composer_home)
    }
}

fn merge(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn expand_tilde(path: &str) -> Result<String> {
    if !path.starts_with('~') {
        return Ok(path.to_string());
    }

    let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(path.replacen('~', &home.to_string_lossy(), 1))
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
