use std::collections::BTreeSet;
use std::fs;
use std::io::{Seek, Write};
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::repo::{RepositoryRef, branch_slug};

/// Remaps the conventional plugin directory for archives with a different
/// top-level layout.
pub trait PluginDirResolver {
    fn resolve(&self, conventional: PathBuf, repo: &RepositoryRef, branch: &str) -> PathBuf;
}

impl<F> PluginDirResolver for F
where
    F: Fn(PathBuf, &RepositoryRef, &str) -> PathBuf,
{
    fn resolve(&self, conventional: PathBuf, repo: &RepositoryRef, branch: &str) -> PathBuf {
        self(conventional, repo, branch)
    }
}

/// Keeps `<root>/<repo>-<branch-slug>` unchanged.
#[derive(Debug, Default)]
pub struct ConventionalLayout;

impl PluginDirResolver for ConventionalLayout {
    fn resolve(&self, conventional: PathBuf, _repo: &RepositoryRef, _branch: &str) -> PathBuf {
        conventional
    }
}

/// Names the plugin directory from a template such as
/// `{owner}-{repo}-{slug}`. `{branch}` is the raw branch name.
#[derive(Debug, Clone)]
pub struct TemplateLayout {
    pub template: String,
}

impl PluginDirResolver for TemplateLayout {
    fn resolve(&self, conventional: PathBuf, repo: &RepositoryRef, branch: &str) -> PathBuf {
        let name = self
            .template
            .replace("{owner}", &repo.owner)
            .replace("{repo}", &repo.name)
            .replace("{slug}", &branch_slug(branch))
            .replace("{branch}", branch);

        match conventional.parent() {
            Some(root) => root.join(name),
            None => PathBuf::from(name),
        }
    }
}

pub struct PluginInstaller {
    destination_root: PathBuf,
    temp_dir: PathBuf,
    resolver: Box<dyn PluginDirResolver>,
}

impl PluginInstaller {
    pub fn new(destination_root: PathBuf) -> Self {
        Self {
            destination_root,
            temp_dir: std::env::temp_dir(),
            resolver: Box::new(ConventionalLayout),
        }
    }

    #[cfg(test)]
    pub fn with_temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.temp_dir = temp_dir;
        self
    }

    pub fn with_resolver(mut self, resolver: impl PluginDirResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    /// Directory a branch archive is expected to unpack into.
    pub fn conventional_dir(&self, repo: &RepositoryRef, branch: &str) -> PathBuf {
        self.destination_root
            .join(format!("{}-{}", repo.name, branch_slug(branch)))
    }

    /// Extracts `archive` under the destination root and returns the plugin
    /// directory it produced.
    ///
    /// The archive is staged in a temporary file that is removed on every
    /// exit path. A failed extraction may leave partial files behind.
    pub fn install(&self, archive: &[u8], branch: &str, repo: &RepositoryRef) -> Result<PathBuf> {
        let mut staged = tempfile::Builder::new()
            .prefix("plugin_zip")
            .suffix(".zip")
            .tempfile_in(&self.temp_dir)
            .map_err(|err| Error::extraction("creating temporary archive", err))?;
        tracing::debug!("staging archive at {}", staged.path().display());

        staged
            .write_all(archive)
            .and_then(|()| staged.flush())
            .and_then(|()| staged.rewind())
            .map_err(|err| Error::extraction("writing temporary archive", err))?;

        let mut zip = ZipArchive::new(staged.as_file_mut())
            .map_err(|err| Error::extraction("Unzip error", err))?;
        let top_level = top_level_entries(&zip);

        fs::create_dir_all(&self.destination_root).map_err(|err| {
            Error::extraction(&format!("creating {}", self.destination_root.display()), err)
        })?;
        zip.extract(&self.destination_root)
            .map_err(|err| Error::extraction("Unzip error", err))?;
        tracing::info!(
            "extracted {} entries into {}",
            zip.len(),
            self.destination_root.display()
        );

        let conventional = self.conventional_dir(repo, branch);
        let plugin_dir = self.resolver.resolve(conventional, repo, branch);
        if !plugin_dir.is_dir() || !self.produced_by_archive(&plugin_dir, &top_level) {
            let found = top_level.into_iter().collect::<Vec<_>>().join(", ");
            return Err(Error::Extraction(format!(
                "expected plugin directory is missing: {} (archive contains: {found})",
                plugin_dir.display()
            )));
        }

        Ok(plugin_dir)
    }

    /// Whether `plugin_dir` lies under one of the archive's top-level
    /// entries, so a directory left by an earlier run is not mistaken for
    /// this extraction. Directories outside the destination root come from
    /// a custom resolver and are not checked.
    fn produced_by_archive(&self, plugin_dir: &Path, top_level: &BTreeSet<String>) -> bool {
        let Ok(relative) = plugin_dir.strip_prefix(&self.destination_root) else {
            tracing::debug!(
                "{} is outside {}, skipping archive layout check",
                plugin_dir.display(),
                self.destination_root.display()
            );
            return true;
        };

        match relative.components().next() {
            Some(Component::Normal(first)) => first
                .to_str()
                .is_some_and(|first| top_level.contains(first)),
            _ => false,
        }
    }
}

fn top_level_entries<R>(zip: &ZipArchive<R>) -> BTreeSet<String>
where
    R: std::io::Read + Seek,
{
    zip.file_names()
        .filter_map(|name| name.split('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) fn zip_archive(entries: &[&str]) -> Vec<u8> {
    use std::io::Cursor;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        if entry.ends_with('/') {
            writer
                .add_directory(*entry, SimpleFileOptions::default())
                .unwrap();
        } else {
            writer
                .start_file(*entry, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"{}\n").unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}
