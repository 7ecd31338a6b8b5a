use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::model::repo::validate_branch_name;
use crate::model::settings::{ConfigStore, read_credentials, read_repository};
use crate::plugin::build::BuildRunner;
use crate::plugin::github::ArchiveFetcher;
use crate::plugin::installer::PluginInstaller;

/// Outcome of one apply-branch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallResult {
    Success,
    Failure(String),
}

/// Download → extract → build for a single branch, aborting at the first
/// failed step. Nothing is rolled back on failure.
pub struct BranchApplyWorkflow<'a> {
    pub settings: &'a dyn ConfigStore,
    pub default_repo: &'a str,
    pub fetcher: &'a dyn ArchiveFetcher,
    pub installer: &'a PluginInstaller,
    pub builder: &'a BuildRunner,
}

impl BranchApplyWorkflow<'_> {
    pub fn apply(&self, branch: &str) -> InstallResult {
        if branch.is_empty() {
            return InstallResult::Failure("no branch selected".to_string());
        }

        match self.run(branch) {
            Ok(plugin_dir) => {
                tracing::info!("branch {branch} installed at {}", plugin_dir.display());
                InstallResult::Success
            }
            Err(err) => {
                tracing::error!("applying branch {branch} failed: {err:?}");
                err.into()
            }
        }
    }

    fn run(&self, branch: &str) -> Result<PathBuf> {
        validate_branch_name(branch)?;

        let repo = read_repository(self.settings, self.default_repo)?;
        let creds = read_credentials(self.settings);
        tracing::info!("applying {repo}@{branch}");

        let archive = self.fetcher.fetch_archive(&repo, branch, &creds)?;
        let plugin_dir = self.installer.install(&archive, branch, &repo)?;
        self.builder.run_build(&plugin_dir)?;

        Ok(plugin_dir)
    }
}

impl From<Error> for InstallResult {
    fn from(err: Error) -> Self {
        Self::Failure(err.to_string())
    }
}
