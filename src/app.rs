use anyhow::Result;

use crate::model::config::AppConfig;
use crate::model::repo::RepositoryRef;
use crate::model::settings::{
    ACCESS_TOKEN_KEY, ConfigStore, REPO_KEY, read_credentials, read_repository,
};
use crate::msg::{Msg, Notice};
use crate::plugin::build::{BuildRunner, SystemCommandRunner};
use crate::plugin::github::GitHubClient;
use crate::plugin::installer::{PluginInstaller, TemplateLayout};
use crate::plugin::{BranchApplyWorkflow, InstallResult};

pub const NO_BRANCHES: &str = "Error fetching branches. Please authenticate first.";
pub const BRANCH_PLACEHOLDER: &str = "Select a Branch";

pub struct App {
    config: AppConfig,
    settings: Box<dyn ConfigStore>,
    github: GitHubClient,
    installer: PluginInstaller,
    builder: BuildRunner,
}

impl App {
    pub fn new(config: AppConfig, settings: Box<dyn ConfigStore>) -> Result<Self> {
        let builder = BuildRunner::new(config.composer_home(), SystemCommandRunner);
        Self::with_builder(config, settings, builder)
    }

    pub fn with_builder(
        config: AppConfig,
        settings: Box<dyn ConfigStore>,
        builder: BuildRunner,
    ) -> Result<Self> {
        let github = GitHubClient::new(&config.github)?;
        let mut installer = PluginInstaller::new(config.plugins_dir());
        if let Some(template) = config.general.plugin_dir_template.clone() {
            installer = installer.with_resolver(TemplateLayout { template });
        }

        Ok(Self {
            config,
            settings,
            github,
            installer,
            builder,
        })
    }

    pub fn update(&mut self, msg: Msg) -> Vec<Notice> {
        match msg {
            Msg::Authenticate { access_token, repo } => {
                vec![self.authenticate(&access_token, &repo)]
            }
            Msg::ApplyBranch { branch } => vec![self.apply_branch(&branch)],
            Msg::ListBranches => self
                .branch_dropdown()
                .into_iter()
                .map(|line| {
                    if line == NO_BRANCHES {
                        Notice::error("branch_list", line)
                    } else {
                        Notice::updated("branch_option", line)
                    }
                })
                .collect(),
            Msg::ShowSettings => self.settings_summary(),
        }
    }

    /// Placeholder followed by branch names, or a single error line.
    pub fn branch_dropdown(&self) -> Vec<String> {
        let default_repo = &self.config.general.default_repo;
        let repo = match read_repository(self.settings.as_ref(), default_repo) {
            Ok(repo) => repo,
            Err(err) => {
                tracing::warn!("cannot list branches: {err}");
                return vec![NO_BRANCHES.to_string()];
            }
        };

        let branches = self
            .github
            .list_branches(&repo, &read_credentials(self.settings.as_ref()));
        if branches.is_empty() {
            return vec![NO_BRANCHES.to_string()];
        }

        std::iter::once(BRANCH_PLACEHOLDER.to_string())
            .chain(branches.into_iter().map(|branch| branch.name))
            .collect()
    }

    fn authenticate(&mut self, access_token: &str, repo: &str) -> Notice {
        if access_token.is_empty() {
            return Notice::error("auth_error", "Access token cannot be empty.");
        }

        let repo = if repo.is_empty() {
            self.settings
                .get(REPO_KEY, &self.config.general.default_repo)
        } else {
            repo.to_string()
        };
        if let Err(err) = repo.parse::<RepositoryRef>() {
            return Notice::error("auth_error", err.to_string());
        }

        let saved = self
            .settings
            .set(ACCESS_TOKEN_KEY, access_token)
            .and_then(|()| self.settings.set(REPO_KEY, &repo));
        match saved {
            Ok(()) => {
                tracing::info!("saved credentials for {repo}");
                Notice::updated("auth_success", "Authenticated successfully!")
            }
            Err(err) => {
                tracing::error!("saving settings failed: {err:#}");
                Notice::error("auth_error", "Could not save settings.")
            }
        }
    }

    fn apply_branch(&self, branch: &str) -> Notice {
        let workflow = BranchApplyWorkflow {
            settings: self.settings.as_ref(),
            default_repo: &self.config.general.default_repo,
            fetcher: &self.github,
            installer: &self.installer,
            builder: &self.builder,
        };

        match workflow.apply(branch) {
            InstallResult::Success => Notice::updated(
                "branch_success",
                format!("Branch {branch} downloaded successfully!"),
            ),
            InstallResult::Failure(reason) => {
                Notice::error("branch_error", format!("Error: {reason}"))
            }
        }
    }

    fn settings_summary(&self) -> Vec<Notice> {
        let repo = self
            .settings
            .get(REPO_KEY, &self.config.general.default_repo);
        let creds = read_credentials(self.settings.as_ref());
        let token = if creds.is_anonymous() {
            "(not set)".to_string()
        } else {
            creds.masked()
        };

        vec![
            Notice::updated("settings", format!("repository: {repo}")),
            Notice::updated("settings", format!("access token: {token}")),
            Notice::updated(
                "settings",
                format!("plugins directory: {}", self.installer.destination_root().display()),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::settings::MemorySettingsStore;
    use crate::msg::NoticeKind;
    use crate::plugin::build::fake::RecordingRunner;
    use crate::plugin::installer::zip_archive;

    struct Fixture {
        server: mockito::ServerGuard,
        plugins: tempfile::TempDir,
        runner: RecordingRunner,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                server: mockito::Server::new(),
                plugins: tempfile::tempdir().unwrap(),
                runner: RecordingRunner::default(),
            }
        }

        fn app(&self, settings: MemorySettingsStore) -> App {
            let mut config = AppConfig::defaults().unwrap();
            config.github.api_url = self.server.url();
            config.github.web_url = self.server.url();
            config.general.plugins_dir = self.plugins.path().display().to_string();

            let builder =
                BuildRunner::new(self.plugins.path().join("composer"), self.runner.clone());
            App::with_builder(config, Box::new(settings), builder).unwrap()
        }
    }

    fn authenticated() -> MemorySettingsStore {
        MemorySettingsStore::with(&[(REPO_KEY, "acme/widget"), (ACCESS_TOKEN_KEY, "tok1234")])
    }

    #[test]
    fn authenticate_requires_token() {
        let fixture = Fixture::new();
        let mut app = fixture.app(MemorySettingsStore::default());

        let notices = app.update(Msg::Authenticate {
            access_token: String::new(),
            repo: "acme/widget".to_string(),
        });

        assert_eq!(
            notices,
            vec![Notice::error("auth_error", "Access token cannot be empty.")]
        );
        assert_eq!(app.settings.get(REPO_KEY, "unset"), "unset");
    }

    #[test]
    fn authenticate_rejects_malformed_repo() {
        let fixture = Fixture::new();
        let mut app = fixture.app(MemorySettingsStore::default());

        let notices = app.update(Msg::Authenticate {
            access_token: "tok".to_string(),
            repo: "widget".to_string(),
        });

        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert_eq!(app.settings.get(ACCESS_TOKEN_KEY, ""), "");
    }

    #[test]
    fn authenticate_persists_both_values() {
        let fixture = Fixture::new();
        let mut app = fixture.app(MemorySettingsStore::default());

        let notices = app.update(Msg::Authenticate {
            access_token: "tok".to_string(),
            repo: "octo/cat".to_string(),
        });

        assert_eq!(
            notices,
            vec![Notice::updated("auth_success", "Authenticated successfully!")]
        );
        assert_eq!(app.settings.get(ACCESS_TOKEN_KEY, ""), "tok");
        assert_eq!(app.settings.get(REPO_KEY, ""), "octo/cat");
    }

    #[test]
    fn dropdown_lists_branches_after_placeholder() {
        let mut fixture = Fixture::new();
        let _branches = fixture
            .server
            .mock("GET", "/repos/acme/widget/branches")
            .with_body(r#"[{"name":"main"},{"name":"feature/x"}]"#)
            .create();
        let mut app = fixture.app(authenticated());

        let notices = app.update(Msg::ListBranches);
        let lines: Vec<_> = notices.iter().map(|n| n.message.as_str()).collect();

        assert_eq!(lines, vec![BRANCH_PLACEHOLDER, "main", "feature/x"]);
    }

    #[test]
    fn dropdown_degrades_to_error_line() {
        let mut fixture = Fixture::new();
        let _branches = fixture
            .server
            .mock("GET", "/repos/acme/widget/branches")
            .with_status(401)
            .with_body(r#"{"message":"Bad credentials"}"#)
            .create();
        let mut app = fixture.app(authenticated());

        let notices = app.update(Msg::ListBranches);

        assert_eq!(notices, vec![Notice::error("branch_list", NO_BRANCHES)]);
    }

    #[test]
    fn empty_branch_makes_no_request() {
        let mut fixture = Fixture::new();
        let download = fixture
            .server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create();
        let mut app = fixture.app(authenticated());

        let notices = app.update(Msg::ApplyBranch {
            branch: String::new(),
        });

        download.assert();
        assert_eq!(
            notices,
            vec![Notice::error("branch_error", "Error: no branch selected")]
        );
    }

    #[test]
    fn apply_branch_downloads_extracts_and_builds() {
        let mut fixture = Fixture::new();
        let download = fixture
            .server
            .mock("GET", "/acme/widget/archive/refs/heads/main.zip")
            .match_header("authorization", "token tok1234")
            .with_body(zip_archive(&["widget-main/", "widget-main/package.json"]))
            .create();
        let mut app = fixture.app(authenticated());

        let notices = app.update(Msg::ApplyBranch {
            branch: "main".to_string(),
        });

        download.assert();
        assert_eq!(
            notices,
            vec![Notice::updated(
                "branch_success",
                "Branch main downloaded successfully!"
            )]
        );
        assert!(fixture.plugins.path().join("widget-main/package.json").is_file());
        assert_eq!(fixture.runner.step_names().len(), 3);
    }

    #[test]
    fn failed_apply_is_prefixed_once() {
        let mut fixture = Fixture::new();
        let _download = fixture
            .server
            .mock("GET", "/acme/widget/archive/refs/heads/main.zip")
            .with_status(404)
            .create();
        let mut app = fixture.app(authenticated());

        let notices = app.update(Msg::ApplyBranch {
            branch: "main".to_string(),
        });

        assert_eq!(notices.len(), 1);
        let rendered = notices[0].to_string();
        assert!(rendered.starts_with("Error: Download error:"), "{rendered}");
        assert_eq!(rendered.matches("Error:").count(), 1, "{rendered}");
        assert!(fixture.runner.step_names().is_empty());
    }

    #[test]
    fn settings_never_show_full_token() {
        let fixture = Fixture::new();
        let mut app = fixture.app(MemorySettingsStore::with(&[(
            ACCESS_TOKEN_KEY,
            "ghp_verysecret9876",
        )]));

        let rendered: Vec<String> = app
            .update(Msg::ShowSettings)
            .iter()
            .map(ToString::to_string)
            .collect();

        assert!(rendered.iter().any(|line| line.ends_with("9876")));
        assert!(rendered.iter().all(|line| !line.contains("verysecret")));
        assert!(rendered.contains(&"repository: mdhrshahin20/rex-toaster".to_string()));
    }
}
