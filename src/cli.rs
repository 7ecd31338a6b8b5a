use clap::{Parser, Subcommand};

use crate::msg::{Msg, sanitize_field};

#[derive(Debug, Parser, Clone)]
#[command(name = "branch-tester", version)]
#[command(about = "Download, unpack and build a branch of a GitHub-hosted plugin")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Save the access token and repository.
    Authenticate {
        /// GitHub personal access token.
        token: String,
        /// Repository as `owner/repo`; keeps the stored one when omitted.
        repo: Option<String>,
    },
    /// List the branches of the configured repository.
    Branches,
    /// Download, extract and build a branch.
    Apply { branch: Option<String> },
    /// Show the stored settings with the token masked.
    Settings,
}

impl From<Command> for Msg {
    fn from(command: Command) -> Self {
        let field = |value: Option<String>| {
            value
                .as_deref()
                .map(sanitize_field)
                .unwrap_or_default()
        };

        match command {
            Command::Authenticate { token, repo } => Msg::Authenticate {
                access_token: sanitize_field(&token),
                repo: field(repo),
            },
            Command::Branches => Msg::ListBranches,
            Command::Apply { branch } => Msg::ApplyBranch {
                branch: field(branch),
            },
            Command::Settings => Msg::ShowSettings,
        }
    }
}
