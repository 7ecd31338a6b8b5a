use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

static BRANCH_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]+$").expect("valid branch name regex"));

/// An `owner/name` pair identifying an upstream repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepositoryRef {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let invalid = || {
            Error::validation(format!(
                "invalid repository \"{raw}\", expected the format username/repo"
            ))
        };

        let (owner, name) = raw.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Personal access token. Empty means anonymous access.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Token with everything but the last four characters hidden.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }

        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{visible}", "*".repeat(chars.len() - 4))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_anonymous() {
            f.write_str("Credentials(anonymous)")
        } else {
            f.write_str("Credentials(<redacted>)")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    pub name: String,
}

/// Rejects branch names that could escape a URL path segment or the
/// plugins directory.
pub fn validate_branch_name(branch: &str) -> Result<()> {
    let invalid = |why: &str| Error::validation(format!("invalid branch name \"{branch}\": {why}"));

    if !BRANCH_NAME.is_match(branch) {
        return Err(invalid("only letters, digits, '.', '_', '-' and '/' are allowed"));
    }

    if branch.starts_with('-') || branch.starts_with('/') {
        return Err(invalid("must not start with '-' or '/'"));
    }

    if branch
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid("empty, '.' or '..' path segments are not allowed"));
    }

    Ok(())
}

/// Directory suffix used by branch archives: `/` becomes `-`.
pub fn branch_slug(branch: &str) -> String {
    branch.replace('/', "-")
}
