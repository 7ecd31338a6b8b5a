use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

/// One external command of the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub name: &'static str,
    pub program: &'static str,
    pub args: &'static [&'static str],
    /// Environment set on this step's subprocess only.
    pub env: Vec<(&'static str, OsString)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutput {
    pub success: bool,
    /// stdout followed by stderr.
    pub output: String,
}

/// Executes a build step inside a directory.
pub trait CommandRunner {
    fn run(&self, step: &BuildStep, dir: &Path) -> io::Result<StepOutput>;
}

#[derive(Debug, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, step: &BuildStep, dir: &Path) -> io::Result<StepOutput> {
        let mut cmd = Command::new(step.program);
        cmd.args(step.args).current_dir(dir);
        for (key, value) in &step.env {
            cmd.env(key, value);
        }

        let out = cmd.output()?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));

        Ok(StepOutput {
            success: out.status.success(),
            output,
        })
    }
}

/// Dependency install for composer and npm, then the npm asset build.
pub fn default_steps(composer_home: &Path) -> Vec<BuildStep> {
    vec![
        BuildStep {
            name: "composer install",
            program: "composer",
            args: &["install"],
            env: vec![("COMPOSER_HOME", composer_home.as_os_str().to_owned())],
        },
        BuildStep {
            name: "npm install",
            program: "npm",
            args: &["install"],
            env: Vec::new(),
        },
        BuildStep {
            name: "npm run build",
            program: "npm",
            args: &["run", "build"],
            env: Vec::new(),
        },
    ]
}

pub struct BuildRunner {
    steps: Vec<BuildStep>,
    runner: Box<dyn CommandRunner>,
}

impl BuildRunner {
    pub fn new(composer_home: PathBuf, runner: impl CommandRunner + 'static) -> Self {
        Self {
            steps: default_steps(&composer_home),
            runner: Box::new(runner),
        }
    }

    /// Runs every step in order, stopping at the first failure.
    pub fn run_build(&self, plugin_dir: &Path) -> Result<()> {
        for step in &self.steps {
            tracing::info!("running {} in {}", step.name, plugin_dir.display());

            let result = self.runner.run(step, plugin_dir).map_err(|err| Error::Build {
                step: step.name.to_string(),
                output: format!("failed to start {}: {err}", step.program),
            })?;

            if !result.success {
                tracing::error!("{} failed:\n{}", step.name, result.output);
                return Err(Error::Build {
                    step: step.name.to_string(),
                    output: result.output,
                });
            }
        }

        Ok(())
    }
}
