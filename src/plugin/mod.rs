pub mod build;
pub mod github;
pub mod installer;
pub mod workflow;

pub use workflow::{BranchApplyWorkflow, InstallResult};
