//! Campaign-level error and the process exit status for each failure.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::executor::ExecError;
use crate::invocation::InvocationError;
use crate::record::RecordError;
use crate::workspace::WorkspaceError;

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INVALID_CONFIG: i32 = 2;
pub const EXIT_WORKSPACE_EXISTS: i32 = 10;
pub const EXIT_NO_BENCHMARKS: i32 = 44;

/// Anything that stops a campaign.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

impl CampaignError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CampaignError::Config(ConfigError::Io { .. }) => EXIT_FAILURE,
            CampaignError::Config(_) => EXIT_INVALID_CONFIG,
            CampaignError::Catalog(CatalogError::NoRunnableBenchmarks { .. }) => {
                EXIT_NO_BENCHMARKS
            }
            CampaignError::Workspace(WorkspaceError::AlreadyExists(_)) => EXIT_WORKSPACE_EXISTS,
            CampaignError::Workspace(_)
            | CampaignError::Invocation(_)
            | CampaignError::Exec(_)
            | CampaignError::Record(_) => EXIT_FAILURE,
        }
    }
}
