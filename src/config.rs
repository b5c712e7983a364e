use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Centralized client configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Project that datasets belong to unless one is given explicitly.
    pub project: String,
    /// Default `maxResults` for table listings.
    pub page_size: Option<u32>,
}

/// Command-line + environment configuration.
///
/// Embedding binaries can parse this directly or `#[command(flatten)]` it.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about = "Dataset API client")]
pub struct ClientArgs {
    /// Project ID (overrides DATASET_CLIENT_PROJECT)
    #[arg(long)]
    pub project: Option<String>,

    /// Page size for table listings (overrides DATASET_CLIENT_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl ClientConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            page_size: None,
        }
    }

    /// Parse the process arguments and merge them over the environment.
    pub fn from_env_and_args() -> Result<Self> {
        Self::from_args(ClientArgs::parse())
    }

    /// Merge already-parsed arguments over the environment.
    pub fn from_args(args: ClientArgs) -> Result<Self> {
        // --- Environment fallback ---
        let env_project = read_env("DATASET_CLIENT_PROJECT")?;
        let env_page_size = read_env("DATASET_CLIENT_PAGE_SIZE")?;
        Self::merge(args, env_project, env_page_size)
    }

    /// Arguments win over the environment values.
    fn merge(
        args: ClientArgs,
        env_project: Option<String>,
        env_page_size: Option<String>,
    ) -> Result<Self> {
        let env_page_size = env_page_size
            .map(|value| {
                value
                    .parse::<u32>()
                    .with_context(|| format!("parsing DATASET_CLIENT_PAGE_SIZE value `{}`", value))
            })
            .transpose()?;

        let Some(project) = args.project.or(env_project) else {
            bail!("no project configured; pass --project or set DATASET_CLIENT_PROJECT");
        };
        if project.trim().is_empty() {
            bail!("project must not be empty");
        }

        Ok(Self {
            project,
            page_size: args.page_size.or(env_page_size),
        })
    }
}

fn read_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {key}")),
    }
}
