//! Run configuration for tracking sessions
//!
//! The writer takes an explicit [`RunConfig`]. Environment lookups happen here,
//! at the call site, through [`RunConfig::from_env`]:
//! 1. `WANDB_API_KEY` gates whether a session is opened at all
//! 2. `WANDB_TEAM` selects the owning entity
//! 3. `WANDB_GROUP` names the run group (a generated suffix is always appended)
//! 4. `LOCAL_RANK` feeds the display name `<hostname>-<rank>`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

use crate::error::{ConfigError, ConfigResult};

pub const ENV_API_KEY: &str = "WANDB_API_KEY";
pub const ENV_TEAM: &str = "WANDB_TEAM";
pub const ENV_GROUP: &str = "WANDB_GROUP";
pub const ENV_LOCAL_RANK: &str = "LOCAL_RANK";

/// Length of the id appended to an explicit group name
const GROUP_SUFFIX_LEN: usize = 8;

/// Session parameters for a single run
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Project the run is logged under
    pub project: String,
    /// Owning team / entity
    #[serde(default)]
    pub team: Option<String>,
    /// Requested group name, before suffixing
    #[serde(default)]
    pub group: Option<String>,
    /// Access credential; no session is opened without it
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Display name for the run
    #[serde(default)]
    pub name: Option<String>,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("project", &self.project)
            .field("team", &self.team)
            .field("group", &self.group)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .finish()
    }
}

impl RunConfig {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            team: None,
            group: None,
            api_key: None,
            name: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build a config from the process environment
    pub fn from_env(project: impl Into<String>) -> Self {
        Self::from_lookup(project, |key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(project: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let rank = get(ENV_LOCAL_RANK)
            .and_then(|rank| rank.trim().parse::<u32>().ok())
            .unwrap_or(0);
        let host = gethostname::gethostname().to_string_lossy().into_owned();

        Self {
            project: project.into(),
            team: get(ENV_TEAM),
            group: get(ENV_GROUP),
            api_key: get(ENV_API_KEY),
            name: Some(display_name(&host, rank)),
        }
    }

    /// Load a run configuration from a TOML file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ParseError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| {
            ConfigError::ParseError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check required fields
    pub fn validate(&self) -> ConfigResult<()> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "project".to_string(),
            });
        }
        Ok(())
    }

    /// Whether a credential is present
    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

/// Generate a short unique run id
pub fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(GROUP_SUFFIX_LEN);
    id
}

/// Resolve the group a run is logged under.
///
/// Without a requested name a fresh unique id is used; with one, a generated
/// suffix is appended so repeated launches never collide.
pub fn resolve_group(requested: Option<&str>) -> String {
    match requested.filter(|group| !group.trim().is_empty()) {
        Some(group) => format!("{}_{}", group, generate_id()),
        None => Uuid::new_v4().simple().to_string(),
    }
}

/// Display name `<host>-<rank>`
pub fn display_name(host: &str, rank: u32) -> String {
    format!("{}-{}", host, rank)
}
