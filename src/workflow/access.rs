//! Role-scoped inbox access
//!
//! Maps a caller's role id to the stages whose inbox it may read. Roles that
//! are not listed are unrestricted.

use crate::config::ConfigError;
use crate::error::ServiceError;
use crate::models::WorkflowStage;
use std::collections::{BTreeSet, HashMap};

/// Role 4 (SDPO) only works its own pending queue.
pub const DEFAULT_ROLE_STAGE_ACCESS: &str = "4=SDPO_PENDING";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleStageAccess {
    rules: HashMap<String, BTreeSet<WorkflowStage>>,
}

impl RoleStageAccess {
    pub fn allow(
        mut self,
        role_id: impl Into<String>,
        stages: impl IntoIterator<Item = WorkflowStage>,
    ) -> Self {
        self.rules.entry(role_id.into()).or_default().extend(stages);
        self
    }

    /// Parse `"<role>=<STAGE>[,<STAGE>...][;<role>=...]"`.
    pub fn parse(rules: &str) -> Result<Self, ConfigError> {
        let mut access = Self::default();

        for entry in rules.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (role, stages) = entry.split_once('=').ok_or_else(|| {
                ConfigError::Invalid(format!("role access entry '{}' is missing '='", entry))
            })?;

            let role = role.trim();
            if role.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "role access entry '{}' has no role id",
                    entry
                )));
            }

            let stages = stages
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<WorkflowStage>()
                        .map_err(|e| ConfigError::Invalid(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            if stages.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "role {} has no stages listed",
                    role
                )));
            }

            access = access.allow(role, stages);
        }

        Ok(access)
    }

    /// Gate a caller on the stage name it asked for, before the name is
    /// parsed. A restricted role gets Forbidden for any name outside its set,
    /// including names that are not stages at all.
    pub fn check(&self, role_id: Option<&str>, stage_name: &str) -> Result<(), ServiceError> {
        let Some((role, stages)) = role_id
            .map(str::trim)
            .and_then(|role| self.rules.get_key_value(role))
        else {
            return Ok(());
        };

        let wanted = stage_name.trim();
        if stages.iter().any(|s| s.as_str().eq_ignore_ascii_case(wanted)) {
            return Ok(());
        }

        let allowed = stages
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ServiceError::Forbidden(format!(
            "Role {} may only access stages: {}",
            role, allowed
        )))
    }
}
