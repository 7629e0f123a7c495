use std::path::Path;

use serde::{Deserialize, Serialize};
use twig_patch::PatchOptions;

use crate::error::{SdkError, SdkResult};

/// Per-repository settings.
///
/// Every field has a default, so a TOML file only needs to name the
/// settings it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Branch HEAD points at after [`crate::Repository::init`].
    pub default_branch: String,
    /// Drop directories that end up empty after a patch.
    pub prune_empty_trees: bool,
    /// Publish commits whose tree equals their parent's tree.
    pub allow_empty_commits: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            prune_empty_trees: true,
            allow_empty_commits: false,
        }
    }
}

impl RepoConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SdkError::Config(format!("invalid config: {e}")))?;
        twig_refs::validate_branch_name(&config.default_branch)
            .map_err(|e| SdkError::Config(format!("default_branch: {e}")))?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SdkError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SdkError::Config(format!("failed to serialize config: {e}")))
    }

    /// Patch-engine options derived from this configuration.
    pub fn patch_options(&self) -> PatchOptions {
        PatchOptions {
            prune_empty_trees: self.prune_empty_trees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RepoConfig::default();
        assert_eq!(config.default_branch, "main");
        assert!(config.prune_empty_trees);
        assert!(!config.allow_empty_commits);
        assert_eq!(config.patch_options(), PatchOptions::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RepoConfig::from_toml_str("prune_empty_trees = false\n").unwrap();
        assert!(!config.prune_empty_trees);
        assert_eq!(config.default_branch, "main");
        assert!(!config.patch_options().prune_empty_trees);
    }

    #[test]
    fn full_toml() {
        let text = r#"
            default_branch = "master"
            prune_empty_trees = true
            allow_empty_commits = true
        "#;
        let config = RepoConfig::from_toml_str(text).unwrap();
        assert_eq!(config.default_branch, "master");
        assert!(config.allow_empty_commits);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = RepoConfig::from_toml_str("prune_empty_trees = \"yes\"").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn invalid_default_branch_is_rejected() {
        let err = RepoConfig::from_toml_str("default_branch = \"a..b\"").unwrap_err();
        assert!(matches!(err, SdkError::Config(msg) if msg.starts_with("default_branch")));
    }

    #[test]
    fn toml_string_parses_back() {
        let config = RepoConfig {
            default_branch: "trunk".into(),
            ..Default::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(RepoConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twig.toml");
        std::fs::write(&path, "allow_empty_commits = true\n").unwrap();
        assert!(RepoConfig::load(&path).unwrap().allow_empty_commits);

        let missing = RepoConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, SdkError::Config(_)));
    }
}
