//! Configuration loader implementations.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::schema::HostConfig;

/// Environment variable that replaces the configured sandbox root.
pub const SANDBOX_ROOT_ENV: &str = "SCRIPT_HOST_SANDBOX_ROOT";

/// Parses and validates a JSON configuration document.
///
/// # Errors
///
/// Fails when the document is not valid JSON, does not match the schema, or
/// fails [`HostConfig::validate`].
pub fn from_json_str(document: &str) -> Result<HostConfig> {
    let config: HostConfig =
        serde_json::from_str(document).context("failed to parse host configuration")?;
    config.validate().context("invalid host configuration")?;
    Ok(config)
}

/// Reads a configuration file and applies environment overrides.
///
/// # Errors
///
/// Fails when the file cannot be read or its contents are rejected by
/// [`from_json_str`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<HostConfig> {
    let path = path.as_ref();
    let document = fs::read_to_string(path)
        .with_context(|| format!("failed to read host configuration `{}`", path.display()))?;
    let mut config = from_json_str(&document)
        .with_context(|| format!("in host configuration `{}`", path.display()))?;
    apply_env_overrides(&mut config);

    info!(
        path = %path.display(),
        sandbox_root = %config.sandbox_root.display(),
        context = %config.policy.context,
        "host configuration loaded"
    );
    Ok(config)
}

/// Applies overrides from the process environment.
pub fn apply_env_overrides(config: &mut HostConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

/// Applies overrides read through `lookup`.
pub fn apply_overrides<F>(config: &mut HostConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup(SANDBOX_ROOT_ENV) {
        debug!(env = SANDBOX_ROOT_ENV, sandbox_root = %root, "sandbox root overridden");
        config.sandbox_root = PathBuf::from(root);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn loads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sandbox_root": "/srv/scripts", "policy": {{"allow": ["fs.*"]}}}}"#
        )
        .unwrap();

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.policy.allow, ["fs.*"]);
    }

    #[test]
    fn read_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("host.json");
        let err = load_from_path(&missing).expect_err("missing file");
        assert!(err.to_string().contains("host.json"), "{err:#}");
    }

    #[test]
    fn parse_errors_carry_context() {
        let err = from_json_str("{not json").expect_err("bad json");
        assert_eq!(err.to_string(), "failed to parse host configuration");

        let err = from_json_str(r#"{"policy": {"deny": [""]}}"#).expect_err("empty rule");
        assert!(format!("{err:#}").contains("deny rule #0 is empty"));
    }

    #[test]
    fn override_replaces_sandbox_root() {
        let mut config = from_json_str(r#"{"sandbox_root": "/data"}"#).unwrap();
        apply_overrides(&mut config, |key| {
            (key == SANDBOX_ROOT_ENV).then(|| "/override".to_owned())
        });
        assert_eq!(config.sandbox_root, PathBuf::from("/override"));

        apply_overrides(&mut config, |_| None);
        assert_eq!(config.sandbox_root, PathBuf::from("/override"));
    }
}
