//! Engine construction from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use kyc_engine::{Engine, EngineConfig, JsonFileGateway, LogDispatcher, LogReviewQueue};

/// Apply command-line overrides on top of the environment configuration.
pub fn resolve_config(
    mut config: EngineConfig,
    data_dir: Option<PathBuf>,
    policy: Option<PathBuf>,
) -> EngineConfig {
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if policy.is_some() {
        config.policy_path = policy;
    }
    config
}

/// Build an engine over the configured JSON-file store.
pub fn build_engine(config: &EngineConfig) -> Result<Engine> {
    let policy = config.load_policy().context("failed to load tier policy")?;
    let gateway = JsonFileGateway::open(config.data_dir.clone()).with_context(|| {
        format!("failed to open data directory {}", config.data_dir.display())
    })?;
    tracing::debug!(
        data_dir = %config.data_dir.display(),
        tiers = policy.max_tier().get(),
        "engine ready"
    );
    Ok(Engine::new(
        policy,
        Arc::new(gateway),
        Arc::new(LogDispatcher),
        Arc::new(LogReviewQueue),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_environment_values() {
        let config = resolve_config(
            EngineConfig::default(),
            Some(PathBuf::from("/tmp/kyc")),
            None,
        );
        assert_eq!(config.data_dir, PathBuf::from("/tmp/kyc"));
        assert!(config.policy_path.is_none());
    }

    #[test]
    fn engine_builds_over_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = resolve_config(EngineConfig::default(), Some(dir.path().join("data")), None);
        let engine = build_engine(&config).unwrap();
        assert_eq!(engine.policy().max_tier().get(), 3);
        assert!(dir.path().join("data").is_dir());
    }
}
