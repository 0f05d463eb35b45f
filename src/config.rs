use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::DeskError;

/// Process configuration, read from `SCHOOLDESK_*` environment variables on top of defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub loglevel: String,
    pub busy_timeout_secs: u64,
    /// Open transactions with `BEGIN IMMEDIATE` so writers queue on the busy timeout
    /// instead of failing on lock upgrade.
    pub begin_immediate: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://schooldesk.db".to_string(),
            loglevel: "info".to_string(),
            busy_timeout_secs: 5,
            begin_immediate: true,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("SCHOOLDESK_"))
    }

    pub fn load() -> Result<Self, DeskError> {
        Ok(Self::figment().extract()?)
    }
}

pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| panic!("FATAL: invalid schooldesk configuration: {e}"))
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SCHOOLDESK_DATABASE_URL", "sqlite://other.db");
            jail.set_env("SCHOOLDESK_BEGIN_IMMEDIATE", "false");

            let cfg: Config = Config::figment().extract()?;
            assert_eq!(cfg.database_url, "sqlite://other.db");
            assert!(!cfg.begin_immediate);
            assert_eq!(cfg.busy_timeout_secs, 5);
            assert!(cfg.admin_username.is_none());
            Ok(())
        });
    }
}
