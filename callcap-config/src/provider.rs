//! Configuration provider trait for loading callcap configuration from various sources.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};

use crate::{CallcapConfig, ConfigError};

/// Trait for loading callcap configuration from different sources.
pub trait ConfigProvider {
    /// Loads the configuration and returns a Figment instance.
    fn load(&self) -> Result<Figment, ConfigError>;
}

/// Defaults, then YAML files, then `CALLCAP_*` environment variables.
///
/// Hierarchy:
/// 1. Default values
/// 2. `config/callcap.yaml`, or the explicit file if one was given
/// 3. `config/<CALLCAP_ENV>.yaml` when no explicit file was given
/// 4. `CALLCAP_*` environment variables, `__` separating nested keys
#[derive(Debug, Default, Clone)]
pub struct LayeredProvider {
    file: Option<PathBuf>,
}

impl LayeredProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit configuration file. It must exist.
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: Some(path.as_ref().to_path_buf()),
        }
    }
}

impl ConfigProvider for LayeredProvider {
    fn load(&self) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(CallcapConfig::default()));

        match &self.file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.clone()));
                }
                figment = figment.merge(Yaml::file(path));
            }
            None => {
                let base = Path::new("config/callcap.yaml");
                if base.exists() {
                    figment = figment.merge(Yaml::file(base));
                }

                if let Ok(env) = std::env::var("CALLCAP_ENV") {
                    let env_file = format!("config/{}.yaml", env);
                    if Path::new(&env_file).exists() {
                        figment = figment.merge(Yaml::file(env_file));
                    }
                }
            }
        }

        Ok(figment.merge(Env::prefixed("CALLCAP_").ignore(&["env"]).split("__")))
    }
}
