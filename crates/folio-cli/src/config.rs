use std::io::ErrorKind;
use std::path::Path;
use std::{env, fs};

use folio_common::ApiConfig;
use folio_editor_core::EditorSettings;
use miette::miette;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub editor: EditorSettings,
}

impl Config {
    /// Read the config file. A missing file means all defaults.
    pub fn load(config_file: &Path) -> miette::Result<Config> {
        let config_string = match fs::read_to_string(config_file) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %config_file.display(), "no config file, using defaults");
                return Ok(Config::default().resolved());
            }
            Err(e) => {
                return Err(miette!(
                    "error reading config file {}: {}",
                    config_file.display(),
                    e
                ));
            }
        };
        Self::parse(&config_string, env::vars())
    }

    /// Parse config text, substituting `$VAR` references from `vars`.
    pub fn parse(
        config_string: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> miette::Result<Config> {
        let mut vars: Vec<(String, String)> = vars.into_iter().collect();
        // Longest names first so `$FOO` doesn't eat the front of `$FOO_BAR`.
        vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        let mut config_string = config_string.to_owned();
        for (k, v) in vars {
            config_string = config_string.replace(&format!("${}", k), &v);
        }

        let config: Config = toml::from_str(&config_string)
            .map_err(|e| miette!("error parsing config file {}", e))?;
        Ok(config.resolved())
    }

    fn resolved(mut self) -> Self {
        // An unset `$VAR` survives substitution verbatim.
        if self
            .api
            .token
            .as_deref()
            .is_some_and(|t| t.is_empty() || t.starts_with('$'))
        {
            self.api.token = None;
        }
        if self.editor.asset_base_url.is_empty() {
            self.editor.asset_base_url = self.api.asset_base_url.clone();
        }
        self
    }
}
