use std::path::Path;
use std::str::FromStr;

use ::config::{Config, Environment, File};
use serde::Deserialize;
use tracing::Level;

use crate::common::Quaternion;
use crate::error::ConfigError;
use crate::pipeline::classifier::default_reference_colors;
use crate::pipeline::{IdentifierConfig, Palette, ReferenceColor, WorkspaceBounds};

const ENV_PREFIX: &str = "CLUSTERS_IDENTIFIER";

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub listen_address: String,
    pub intake_buffer_size: usize,
    pub publish_buffer_size: usize,
    pub log_level: String,
    pub palette: Vec<ReferenceColor>,
    pub workspace: WorkspaceBounds,
    pub orientation: Quaternion,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:7878".to_string(),
            intake_buffer_size: 10,
            publish_buffer_size: 16,
            log_level: "info".to_string(),
            palette: default_reference_colors(),
            workspace: WorkspaceBounds::default(),
            orientation: Quaternion::IDENTITY,
        }
    }
}

impl Configuration {
    /// Defaults, then the optional file, then `CLUSTERS_IDENTIFIER__*`
    /// environment variables. Layering is per key, so a source may set a
    /// single field of a nested table.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(path, environment())
    }

    fn load_from(path: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let configuration = builder
            .add_source(environment)
            .build()?
            .try_deserialize::<Configuration>()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.intake_buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize("intake_buffer_size"));
        }
        if self.publish_buffer_size == 0 {
            return Err(ConfigError::InvalidBufferSize("publish_buffer_size"));
        }
        self.max_log_level()?;
        self.identifier_config().map(|_| ())
    }

    pub fn max_log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    pub fn identifier_config(&self) -> Result<IdentifierConfig, ConfigError> {
        IdentifierConfig::new(
            Palette::new(self.palette.clone())?,
            self.workspace,
            self.orientation,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::config::{FileFormat, Map};

    fn from_toml(toml: &str) -> Result<Configuration, ConfigError> {
        let configuration = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Configuration>()?;
        configuration.validate()?;
        Ok(configuration)
    }

    #[test]
    fn default_is_valid() {
        let configuration = Configuration::default();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.max_log_level().unwrap(), Level::INFO);

        let identifier = configuration.identifier_config().unwrap();
        assert_eq!(identifier.palette, Palette::default());
        assert_eq!(identifier.orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn file_overrides_defaults() {
        let configuration = from_toml(
            r#"
            log_level = "debug"

            [workspace]
            x_lo = 0.1
            x_up = 0.9
            y_left = 0.5
            y_right = -0.5

            [[palette]]
            name = "yellow"
            r = 255
            g = 255
            b = 0
            id = 7
            "#,
        )
        .unwrap();

        assert_eq!(configuration.intake_buffer_size, 10);
        assert_eq!(configuration.max_log_level().unwrap(), Level::DEBUG);
        assert_eq!(configuration.workspace.x_up, 0.9);
        assert_eq!(
            configuration.palette,
            vec![ReferenceColor::new("yellow", 255, 255, 0, 7)]
        );
    }

    #[test]
    fn empty_palette_is_fatal() {
        let mut configuration = Configuration::default();
        configuration.palette.clear();
        assert!(matches!(
            configuration.validate(),
            Err(ConfigError::EmptyPalette)
        ));
    }

    #[test]
    fn inverted_bounds_are_fatal() {
        let result = from_toml(
            r#"
            [workspace]
            x_lo = 0.75
            x_up = 0.20
            y_left = 0.10
            y_right = -0.40
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidBounds { .. })));
    }

    #[test]
    fn out_of_range_channel_fails_to_load() {
        let result = from_toml(
            r#"
            [[palette]]
            name = "bad"
            r = 300
            g = 0
            b = 0
            id = 1
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn rejects_unknown_log_level_and_zero_buffers() {
        let configuration = Configuration {
            log_level: "loud".to_string(),
            ..Configuration::default()
        };
        assert!(matches!(
            configuration.validate(),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        let configuration = Configuration {
            publish_buffer_size: 0,
            ..Configuration::default()
        };
        assert!(matches!(
            configuration.validate(),
            Err(ConfigError::InvalidBufferSize("publish_buffer_size"))
        ));
    }

    #[test]
    fn shipped_file_matches_defaults() {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"));
        assert_eq!(
            Configuration::load(Some(path)).unwrap(),
            Configuration::default()
        );
    }

    fn environment_with(vars: &[(&str, &str)]) -> Environment {
        let vars = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<Map<String, String>>();
        environment().source(Some(vars))
    }

    #[test]
    fn partial_workspace_table_keeps_other_defaults() {
        let configuration = from_toml(
            r#"
            [workspace]
            x_lo = 0.3

            [orientation]
            w = 0.5
            "#,
        )
        .unwrap();

        let defaults = WorkspaceBounds::default();
        assert_eq!(configuration.workspace.x_lo, 0.3);
        assert_eq!(configuration.workspace.x_up, defaults.x_up);
        assert_eq!(configuration.workspace.y_left, defaults.y_left);
        assert_eq!(configuration.workspace.y_right, defaults.y_right);
        assert_eq!(
            configuration.orientation,
            Quaternion {
                w: 0.5,
                ..Quaternion::IDENTITY
            }
        );
    }

    #[test]
    fn single_nested_environment_key_overrides_default() {
        let configuration = Configuration::load_from(
            None,
            environment_with(&[
                ("CLUSTERS_IDENTIFIER__WORKSPACE__X_LO", "0.3"),
                ("CLUSTERS_IDENTIFIER__PUBLISH_BUFFER_SIZE", "4"),
            ]),
        )
        .unwrap();

        assert_eq!(configuration.workspace.x_lo, 0.3);
        assert_eq!(configuration.workspace.x_up, WorkspaceBounds::default().x_up);
        assert_eq!(configuration.publish_buffer_size, 4);
        assert_eq!(configuration.palette, default_reference_colors());
    }

    #[test]
    fn environment_overrides_file() {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"));
        let configuration = Configuration::load_from(
            Some(path),
            environment_with(&[("CLUSTERS_IDENTIFIER__LOG_LEVEL", "debug")]),
        )
        .unwrap();
        assert_eq!(configuration.max_log_level().unwrap(), Level::DEBUG);
        assert_eq!(configuration.workspace, WorkspaceBounds::default());
    }

    #[test]
    fn invalid_environment_bounds_are_fatal() {
        let result = Configuration::load_from(
            None,
            environment_with(&[("CLUSTERS_IDENTIFIER__WORKSPACE__X_LO", "0.9")]),
        );
        assert!(matches!(result, Err(ConfigError::InvalidBounds { .. })));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let configuration = Configuration::load(None).unwrap();
        assert_eq!(configuration.palette, default_reference_colors());
    }
}
