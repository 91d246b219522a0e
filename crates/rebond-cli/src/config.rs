mod defaults;

use crate::cli::BondArgs;
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use rebondpp::core::elements::CovalentRadii;
use rebondpp::engine::config::{RebondConfigBuilder, WorkflowConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialBondingConfig {
    tolerance: Option<f64>,
    min_distance: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PartialRadiiConfig {
    overrides_path: Option<PathBuf>,
    overwrite: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialRebondConfig {
    bonding: Option<PartialBondingConfig>,
    radii: Option<PartialRadiiConfig>,
}

impl PartialRebondConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        // Paths written in the file are relative to the file itself.
        if let Some(overrides) = config
            .radii
            .as_mut()
            .and_then(|r| r.overrides_path.as_mut())
            .filter(|p| p.is_relative())
        {
            *overrides = path.parent().unwrap_or(Path::new("")).join(&*overrides);
        }
        Ok(config)
    }

    /// Combines file values, `--set` values, command-line flags and defaults,
    /// in increasing order of precedence for everything but the defaults.
    pub fn merge_with_cli(mut self, args: &BondArgs) -> Result<WorkflowConfig> {
        self.apply_set_values(&args.set_values)?;

        let defaults = DefaultsConfig::default();
        let bonding = self.bonding.take().unwrap_or_default();
        let radii_config = self.radii.take().unwrap_or_default();

        let rebond = RebondConfigBuilder::new()
            .bond_tolerance(
                args.tolerance
                    .or(bonding.tolerance)
                    .unwrap_or(defaults.tolerance),
            )
            .min_bond_distance(
                args.min_distance
                    .or(bonding.min_distance)
                    .unwrap_or(defaults.min_distance),
            )
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        let overrides_path = args.radii.clone().or(radii_config.overrides_path);
        let radii = match overrides_path {
            Some(path) => {
                debug!("Loading covalent radius overrides from {:?}", path);
                CovalentRadii::load(&path).map_err(|e| CliError::FileParsing {
                    path: path.clone(),
                    source: e.into(),
                })?
            }
            None => CovalentRadii::default(),
        };

        let overwrite_radii = args.overwrite_radii
            || radii_config
                .overwrite
                .unwrap_or(defaults.overwrite_radii);

        Ok(WorkflowConfig {
            rebond,
            radii,
            overwrite_radii,
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value_str) = (key.trim(), value_str.trim());

            match key {
                "bonding.tolerance" => {
                    self.bonding
                        .get_or_insert_with(Default::default)
                        .tolerance = Some(parse_value(key, value_str)?);
                }
                "bonding.min-distance" => {
                    self.bonding
                        .get_or_insert_with(Default::default)
                        .min_distance = Some(parse_value(key, value_str)?);
                }
                "radii.overrides-path" => {
                    self.radii
                        .get_or_insert_with(Default::default)
                        .overrides_path = Some(PathBuf::from(value_str));
                }
                "radii.overwrite" => {
                    self.radii.get_or_insert_with(Default::default).overwrite =
                        Some(parse_value(key, value_str)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value_str: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value_str
        ))
    })
}
