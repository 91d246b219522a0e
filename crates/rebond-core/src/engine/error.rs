use thiserror::Error;

use super::config::ConfigError;
use crate::core::spatial::SpatialIndexError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Atom {serial} ('{name}') does not have a covalent radius defined")]
    MissingCovalentRadius { serial: usize, name: String },

    #[error("Atom {serial} ('{name}') has invalid coordinates: {source}")]
    InvalidCoordinates {
        serial: usize,
        name: String,
        #[source]
        source: SpatialIndexError,
    },

    #[error("Spatial index error: {0}")]
    SpatialIndex(#[from] SpatialIndexError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
