use rebondpp::engine::config::{DEFAULT_BOND_TOLERANCE, DEFAULT_MIN_BOND_DISTANCE};

/// Values used for settings given neither in the config file nor on the command line.
pub struct DefaultsConfig {
    pub tolerance: f64,
    pub min_distance: f64,
    pub overwrite_radii: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_BOND_TOLERANCE,
            min_distance: DEFAULT_MIN_BOND_DISTANCE,
            overwrite_radii: false,
        }
    }
}
