//! Element symbols and covalent radii.
//!
//! Radii are single-bond covalent radii in Å (Cordero et al., 2008; low-spin
//! values for Mn, Fe and Co). They can be overridden per element from a TOML file:
//!
//! ```toml
//! [radii]
//! Si = 1.16
//! Fe = 1.52
//! ```

use crate::core::models::system::MolecularSystem;
use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

static ELEMENT_SYMBOLS: [&str; 86] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn",
];

static COVALENT_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 0.31, "He" => 0.28,
    "Li" => 1.28, "Be" => 0.96, "B" => 0.84, "C" => 0.76, "N" => 0.71, "O" => 0.66, "F" => 0.57, "Ne" => 0.58,
    "Na" => 1.66, "Mg" => 1.41, "Al" => 1.21, "Si" => 1.11, "P" => 1.07, "S" => 1.05, "Cl" => 1.02, "Ar" => 1.06,
    "K" => 2.03, "Ca" => 1.76, "Sc" => 1.70, "Ti" => 1.60, "V" => 1.53, "Cr" => 1.39, "Mn" => 1.39, "Fe" => 1.32,
    "Co" => 1.26, "Ni" => 1.24, "Cu" => 1.32, "Zn" => 1.22, "Ga" => 1.22, "Ge" => 1.20, "As" => 1.19, "Se" => 1.20,
    "Br" => 1.20, "Kr" => 1.16,
    "Rb" => 2.20, "Sr" => 1.95, "Y" => 1.90, "Zr" => 1.75, "Nb" => 1.64, "Mo" => 1.54, "Tc" => 1.47, "Ru" => 1.46,
    "Rh" => 1.42, "Pd" => 1.39, "Ag" => 1.45, "Cd" => 1.44, "In" => 1.42, "Sn" => 1.39, "Sb" => 1.39, "Te" => 1.38,
    "I" => 1.39, "Xe" => 1.40,
    "Cs" => 2.44, "Ba" => 2.15, "La" => 2.07, "Hf" => 1.75, "Ta" => 1.70, "W" => 1.62, "Re" => 1.51, "Os" => 1.44,
    "Ir" => 1.41, "Pt" => 1.36, "Au" => 1.36, "Hg" => 1.32, "Tl" => 1.45, "Pb" => 1.46, "Bi" => 1.48,
};

/// Returns the element symbol for an atomic number, if it is in the supported range (1-86).
pub fn element_from_atomic_number(atomic_number: u32) -> Option<&'static str> {
    let index = usize::try_from(atomic_number).ok()?.checked_sub(1)?;
    ELEMENT_SYMBOLS.get(index).copied()
}

/// Returns the canonical spelling of an element symbol, ignoring case.
pub fn normalize_symbol(symbol: &str) -> Option<&'static str> {
    let symbol = symbol.trim();
    ELEMENT_SYMBOLS
        .iter()
        .find(|s| s.eq_ignore_ascii_case(symbol))
        .copied()
}

/// Returns the tabulated covalent radius of an element, without overrides.
pub fn covalent_radius(symbol: &str) -> Option<f64> {
    normalize_symbol(symbol).and_then(|s| COVALENT_RADII.get(s).copied())
}

/// Guesses the element of an atom from its force field type or, failing that, its name.
///
/// Force field types follow the DREIDING convention where the element comes
/// before the first underscore (`C_3`, `H___A`, `Cl`, `Zn`). Names are read from
/// their alphabetic prefix after any leading digits (`1HB` is hydrogen). A
/// two-letter symbol is taken from a name only when its second letter is lower
/// case or the first letter alone is not an element, so `CA` stays carbon while
/// `Cl1` and `ZN` resolve to chlorine and zinc.
pub fn infer_element(name: &str, force_field_type: &str) -> Option<&'static str> {
    let ff_prefix: String = force_field_type
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect();
    if !ff_prefix.is_empty() {
        let found = normalize_symbol(&ff_prefix).or_else(|| normalize_symbol(&ff_prefix[..1]));
        if found.is_some() {
            return found;
        }
    }

    let letters: Vec<char> = name
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect();
    let first = letters.first()?;
    let single = normalize_symbol(&first.to_string());
    let double = letters
        .get(1)
        .and_then(|second| normalize_symbol(&format!("{first}{second}")));

    match letters.get(1) {
        Some(second) if second.is_ascii_lowercase() => double.or(single),
        _ => single.or(double),
    }
}

#[derive(Debug, Error)]
pub enum RadiiLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Invalid covalent radius for {element}: {value} (must be finite and positive)")]
    InvalidRadius { element: String, value: f64 },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RadiiFile {
    #[serde(default)]
    radii: HashMap<String, f64>,
}

/// The covalent radius table used for atom typing, with optional per-element overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CovalentRadii {
    overrides: HashMap<&'static str, f64>,
}

impl CovalentRadii {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads per-element overrides from a TOML file with a `[radii]` table.
    pub fn load(path: &Path) -> Result<Self, RadiiLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| RadiiLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: RadiiFile = toml::from_str(&content).map_err(|e| RadiiLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut radii = Self::new();
        for (symbol, radius) in file.radii {
            radii.set_override(&symbol, radius)?;
        }
        debug!(
            overrides = radii.overrides.len(),
            path = %path.display(),
            "Loaded covalent radius overrides."
        );
        Ok(radii)
    }

    /// Sets the radius used for one element, replacing the tabulated value.
    pub fn set_override(&mut self, symbol: &str, radius: f64) -> Result<(), RadiiLoadError> {
        let element = normalize_symbol(symbol)
            .ok_or_else(|| RadiiLoadError::UnknownElement(symbol.to_string()))?;
        if !radius.is_finite() || radius <= 0.0 {
            return Err(RadiiLoadError::InvalidRadius {
                element: element.to_string(),
                value: radius,
            });
        }
        self.overrides.insert(element, radius);
        Ok(())
    }

    pub fn is_overridden(&self, symbol: &str) -> bool {
        normalize_symbol(symbol).is_some_and(|s| self.overrides.contains_key(s))
    }

    /// Returns the effective radius for an element symbol.
    pub fn lookup(&self, symbol: &str) -> Option<f64> {
        let element = normalize_symbol(symbol)?;
        self.overrides
            .get(element)
            .or_else(|| COVALENT_RADII.get(element))
            .copied()
    }

    /// All elements with a known radius, in atomic number order.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        ELEMENT_SYMBOLS
            .iter()
            .filter_map(|&s| self.lookup(s).map(|r| (s, r)))
            .collect()
    }

    /// Fills in the covalent radius of every atom from its element.
    ///
    /// Atoms without an element symbol get one inferred from their force field
    /// type and name. Atoms that already carry a usable radius are left alone
    /// unless `overwrite` is set.
    ///
    /// # Return
    ///
    /// The number of atoms that still lack a usable radius afterwards.
    pub fn assign(&self, system: &mut MolecularSystem, overwrite: bool) -> usize {
        let mut untyped = 0;
        for (_, atom) in system.atoms_iter_mut() {
            if !overwrite && atom.usable_covalent_radius().is_some() {
                continue;
            }
            if normalize_symbol(&atom.element).is_none() {
                if let Some(element) = infer_element(&atom.name, &atom.force_field_type) {
                    atom.element = element.to_string();
                }
            }
            match self.lookup(&atom.element) {
                Some(radius) => atom.covalent_radius = Some(radius),
                None if atom.usable_covalent_radius().is_some() => {}
                None => {
                    warn!(
                        serial = atom.serial,
                        name = %atom.name,
                        element = %atom.element,
                        "No covalent radius for atom."
                    );
                    untyped += 1;
                }
            }
        }
        untyped
    }
}
