use nalgebra::Point3;

/// Residue name used when a format carries no residue information.
pub const DEFAULT_RESIDUE_NAME: &str = "MOL";

/// Represents an atom in a molecular structure with the properties needed for rebonding.
///
/// Besides its position, an atom carries the covalent radius used by the bond
/// decision rule. The radius is optional because most input formats do not
/// provide it; it is filled in by an atom-typing step (see
/// [`crate::core::elements::CovalentRadii`]) before rebonding.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The serial number of the atom as found in (or written to) a file.
    pub serial: usize,
    /// The name of the atom (e.g., "C1", "CA", "O").
    pub name: String,
    /// The element symbol (e.g., "C", "Cl"). May be empty if unknown.
    pub element: String,
    /// The name of the residue this atom belongs to.
    pub residue_name: String,
    /// The residue sequence number.
    pub residue_number: isize,
    /// The single-character chain identifier.
    pub chain_id: char,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The force field atom type (e.g., "C_3", "N_R").
    pub force_field_type: String,
    /// The partial atomic charge in elementary charge units.
    pub partial_charge: f64,
    /// The covalent radius in Angstroms, if it has been assigned.
    pub covalent_radius: Option<f64>,
}

impl Atom {
    /// Creates a new `Atom` with default values for most fields.
    ///
    /// The atom is placed in residue 1 of chain `A` with the residue name
    /// [`DEFAULT_RESIDUE_NAME`], and has no covalent radius.
    ///
    /// # Arguments
    ///
    /// * `serial` - The serial number of the atom.
    /// * `name` - The name of the atom.
    /// * `element` - The element symbol.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(serial: usize, name: &str, element: &str, position: Point3<f64>) -> Self {
        Self {
            serial,
            name: name.to_string(),
            element: element.to_string(),
            residue_name: DEFAULT_RESIDUE_NAME.to_string(),
            residue_number: 1,
            chain_id: 'A',
            position,
            force_field_type: String::new(),
            partial_charge: 0.0,
            covalent_radius: None,
        }
    }

    /// Returns the covalent radius if it is set to a finite, positive value.
    ///
    /// A radius of zero is treated the same as a missing one.
    pub fn usable_covalent_radius(&self) -> Option<f64> {
        self.covalent_radius.filter(|r| r.is_finite() && *r > 0.0)
    }

    /// Builder-style setter for the covalent radius.
    pub fn with_covalent_radius(mut self, radius: f64) -> Self {
        self.covalent_radius = Some(radius);
        self
    }
}
