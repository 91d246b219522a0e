//! # Core Models Module
//!
//! This module contains the data structures used to represent a molecular system
//! whose connectivity is to be reconstructed from geometry.
//!
//! ## Overview
//!
//! The model is deliberately flat: a [`system::MolecularSystem`] owns its atoms
//! (keyed by stable [`ids::AtomId`] handles) and a list of bonds with a cached
//! adjacency map. Residue and chain labels are carried on each atom only so that
//! file formats which use them can be written back unchanged.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom representation with coordinates, element and covalent radius
//! - [`topology`] - Bonds and bond orders
//! - [`system`] - The container that owns atoms and bonds
//! - [`ids`] - Stable identifier type for atoms
//!
//! ## Usage
//!
//! ```ignore
//! use rebondpp::core::models::{atom::Atom, system::MolecularSystem};
//!
//! let mut system = MolecularSystem::new();
//! let mut atom = Atom::new(1, "O1", "O", Point3::new(0.0, 0.0, 0.0));
//! atom.covalent_radius = Some(0.66);
//! let id = system.add_atom(atom);
//! ```

pub mod atom;
pub mod ids;
pub mod system;
pub mod topology;
