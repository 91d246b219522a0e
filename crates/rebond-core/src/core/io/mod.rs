//! Provides input/output functionality for molecular file formats.
//!
//! XYZ and BGF files can be read and written through the [`traits::MolecularFile`]
//! trait. Gaussian logs are read only and may hold several geometries, so they
//! have their own frame-oriented reader in [`gaussian`].

pub mod bgf;
pub mod format;
pub mod gaussian;
pub mod traits;
pub mod xyz;
