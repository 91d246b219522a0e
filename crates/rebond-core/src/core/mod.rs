//! # Core Module
//!
//! This module provides the fundamental building blocks of rebond++: the molecular
//! data model, the element tables used to type atoms, the spatial index that makes
//! neighbor search fast, and readers/writers for the supported file formats.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds and the molecular system container
//! - **Element Data** ([`elements`]) - Element symbols, covalent radii and atom typing
//! - **Spatial Search** ([`spatial`]) - A k-d tree with radius and hemisphere queries
//! - **File I/O** ([`io`]) - XYZ, BGF and Gaussian log files behind a common trait

pub mod elements;
pub mod io;
pub mod models;
pub mod spatial;
