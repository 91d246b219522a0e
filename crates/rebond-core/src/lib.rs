//! # rebond++ Core Library
//!
//! Reconstructs the covalent bonds of a molecular structure from nothing but atomic
//! positions and covalent radii.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** The molecular data model (`MolecularSystem`), element
//!   tables, the k-d tree spatial index with its hemisphere queries, and file I/O.
//!
//! - **[`engine`]: The Logic Core.** The bond decision rule and the `RebondEngine`, which
//!   builds a spatial index once per call and visits each candidate atom pair exactly once.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as "type the atoms, then
//!   rebond", with progress reporting and batch processing.

pub mod core;
pub mod engine;
pub mod workflows;
