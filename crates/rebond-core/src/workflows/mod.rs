//! # Workflows Module
//!
//! High-level entry points that tie the [`crate::core`] data model and the
//! [`crate::engine`] together.
//!
//! - **Rebonding Workflow** ([`rebond`]) - Assigns covalent radii from the element
//!   table, then reconstructs every bond of a system. A batch variant processes
//!   independent systems, in parallel with the `parallel` feature.

pub mod rebond;
