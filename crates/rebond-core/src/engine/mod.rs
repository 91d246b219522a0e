//! # Engine Module
//!
//! This module implements the bond reconstruction engine of rebond++.
//!
//! ## Overview
//!
//! Given a molecular system whose atoms carry positions and covalent radii, the engine
//! discards every existing bond and derives a fresh set of single bonds from geometry
//! alone. Candidate pairs come from hemisphere queries on a k-d tree, so each pair of
//! atoms is examined once and the pass stays close to linear in the number of atoms.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Bond tolerance, minimum bond distance and their builder
//! - **Decision Rule** ([`rule`]) - The pure distance test deciding whether two atoms bond
//! - **Rebonding** ([`rebond`]) - The [`rebond::RebondEngine`] orchestrating a full pass
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for long passes
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod error;
pub mod progress;
pub mod rebond;
pub mod rule;
