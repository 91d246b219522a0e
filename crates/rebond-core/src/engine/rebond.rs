use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrder;
use crate::core::spatial::{SpatialIndex, SpatialIndexError};
use crate::engine::config::RebondConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::rule::is_bonded;
use nalgebra::Point3;
use tracing::{debug, info, instrument, trace};

/// Axis the hemisphere queries are split along.
const HEMISPHERE_AXIS: usize = 0;

#[derive(Debug, Clone, Copy)]
struct AtomRecord {
    id: AtomId,
    radius: f64,
    position: Point3<f64>,
}

/// Outcome of a single rebonding pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RebondSummary {
    /// Number of atoms considered.
    pub atoms: usize,
    /// Number of bonds the system holds afterwards.
    pub bonds: usize,
    /// Number of candidate pairs returned by the neighbor queries.
    pub candidates: usize,
    /// Largest covalent radius among the atoms, in Å.
    pub max_covalent_radius: f64,
}

/// Reconstructs single bonds from atom positions and covalent radii.
///
/// The engine only holds its configuration; every call builds its own spatial
/// index, so one engine may be shared between threads rebonding distinct systems.
#[derive(Debug, Clone, Default)]
pub struct RebondEngine {
    config: RebondConfig,
}

impl RebondEngine {
    pub fn new(config: RebondConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RebondConfig {
        &self.config
    }

    /// Replaces all bonds of `system` with those implied by atomic geometry.
    ///
    /// Two atoms are bonded when their distance lies between the configured
    /// minimum bond distance and the sum of their covalent radii plus the bond
    /// tolerance. Every new bond is a single bond.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingCovalentRadius`] if any atom lacks a usable
    /// radius, and [`EngineError::InvalidCoordinates`] if any atom has a
    /// non-finite position. In both cases the system is left without bonds.
    pub fn rebond(&self, system: &mut MolecularSystem) -> Result<RebondSummary, EngineError> {
        self.rebond_with_reporter(system, &ProgressReporter::new())
    }

    /// Same as [`RebondEngine::rebond`], reporting one task step per atom.
    #[instrument(skip_all, name = "rebond_engine", fields(atoms = system.atom_count()))]
    pub fn rebond_with_reporter(
        &self,
        system: &mut MolecularSystem,
        reporter: &ProgressReporter,
    ) -> Result<RebondSummary, EngineError> {
        system.clear_bonds();

        let records = collect_records(system)?;
        let max_covalent_radius = records.iter().map(|r| r.radius).fold(0.0, f64::max);
        debug!(max_covalent_radius, "Collected atom records.");

        let index = SpatialIndex::from_items(records.iter().copied(), |r| r.position)?;
        debug!(depth = index.depth(), "Spatial index built.");

        reporter.report(Progress::TaskStart {
            total_steps: records.len() as u64,
        });

        let tolerance = self.config.bond_tolerance;
        let min_distance = self.config.min_bond_distance;
        let mut candidates = 0;

        for (entry, a) in records.iter().enumerate() {
            let search_radius = a.radius + max_covalent_radius + tolerance;
            for neighbor in index.neighbors_of(entry, search_radius, HEMISPHERE_AXIS)? {
                candidates += 1;
                let b = neighbor.payload();
                if b.id == a.id || system.has_bond(a.id, b.id) {
                    continue;
                }
                if is_bonded(
                    a.radius,
                    b.radius,
                    tolerance,
                    min_distance,
                    neighbor.distance_squared(),
                ) {
                    trace!(distance = neighbor.distance(), "Bond accepted.");
                    system.add_bond(a.id, b.id, BondOrder::Single);
                }
            }
            reporter.report(Progress::TaskIncrement);
        }

        reporter.report(Progress::TaskFinish);

        let summary = RebondSummary {
            atoms: records.len(),
            bonds: system.bonds().len(),
            candidates,
            max_covalent_radius,
        };
        info!(
            bonds = summary.bonds,
            candidates = summary.candidates,
            "Rebonding complete."
        );
        Ok(summary)
    }
}

fn collect_records(system: &MolecularSystem) -> Result<Vec<AtomRecord>, EngineError> {
    system
        .atoms_iter()
        .map(|(id, atom)| {
            let radius =
                atom.usable_covalent_radius()
                    .ok_or_else(|| EngineError::MissingCovalentRadius {
                        serial: atom.serial,
                        name: atom.name.clone(),
                    })?;
            if let Some(axis) = atom.position.coords.iter().position(|c| !c.is_finite()) {
                return Err(EngineError::InvalidCoordinates {
                    serial: atom.serial,
                    name: atom.name.clone(),
                    source: SpatialIndexError::NonFiniteCoordinate {
                        axis,
                        value: atom.position[axis],
                    },
                });
            }
            Ok(AtomRecord {
                id,
                radius,
                position: atom.position,
            })
        })
        .collect()
}
