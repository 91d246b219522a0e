use crate::core::models::system::MolecularSystem;
use crate::engine::config::WorkflowConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::rebond::{RebondEngine, RebondSummary};
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct RebondReport {
    /// Atoms that had no radius in the table and no usable radius of their own.
    pub untyped_atoms: usize,
    pub summary: RebondSummary,
}

/// Types the atoms of `system` and reconstructs its bonds.
///
/// Covalent radii are filled in from `config.radii` first (replacing existing
/// ones when `config.overwrite_radii` is set), then every bond of the system is
/// replaced by those derived from geometry.
#[instrument(skip_all, name = "rebond_workflow")]
pub fn run(
    system: &mut MolecularSystem,
    config: &WorkflowConfig,
    reporter: &ProgressReporter,
) -> Result<RebondReport, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Assigning covalent radii",
    });
    let untyped_atoms = config.radii.assign(system, config.overwrite_radii);
    if untyped_atoms > 0 {
        warn!(untyped_atoms, "Some atoms could not be assigned a covalent radius.");
        reporter.report(Progress::Message(format!(
            "{} atom(s) have no covalent radius",
            untyped_atoms
        )));
    }
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Rebonding" });
    let engine = RebondEngine::new(config.rebond);
    let summary = engine.rebond_with_reporter(system, reporter)?;
    reporter.report(Progress::Message(format!(
        "{} bonds among {} atoms",
        summary.bonds, summary.atoms
    )));
    reporter.report(Progress::PhaseFinish);

    info!(
        atoms = summary.atoms,
        bonds = summary.bonds,
        "Rebonding workflow finished."
    );
    Ok(RebondReport {
        untyped_atoms,
        summary,
    })
}

/// Rebonds independent systems, in parallel when the `parallel` feature is enabled.
///
/// Results are returned in the order of `systems`.
#[instrument(skip_all, name = "rebond_batch", fields(systems = systems.len()))]
pub fn run_batch(
    systems: &mut [MolecularSystem],
    config: &WorkflowConfig,
) -> Vec<Result<RebondReport, EngineError>> {
    #[cfg(not(feature = "parallel"))]
    let iterator = systems.iter_mut();

    #[cfg(feature = "parallel")]
    let iterator = systems.par_iter_mut();

    iterator
        .map(|system| run(system, config, &ProgressReporter::new()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::elements::CovalentRadii;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;
    use std::sync::Mutex;

    fn methane() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        system.add_atom(Atom::new(1, "C1", "C", Point3::new(0.0, 0.0, 0.0)));
        for (i, p) in [
            [0.629, 0.629, 0.629],
            [-0.629, -0.629, 0.629],
            [-0.629, 0.629, -0.629],
            [0.629, -0.629, -0.629],
        ]
        .iter()
        .enumerate()
        {
            system.add_atom(Atom::new(i + 2, &format!("H{}", i + 1), "", Point3::from(*p)));
        }
        system
    }

    #[test]
    fn run_types_atoms_then_rebonds() {
        let mut system = methane();
        let report = run(
            &mut system,
            &WorkflowConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(report.untyped_atoms, 0);
        assert_eq!(report.summary.bonds, 4);
        assert_eq!(report.summary.max_covalent_radius, 0.76);
        let carbon = system.find_atom_by_serial(1).unwrap();
        assert_eq!(system.get_bonded_neighbors(carbon).unwrap().len(), 4);
    }

    #[test]
    fn run_reports_phases_in_order() {
        let phases = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|p| {
            if let Progress::PhaseStart { name } = p {
                phases.lock().unwrap().push(name);
            }
        }));
        let mut system = methane();
        run(&mut system, &WorkflowConfig::default(), &reporter).unwrap();
        drop(reporter);
        assert_eq!(
            phases.into_inner().unwrap(),
            vec!["Assigning covalent radii", "Rebonding"]
        );
    }

    #[test]
    fn run_reports_messages_for_untyped_atoms_and_bond_count() {
        let messages = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|p| {
            if let Progress::Message(msg) = p {
                messages.lock().unwrap().push(msg);
            }
        }));

        let mut system = methane();
        run(&mut system, &WorkflowConfig::default(), &reporter).unwrap();
        system.add_atom(Atom::new(6, "Q", "", Point3::new(5.0, 5.0, 5.0)));
        assert!(run(&mut system, &WorkflowConfig::default(), &reporter).is_err());
        drop(reporter);

        assert_eq!(
            messages.into_inner().unwrap(),
            vec![
                "4 bonds among 5 atoms".to_string(),
                "1 atom(s) have no covalent radius".to_string(),
            ]
        );
    }

    #[test]
    fn run_fails_when_an_atom_cannot_be_typed() {
        let mut system = methane();
        system.add_atom(Atom::new(6, "Q", "", Point3::new(5.0, 5.0, 5.0)));
        let err = run(
            &mut system,
            &WorkflowConfig::default(),
            &ProgressReporter::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MissingCovalentRadius { serial: 6, .. }));
        assert!(system.bonds().is_empty());
    }

    #[test]
    fn overrides_and_overwrite_are_honoured() {
        let mut radii = CovalentRadii::new();
        radii.set_override("H", 0.01).unwrap();
        radii.set_override("C", 0.01).unwrap();
        let mut config = WorkflowConfig {
            radii,
            ..Default::default()
        };
        config.rebond.bond_tolerance = 0.1;

        let mut system = methane();
        let report = run(&mut system, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(report.summary.bonds, 0);

        // Existing radii survive unless overwriting is requested.
        let mut preset = methane();
        for (_, atom) in preset.atoms_iter_mut() {
            atom.covalent_radius = Some(0.8);
        }
        let report = run(&mut preset, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(report.summary.bonds, 4);

        config.overwrite_radii = true;
        let report = run(&mut preset, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(report.summary.bonds, 0);
    }

    #[test]
    fn run_batch_keeps_input_order() {
        let mut broken = methane();
        broken.add_atom(Atom::new(6, "Q", "", Point3::new(5.0, 5.0, 5.0)));
        let mut systems = vec![methane(), broken, methane()];

        let results = run_batch(&mut systems, &WorkflowConfig::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().summary.bonds, 4);
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().summary.bonds, 4);
        assert_eq!(systems[2].bonds().len(), 4);
    }
}
