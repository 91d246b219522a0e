use crate::core::elements::element_from_atomic_number;
use crate::core::models::atom::Atom;
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const ORIENTATION_MARKER: &str = "Standard orientation:";
const ENERGY_MARKER: &str = "SCF Done:";
const ARCHIVE_MARKER: &str = "GINC";
/// Lines between the orientation marker and the first atom row (rule, two headings, rule).
const ORIENTATION_HEADER_LINES: usize = 4;

#[derive(Debug, Error)]
pub enum GaussianError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("No 'Standard orientation:' block found in the log")]
    NoGeometry,
    #[error("Frame {requested} requested but the log contains {available} frames")]
    FrameOutOfRange { requested: usize, available: usize },
}

/// One geometry reported by Gaussian, with the energy line that followed it.
#[derive(Debug, Clone)]
pub struct GaussianFrame {
    pub system: MolecularSystem,
    /// The trimmed `SCF Done:` line reported for this geometry, if any.
    pub energy_remark: Option<String>,
}

/// The geometries found in a Gaussian log.
#[derive(Debug, Clone)]
pub struct GaussianLog {
    pub frames: Vec<GaussianFrame>,
    /// Method and basis set from the archive entry, e.g. `RHF/3-21G`.
    pub level_of_theory: Option<String>,
}

impl GaussianLog {
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, GaussianError> {
        let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));
        let mut frames: Vec<GaussianFrame> = Vec::new();
        let mut level_of_theory = None;

        while let Some((line_num, line)) = lines.next() {
            let line = line?;
            if line.contains(ORIENTATION_MARKER) {
                for _ in 0..ORIENTATION_HEADER_LINES {
                    if let Some((_, header)) = lines.next() {
                        header?;
                    }
                }
                let system = read_orientation_block(&mut lines)?;
                debug!(line = line_num, atoms = system.atom_count(), "Read geometry frame.");
                frames.push(GaussianFrame {
                    system,
                    energy_remark: None,
                });
            } else if line.contains(ENERGY_MARKER) {
                if let Some(frame) = frames.last_mut() {
                    frame.energy_remark = Some(line.trim().to_string());
                }
            } else if line.contains(ARCHIVE_MARKER) && !frames.is_empty() {
                level_of_theory = parse_level_of_theory(&line).or(level_of_theory);
            }
        }

        if frames.is_empty() {
            return Err(GaussianError::NoGeometry);
        }
        Ok(Self {
            frames,
            level_of_theory,
        })
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, GaussianError> {
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }

    /// Returns frame `index`, or the last (usually optimized) frame when `index` is `None`.
    pub fn frame(&self, index: Option<usize>) -> Result<&GaussianFrame, GaussianError> {
        let available = self.frames.len();
        let requested = index.unwrap_or(available.saturating_sub(1));
        self.frames
            .get(requested)
            .ok_or(GaussianError::FrameOutOfRange {
                requested,
                available,
            })
    }

    /// Consumes the log and returns the chosen frame's system.
    pub fn into_frame(mut self, index: Option<usize>) -> Result<GaussianFrame, GaussianError> {
        self.frame(index)?;
        let requested = index.unwrap_or(self.frames.len() - 1);
        Ok(self.frames.swap_remove(requested))
    }
}

/// Reads atom rows (`center atomic-number [type] x y z`) up to the closing rule.
fn read_orientation_block(
    lines: &mut impl Iterator<Item = (usize, io::Result<String>)>,
) -> Result<MolecularSystem, GaussianError> {
    let mut system = MolecularSystem::new();
    let mut serial = 0;

    for (line_num, line) in lines {
        let line = line?;
        if line.contains("-----") {
            break;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(GaussianError::Parse {
                line: line_num,
                reason: format!("expected at least 5 columns, found {}", fields.len()),
            });
        }

        let atomic_number: u32 = fields[1].parse().map_err(|_| GaussianError::Parse {
            line: line_num,
            reason: format!("invalid atomic number '{}'", fields[1]),
        })?;
        // Dummy atoms.
        if atomic_number == 0 {
            continue;
        }
        let element =
            element_from_atomic_number(atomic_number).ok_or_else(|| GaussianError::Parse {
                line: line_num,
                reason: format!("unsupported atomic number {atomic_number}"),
            })?;

        let mut coords = [0.0; 3];
        for (k, field) in fields[fields.len() - 3..].iter().enumerate() {
            coords[k] = field.parse().map_err(|_| GaussianError::Parse {
                line: line_num,
                reason: format!("invalid coordinate '{field}'"),
            })?;
        }

        serial += 1;
        system.add_atom(Atom::new(
            serial,
            &format!("{element}{serial}"),
            element,
            Point3::from(coords),
        ));
    }

    Ok(system)
}

/// Extracts `method/basis` from a `1\1\GINC-HOST\FOpt\RHF\3-21G\...` archive line.
fn parse_level_of_theory(line: &str) -> Option<String> {
    let fields: Vec<&str> = line.trim().split('\\').filter(|f| !f.is_empty()).collect();
    if fields.len() < 6 {
        return None;
    }
    Some(format!("{}/{}", fields[4], fields[5]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LOG: &str = r" Entering Gaussian System
                         Standard orientation:
 ---------------------------------------------------------------------
 Center     Atomic     Atomic              Coordinates (Angstroms)
 Number     Number      Type              X           Y           Z
 ---------------------------------------------------------------------
    1          8             0        0.000000    0.000000    0.119262
    2          1             0        0.000000    0.763239   -0.477047
    3          0             0        0.000000    0.000000    1.000000
    4          1             0        0.000000   -0.763239   -0.477047
 ---------------------------------------------------------------------
 SCF Done:  E(RHF) =  -75.5859574     A.U. after    5 cycles
                         Standard orientation:
 ---------------------------------------------------------------------
 Center     Atomic     Atomic              Coordinates (Angstroms)
 Number     Number      Type              X           Y           Z
 ---------------------------------------------------------------------
    1          8             0        0.000000    0.000000    0.110000
    2          1             0        0.000000    0.780000   -0.470000
    3          1             0        0.000000   -0.780000   -0.470000
 ---------------------------------------------------------------------
 SCF Done:  E(RHF) =  -75.5860000     A.U. after    4 cycles
 1\1\GINC-NODE1\FOpt\RHF\3-21G\H2O1\USER\01-Jan-2024\0\\#P RHF/3-21G OPT
";

    #[test]
    fn reads_every_frame_and_skips_dummy_atoms() {
        let log = GaussianLog::read_from(&mut Cursor::new(LOG)).unwrap();
        assert_eq!(log.frames.len(), 2);

        let first = &log.frames[0].system;
        assert_eq!(first.atom_count(), 3);
        let elements: Vec<_> = first.atoms_iter().map(|(_, a)| a.element.clone()).collect();
        assert_eq!(elements, vec!["O", "H", "H"]);
        let last = first.atoms_iter().last().unwrap().1;
        assert_eq!(last.serial, 3);
        assert_eq!(last.position, Point3::new(0.0, -0.763239, -0.477047));
    }

    #[test]
    fn records_energy_and_level_of_theory() {
        let log = GaussianLog::read_from(&mut Cursor::new(LOG)).unwrap();
        assert_eq!(
            log.frames[0].energy_remark.as_deref(),
            Some("SCF Done:  E(RHF) =  -75.5859574     A.U. after    5 cycles")
        );
        assert!(log.frames[1].energy_remark.as_deref().unwrap().contains("-75.5860000"));
        assert_eq!(log.level_of_theory.as_deref(), Some("RHF/3-21G"));
    }

    #[test]
    fn frame_selection_defaults_to_last() {
        let log = GaussianLog::read_from(&mut Cursor::new(LOG)).unwrap();
        let last = log.frame(None).unwrap();
        let o = last.system.atoms_iter().next().unwrap().1;
        assert_eq!(o.position.z, 0.11);
        assert!(log.frame(Some(0)).is_ok());
        assert!(matches!(
            log.frame(Some(2)),
            Err(GaussianError::FrameOutOfRange {
                requested: 2,
                available: 2
            })
        ));

        let first = log.into_frame(Some(0)).unwrap();
        assert!(first.energy_remark.unwrap().contains("-75.5859574"));
    }

    #[test]
    fn log_without_geometry_is_an_error() {
        let result = GaussianLog::read_from(&mut Cursor::new(" Normal termination\n"));
        assert!(matches!(result, Err(GaussianError::NoGeometry)));
    }

    #[test]
    fn malformed_atom_rows_are_reported() {
        let log = " Standard orientation:\n ---\n h\n h\n ---\n    1   x   0   0.0 0.0 0.0\n";
        assert!(matches!(
            GaussianLog::read_from(&mut Cursor::new(log)),
            Err(GaussianError::Parse { line: 6, .. })
        ));
    }

    #[test]
    fn level_of_theory_needs_enough_fields() {
        assert_eq!(parse_level_of_theory(r"1\1\GINC"), None);
        assert_eq!(
            parse_level_of_theory(r" 1\1\GINC-X\SP\B3LYP\6-31G(d)\C1"),
            Some("B3LYP/6-31G(d)".to_string())
        );
    }
}
