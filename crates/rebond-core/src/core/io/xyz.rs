use crate::core::elements::{element_from_atomic_number, infer_element, normalize_symbol};
use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyzMetadata {
    /// The free-form second line of the frame.
    pub comment: String,
}

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Frame declares {expected} atoms but the file ends after {found}")]
    TruncatedFrame { expected: usize, found: usize },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidAtomCount(String),
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
    #[error("Atom record needs an element and three coordinates")]
    TooFewFields,
    #[error("Cannot determine the element of '{0}'")]
    UnknownElement(String),
}

pub struct XyzFile;

impl XyzFile {
    /// Reads every frame of a (possibly multi-frame) XYZ file.
    pub fn read_frames(
        reader: &mut impl BufRead,
    ) -> Result<Vec<(MolecularSystem, XyzMetadata)>, XyzError> {
        let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));
        let mut frames = Vec::new();

        while let Some((line_num, line)) = lines.next() {
            let line = line?;
            let count_str = line.trim();
            if count_str.is_empty() {
                continue;
            }
            let expected: usize = count_str.parse().map_err(|_| XyzError::Parse {
                line: line_num,
                kind: XyzParseErrorKind::InvalidAtomCount(count_str.to_string()),
            })?;

            let comment = match lines.next() {
                Some((_, line)) => line?.trim_end().to_string(),
                None => {
                    return Err(XyzError::TruncatedFrame { expected, found: 0 });
                }
            };

            let mut system = MolecularSystem::new();
            for found in 0..expected {
                let Some((line_num, line)) = lines.next() else {
                    return Err(XyzError::TruncatedFrame { expected, found });
                };
                let atom = parse_atom_line(&line?, line_num, found + 1)?;
                system.add_atom(atom);
            }
            frames.push((system, XyzMetadata { comment }));
        }

        Ok(frames)
    }
}

fn parse_atom_line(line: &str, line_num: usize, serial: usize) -> Result<Atom, XyzError> {
    let parse_error = |kind| XyzError::Parse {
        line: line_num,
        kind,
    };
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(parse_error(XyzParseErrorKind::TooFewFields));
    }

    let label = fields[0];
    let element = match label.parse::<u32>() {
        Ok(z) => element_from_atomic_number(z),
        Err(_) => normalize_symbol(label).or_else(|| infer_element(label, "")),
    }
    .ok_or_else(|| parse_error(XyzParseErrorKind::UnknownElement(label.to_string())))?;

    let mut coords = [0.0; 3];
    for (k, field) in fields[1..4].iter().enumerate() {
        coords[k] = field
            .parse()
            .map_err(|_| parse_error(XyzParseErrorKind::InvalidFloat(field.to_string())))?;
    }

    Ok(Atom::new(
        serial,
        &format!("{element}{serial}"),
        element,
        Point3::from(coords),
    ))
}

impl MolecularFile for XyzFile {
    type Metadata = XyzMetadata;
    type Error = XyzError;

    /// Reads the first frame.
    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        Self::read_frames(reader)?
            .into_iter()
            .next()
            .ok_or_else(|| XyzError::MissingRecord("atom count line".into()))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "{}", system.atom_count())?;
        writeln!(writer, "{}", metadata.comment.lines().next().unwrap_or(""))?;
        for (_, atom) in system.atoms_iter() {
            let label = if atom.element.is_empty() {
                &atom.name
            } else {
                &atom.element
            };
            writeln!(
                writer,
                "{:<2} {:>14.8} {:>14.8} {:>14.8}",
                label, atom.position.x, atom.position.y, atom.position.z
            )?;
        }
        Ok(())
    }

    fn write_system_to(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let metadata = XyzMetadata {
            comment: "Generated by rebond++".to_string(),
        };
        Self::write_to(system, &metadata, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    const WATER: &str = "3\nwater molecule\nO 0.000 0.000 0.117\nH 0.000 0.757 -0.467\nH 0.000 -0.757 -0.467\n";

    #[test]
    fn reads_single_frame() {
        let (system, metadata) = XyzFile::read_from(&mut Cursor::new(WATER)).unwrap();
        assert_eq!(metadata.comment, "water molecule");
        assert_eq!(system.atom_count(), 3);

        let atoms: Vec<_> = system.atoms_iter().map(|(_, a)| a).collect();
        assert_eq!(atoms[0].element, "O");
        assert_eq!(atoms[0].name, "O1");
        assert_eq!(atoms[1].serial, 2);
        assert_eq!(atoms[2].position, Point3::new(0.0, -0.757, -0.467));
        assert!(atoms.iter().all(|a| a.covalent_radius.is_none()));
    }

    #[test]
    fn reads_all_frames_and_atomic_numbers() {
        let input = "2\nframe 1\n6 0 0 0\n8 1.2 0 0\n\n2\nframe 2\nc 0 0 0\nO 1.3 0 0\n";
        let frames = XyzFile::read_frames(&mut Cursor::new(input)).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].1.comment, "frame 2");
        let elements: Vec<_> = frames[0].0.atoms_iter().map(|(_, a)| a.element.clone()).collect();
        assert_eq!(elements, vec!["C", "O"]);
        let first = frames[1].0.atoms_iter().next().unwrap().1;
        assert_eq!(first.element, "C");
    }

    #[test]
    fn reports_parse_errors_with_line_numbers() {
        let bad_count = XyzFile::read_from(&mut Cursor::new("three\n\n"));
        assert!(matches!(
            bad_count,
            Err(XyzError::Parse {
                line: 1,
                kind: XyzParseErrorKind::InvalidAtomCount(_)
            })
        ));

        let bad_float = XyzFile::read_from(&mut Cursor::new("1\n\nC 0.0 abc 0.0\n"));
        assert!(matches!(
            bad_float,
            Err(XyzError::Parse {
                line: 3,
                kind: XyzParseErrorKind::InvalidFloat(_)
            })
        ));

        let bad_element = XyzFile::read_from(&mut Cursor::new("1\n\n?? 0 0 0\n"));
        assert!(matches!(
            bad_element,
            Err(XyzError::Parse {
                kind: XyzParseErrorKind::UnknownElement(_),
                ..
            })
        ));
    }

    #[test]
    fn reports_truncated_and_empty_input() {
        let truncated = XyzFile::read_from(&mut Cursor::new("3\ncomment\nC 0 0 0\n"));
        assert!(matches!(
            truncated,
            Err(XyzError::TruncatedFrame {
                expected: 3,
                found: 1
            })
        ));
        assert!(matches!(
            XyzFile::read_from(&mut Cursor::new("")),
            Err(XyzError::MissingRecord(_))
        ));
    }

    #[test]
    fn write_then_read_preserves_atoms() {
        let (system, metadata) = XyzFile::read_from(&mut Cursor::new(WATER)).unwrap();
        let file = NamedTempFile::new().unwrap();
        XyzFile::write_to_path(&system, &metadata, file.path()).unwrap();

        let (reread, reread_meta) = XyzFile::read_from_path(file.path()).unwrap();
        assert_eq!(reread_meta.comment, "water molecule");
        for ((_, a), (_, b)) in system.atoms_iter().zip(reread.atoms_iter()) {
            assert_eq!(a.element, b.element);
            assert!((a.position - b.position).norm() < 1e-8);
        }
    }

    #[test]
    fn default_comment_is_written() {
        let (system, _) = XyzFile::read_from(&mut Cursor::new(WATER)).unwrap();
        let mut out = Vec::new();
        XyzFile::write_system_to(&system, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("3"));
        assert_eq!(lines.next(), Some("Generated by rebond++"));
    }
}
