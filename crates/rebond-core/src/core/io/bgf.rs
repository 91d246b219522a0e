use crate::core::elements::infer_element;
use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{self, BufRead, Write};
use thiserror::Error;

const MAX_CONECT_PARTNERS: usize = 12;

const DEFAULT_HEADER: &[&str] = &[
    "BIOGRF 200",
    "REMARK Generated by rebond++",
    "FORCEFIELD DREIDING",
];

const DEFAULT_FORMAT_LINES: &[&str] = &[
    "FORMAT ATOM   (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a5,i3,i2,1x,f8.5)",
    "FORMAT CONECT (a6,12i6)",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BgfMetadata {
    /// Header records (`BIOGRF`, `DESCRP`, `REMARK`, `FORCEFIELD`, ...) in file order.
    pub header_lines: Vec<String>,
    pub format_lines: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BgfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: BgfParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum BgfParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (coordinates end at column 60)")]
    LineTooShort,
    #[error("Invalid {record} record: {reason}")]
    InvalidConnectivity {
        record: &'static str,
        reason: String,
    },
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end)
        .or_else(|| line.get(start..))
        .unwrap_or("")
        .trim()
}

fn parse_float(line: &str, line_num: usize, start: usize, end: usize) -> Result<f64, BgfError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| BgfError::Parse {
        line: line_num,
        kind: BgfParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_int<T: std::str::FromStr>(
    line: &str,
    line_num: usize,
    start: usize,
    end: usize,
) -> Result<T, BgfError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| BgfError::Parse {
        line: line_num,
        kind: BgfParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_atom_record(line: &str, line_num: usize) -> Result<Atom, BgfError> {
    if line.len() < 60 {
        return Err(BgfError::Parse {
            line: line_num,
            kind: BgfParseErrorKind::LineTooShort,
        });
    }

    let serial: usize = parse_int(line, line_num, 7, 12)?;
    let name = slice_and_trim(line, 13, 18);
    if name.is_empty() {
        return Err(BgfError::Parse {
            line: line_num,
            kind: BgfParseErrorKind::MissingRequiredField {
                columns: "14-18".into(),
            },
        });
    }
    let residue_name = slice_and_trim(line, 19, 22);
    let chain_id = slice_and_trim(line, 23, 24).chars().next().unwrap_or('A');
    let residue_number: isize = if slice_and_trim(line, 25, 30).is_empty() {
        1
    } else {
        parse_int(line, line_num, 25, 30)?
    };
    let x = parse_float(line, line_num, 30, 40)?;
    let y = parse_float(line, line_num, 40, 50)?;
    let z = parse_float(line, line_num, 50, 60)?;
    let force_field_type = slice_and_trim(line, 61, 66);
    let partial_charge = if slice_and_trim(line, 72, 80).is_empty() {
        0.0
    } else {
        parse_float(line, line_num, 72, 80)?
    };

    let element = infer_element(name, force_field_type).unwrap_or("");
    let mut atom = Atom::new(serial, name, element, Point3::new(x, y, z));
    if !residue_name.is_empty() {
        atom.residue_name = residue_name.to_string();
    }
    atom.chain_id = chain_id;
    atom.residue_number = residue_number;
    atom.force_field_type = force_field_type.to_string();
    atom.partial_charge = partial_charge;
    Ok(atom)
}

fn parse_serials(
    fields: &[&str],
    record: &'static str,
    line_num: usize,
) -> Result<Vec<usize>, BgfError> {
    fields
        .iter()
        .map(|f| {
            f.parse().map_err(|_| BgfError::Parse {
                line: line_num,
                kind: BgfParseErrorKind::InvalidConnectivity {
                    record,
                    reason: format!("'{f}' is not an atom serial"),
                },
            })
        })
        .collect()
}

pub struct BgfFile;

impl MolecularFile for BgfFile {
    type Metadata = BgfMetadata;
    type Error = BgfError;

    fn read_from(
        reader: &mut impl BufRead,
    ) -> Result<(MolecularSystem, Self::Metadata), Self::Error> {
        let mut system = MolecularSystem::new();
        let mut metadata = BgfMetadata::default();
        let mut seen_serials = HashSet::new();

        // CONECT partners and ORDER values per atom, in record order. A long
        // CONECT list may be continued on further records for the same atom.
        let mut partners: Vec<(usize, Vec<usize>)> = Vec::new();
        let mut orders: HashMap<usize, Vec<BondOrder>> = HashMap::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            let record_type = slice_and_trim(&line, 0, 6);
            match record_type {
                "" => continue,
                "ATOM" | "HETATM" => {
                    let atom = parse_atom_record(&line, line_num)?;
                    if !seen_serials.insert(atom.serial) {
                        return Err(BgfError::Inconsistency(format!(
                            "Duplicate atom serial: {}",
                            atom.serial
                        )));
                    }
                    system.add_atom(atom);
                }
                "CONECT" => {
                    let fields: Vec<&str> = line.split_whitespace().skip(1).collect();
                    let serials = parse_serials(&fields, "CONECT", line_num)?;
                    if let Some((&origin, rest)) = serials.split_first() {
                        partners.push((origin, rest.to_vec()));
                    }
                }
                "ORDER" => {
                    let fields: Vec<&str> = line.split_whitespace().skip(1).collect();
                    let Some((origin, values)) = fields.split_first() else {
                        continue;
                    };
                    let origin = parse_serials(&[*origin], "ORDER", line_num)?[0];
                    let values = values
                        .iter()
                        .map(|v| {
                            v.parse::<BondOrder>().map_err(|_| BgfError::Parse {
                                line: line_num,
                                kind: BgfParseErrorKind::InvalidConnectivity {
                                    record: "ORDER",
                                    reason: format!("'{v}' is not a bond order"),
                                },
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    orders.entry(origin).or_default().extend(values);
                }
                "FORMAT" => metadata.format_lines.push(line.clone()),
                "END" => break,
                _ => metadata.header_lines.push(line.clone()),
            }
        }

        if seen_serials.is_empty() {
            return Err(BgfError::MissingRecord("ATOM/HETATM records".into()));
        }

        let mut bonds: BTreeMap<(usize, usize), BondOrder> = BTreeMap::new();
        let mut consumed: HashMap<usize, usize> = HashMap::new();
        for (origin, list) in &partners {
            let offset = consumed.entry(*origin).or_insert(0);
            for (k, &partner) in list.iter().enumerate() {
                let order = orders
                    .get(origin)
                    .and_then(|o| o.get(*offset + k))
                    .copied()
                    .unwrap_or_default();
                let key = ((*origin).min(partner), (*origin).max(partner));
                let entry = bonds.entry(key).or_insert(order);
                if *entry == BondOrder::Single {
                    *entry = order;
                }
            }
            *offset += list.len();
        }

        for ((a_serial, b_serial), order) in bonds {
            let (Some(a), Some(b)) = (
                system.find_atom_by_serial(a_serial),
                system.find_atom_by_serial(b_serial),
            ) else {
                return Err(BgfError::Inconsistency(format!(
                    "CONECT references unknown atom in pair {a_serial}-{b_serial}"
                )));
            };
            // A self reference only marks an atom without partners.
            if a != b {
                system.add_bond(a, b, order);
            }
        }

        Ok((system, metadata))
    }

    fn write_to(
        system: &MolecularSystem,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }
        for line in &metadata.format_lines {
            writeln!(writer, "{}", line)?;
        }

        for (id, atom) in system.atoms_iter() {
            let bond_count = system.get_bonded_neighbors(id).map_or(0, |n| n.len());
            let force_field_type = if atom.force_field_type.is_empty() {
                &atom.element
            } else {
                &atom.force_field_type
            };
            writeln!(
                writer,
                "{:<6} {:>5} {:<5} {:>3} {:1} {:>5}{:>10.5}{:>10.5}{:>10.5} {:<5}{:>3}{:>2} {:>8.5}",
                "HETATM",
                atom.serial,
                atom.name,
                atom.residue_name,
                atom.chain_id,
                atom.residue_number,
                atom.position.x,
                atom.position.y,
                atom.position.z,
                force_field_type,
                bond_count,
                0,
                atom.partial_charge
            )?;
        }

        let mut conect_lines = Vec::new();
        let mut order_lines = Vec::new();
        for (id, atom) in system.atoms_iter() {
            let neighbors = system.get_bonded_neighbors(id).unwrap_or(&[]);
            if neighbors.is_empty() {
                continue;
            }
            let mut partners = Vec::with_capacity(neighbors.len());
            for &neighbor in neighbors {
                let partner = system.atom(neighbor).ok_or_else(|| {
                    BgfError::Inconsistency(format!(
                        "Atom {} is bonded to an atom that is not in the system",
                        atom.serial
                    ))
                })?;
                let order = system
                    .bond_between(id, neighbor)
                    .map_or(BondOrder::Single, |b| b.order);
                partners.push((partner.serial, order));
            }

            let has_higher_order = partners.iter().any(|(_, o)| *o != BondOrder::Single);
            for chunk in partners.chunks(MAX_CONECT_PARTNERS) {
                let mut conect = format!("CONECT{:>6}", atom.serial);
                let mut order = format!("ORDER {:>6}", atom.serial);
                for (serial, bond_order) in chunk {
                    conect.push_str(&format!("{:>6}", serial));
                    order.push_str(&format!("{:>6}", bond_order.bgf_token()));
                }
                conect_lines.push(conect);
                if has_higher_order {
                    order_lines.push(order);
                }
            }
        }

        // ORDER records follow the CONECT record they annotate.
        let mut order_iter = order_lines.into_iter().peekable();
        for conect in conect_lines {
            let origin = conect.get(6..12).map(str::to_owned);
            writeln!(writer, "{}", conect)?;
            if let Some(next) = order_iter.peek() {
                if next.get(6..12).map(str::to_owned) == origin {
                    writeln!(writer, "{}", next)?;
                    order_iter.next();
                }
            }
        }

        writeln!(writer, "END")?;
        Ok(())
    }

    fn write_system_to(
        system: &MolecularSystem,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        let metadata = BgfMetadata {
            header_lines: DEFAULT_HEADER.iter().map(|s| s.to_string()).collect(),
            format_lines: DEFAULT_FORMAT_LINES.iter().map(|s| s.to_string()).collect(),
        };
        Self::write_to(system, &metadata, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    const ETHENE_FRAGMENT: &str = "\
BIOGRF 200
DESCRP ethene
FORCEFIELD DREIDING
FORMAT ATOM   (a6,1x,i5,1x,a5,1x,a3,1x,a1,1x,a5,3f10.5,1x,a5,i3,i2,1x,f8.5)
HETATM     1 C1    ETH A     1   0.00000   0.00000   0.00000 C_2    3 0 -0.21000
HETATM     2 C2    ETH A     1   1.33000   0.00000   0.00000 C_2    3 0 -0.21000
HETATM     3 H1    ETH A     1  -0.55000   0.93000   0.00000 H_     1 0  0.10500
FORMAT CONECT (a6,12i6)
CONECT     1     2     3
ORDER      1     2     1
CONECT     2     1
ORDER      2     2
CONECT     3     1
END
";

    fn serial_pairs(system: &MolecularSystem) -> Vec<(usize, usize, BondOrder)> {
        let mut pairs: Vec<_> = system
            .bonds()
            .iter()
            .map(|b| {
                let s1 = system.atom(b.atom1_id).unwrap().serial;
                let s2 = system.atom(b.atom2_id).unwrap().serial;
                (s1.min(s2), s1.max(s2), b.order)
            })
            .collect();
        pairs.sort_by_key(|(a, b, _)| (*a, *b));
        pairs
    }

    #[test]
    fn reads_atoms_and_header() {
        let (system, metadata) = BgfFile::read_from(&mut Cursor::new(ETHENE_FRAGMENT)).unwrap();
        assert_eq!(system.atom_count(), 3);
        assert_eq!(
            metadata.header_lines,
            vec!["BIOGRF 200", "DESCRP ethene", "FORCEFIELD DREIDING"]
        );
        assert_eq!(metadata.format_lines.len(), 2);

        let c1 = system.atom(system.find_atom_by_serial(1).unwrap()).unwrap();
        assert_eq!(c1.name, "C1");
        assert_eq!(c1.element, "C");
        assert_eq!(c1.residue_name, "ETH");
        assert_eq!(c1.force_field_type, "C_2");
        assert_eq!(c1.partial_charge, -0.21);
        let h1 = system.atom(system.find_atom_by_serial(3).unwrap()).unwrap();
        assert_eq!(h1.element, "H");
        assert_eq!(h1.position, Point3::new(-0.55, 0.93, 0.0));
    }

    #[test]
    fn reads_connectivity_with_orders() {
        let (system, _) = BgfFile::read_from(&mut Cursor::new(ETHENE_FRAGMENT)).unwrap();
        assert_eq!(
            serial_pairs(&system),
            vec![(1, 2, BondOrder::Double), (1, 3, BondOrder::Single)]
        );
    }

    #[test]
    fn rejects_short_atom_records_and_missing_atoms() {
        let short = "HETATM     1 C1    ETH A     1   0.00000\nEND\n";
        assert!(matches!(
            BgfFile::read_from(&mut Cursor::new(short)),
            Err(BgfError::Parse {
                line: 1,
                kind: BgfParseErrorKind::LineTooShort
            })
        ));
        assert!(matches!(
            BgfFile::read_from(&mut Cursor::new("BIOGRF 200\nEND\n")),
            Err(BgfError::MissingRecord(_))
        ));
    }

    #[test]
    fn rejects_bad_coordinates_and_unknown_partners() {
        let bad_x = "HETATM     1 C1    ETH A     1   0.0x000   0.00000   0.00000 C_3    4 0  0.00000\n";
        assert!(matches!(
            BgfFile::read_from(&mut Cursor::new(bad_x)),
            Err(BgfError::Parse {
                kind: BgfParseErrorKind::InvalidFloat { .. },
                ..
            })
        ));

        let dangling = "HETATM     1 C1    ETH A     1   0.00000   0.00000   0.00000 C_3    4 0  0.00000\nCONECT     1     9\n";
        assert!(matches!(
            BgfFile::read_from(&mut Cursor::new(dangling)),
            Err(BgfError::Inconsistency(_))
        ));
    }

    #[test]
    fn rejects_duplicate_serials() {
        let line = "HETATM     1 C1    ETH A     1   0.00000   0.00000   0.00000 C_3    4 0  0.00000\n";
        let input = format!("{line}{line}");
        assert!(matches!(
            BgfFile::read_from(&mut Cursor::new(input)),
            Err(BgfError::Inconsistency(_))
        ));
    }

    #[test]
    fn written_records_use_fixed_columns() {
        let (system, _) = BgfFile::read_from(&mut Cursor::new(ETHENE_FRAGMENT)).unwrap();
        let mut out = Vec::new();
        BgfFile::write_system_to(&system, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let atom_line = text.lines().find(|l| l.starts_with("HETATM")).unwrap();
        assert_eq!(atom_line.len(), 80);
        assert_eq!(&atom_line[30..40], "   0.00000");
        assert_eq!(&atom_line[61..66], "C_2  ");

        assert!(text.starts_with("BIOGRF 200\n"));
        assert!(text.contains("CONECT     1     2     3\nORDER      1     2     1\n"));
        assert!(text.contains("CONECT     3     1\n"));
        assert!(text.trim_end().ends_with("END"));
    }

    #[test]
    fn write_then_read_preserves_structure() {
        let (system, metadata) = BgfFile::read_from(&mut Cursor::new(ETHENE_FRAGMENT)).unwrap();
        let file = NamedTempFile::new().unwrap();
        BgfFile::write_to_path(&system, &metadata, file.path()).unwrap();

        let (reread, reread_meta) = BgfFile::read_from_path(file.path()).unwrap();
        assert_eq!(reread_meta, metadata);
        assert_eq!(serial_pairs(&reread), serial_pairs(&system));
        for ((_, a), (_, b)) in system.atoms_iter().zip(reread.atoms_iter()) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.force_field_type, b.force_field_type);
            assert!((a.position - b.position).norm() < 1e-5);
            assert!((a.partial_charge - b.partial_charge).abs() < 1e-5);
        }
    }

    #[test]
    fn long_neighbor_lists_are_split_across_records() {
        let mut system = MolecularSystem::new();
        let center = system.add_atom(Atom::new(1, "X", "C", Point3::origin()));
        for i in 0..14 {
            let id = system.add_atom(Atom::new(i + 2, "H", "H", Point3::new(i as f64, 1.0, 0.0)));
            system.add_bond(center, id, BondOrder::Single);
        }
        let mut out = Vec::new();
        BgfFile::write_system_to(&system, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first_atom_records = text
            .lines()
            .filter(|l| l.starts_with("CONECT     1"))
            .count();
        assert_eq!(first_atom_records, 2);
        assert!(!text.contains("ORDER"));

        let (reread, _) = BgfFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(reread.bonds().len(), 14);
    }
}
