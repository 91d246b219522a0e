use crate::cli::BondArgs;
use crate::config::PartialRebondConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use rebondpp::{
    core::{
        io::{
            bgf::{BgfFile, BgfMetadata},
            format::{FileFormat, ParseFileFormatError},
            gaussian::GaussianLog,
            traits::MolecularFile,
            xyz::{XyzFile, XyzMetadata},
        },
        models::system::MolecularSystem,
    },
    engine::progress::ProgressReporter,
    workflows,
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// What the input file carried besides atoms, used to shape the output.
enum InputMetadata {
    Xyz(XyzMetadata),
    Bgf(BgfMetadata),
    Gaussian { remark: Option<String> },
}

pub fn run(args: BondArgs, quiet: bool) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialRebondConfig::from_file(path)?,
        None => PartialRebondConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;
    debug!(
        rebond = ?config.rebond,
        overwrite_radii = config.overwrite_radii,
        "Effective configuration."
    );

    let input_format = resolve_format(args.format.as_deref(), &args.input)?;
    let output_format = resolve_format(args.output_format.as_deref(), &args.output)?;
    if !output_format.is_writable() {
        return Err(CliError::Argument(format!(
            "Cannot write {} files; choose xyz or bgf for the output",
            output_format
        )));
    }

    info!("Loading {} structure from {:?}", input_format, &args.input);
    let (mut system, metadata) = read_structure(&args.input, input_format, args.frame)?;
    if system.is_empty() {
        warn!("Input structure contains no atoms.");
    }

    let progress_handler = CliProgressHandler::new(quiet);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the rebonding workflow...");
    let report = workflows::rebond::run(&mut system, &config, &reporter)?;
    drop(reporter);

    info!("Writing {} structure to {:?}", output_format, &args.output);
    write_structure(&system, &metadata, output_format, &args.output)?;

    println!(
        "✓ {} atoms, {} bonds written to: {}",
        report.summary.atoms,
        report.summary.bonds,
        args.output.display()
    );
    Ok(())
}

fn resolve_format(explicit: Option<&str>, path: &Path) -> Result<FileFormat> {
    match explicit {
        Some(name) => name
            .parse()
            .map_err(|e: ParseFileFormatError| CliError::Argument(e.to_string())),
        None => FileFormat::from_path(path).ok_or_else(|| {
            CliError::Argument(format!(
                "Cannot infer the file format of '{}'; pass it explicitly",
                path.display()
            ))
        }),
    }
}

fn parse_error(path: &Path, source: impl Into<anyhow::Error>) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

fn read_structure(
    path: &Path,
    format: FileFormat,
    frame: Option<usize>,
) -> Result<(MolecularSystem, InputMetadata)> {
    match format {
        FileFormat::Xyz => {
            let mut reader = BufReader::new(File::open(path)?);
            let mut frames = XyzFile::read_frames(&mut reader).map_err(|e| parse_error(path, e))?;
            let available = frames.len();
            if available == 0 {
                return Err(parse_error(path, anyhow::anyhow!("file contains no frames")));
            }
            let index = frame.unwrap_or(0);
            if index >= available {
                return Err(CliError::Argument(format!(
                    "Frame {} requested but '{}' contains {} frame(s)",
                    index,
                    path.display(),
                    available
                )));
            }
            debug!(frame = index, available, "Selected XYZ frame.");
            let (system, metadata) = frames.swap_remove(index);
            Ok((system, InputMetadata::Xyz(metadata)))
        }
        FileFormat::Bgf => {
            if let Some(index) = frame.filter(|&i| i > 0) {
                return Err(CliError::Argument(format!(
                    "Frame {} requested but BGF files hold a single structure",
                    index
                )));
            }
            let (system, metadata) =
                BgfFile::read_from_path(path).map_err(|e| parse_error(path, e))?;
            Ok((system, InputMetadata::Bgf(metadata)))
        }
        FileFormat::GaussianLog => {
            let log = GaussianLog::read_from_path(path).map_err(|e| parse_error(path, e))?;
            let level_of_theory = log.level_of_theory.clone();
            let frame = log.into_frame(frame).map_err(|e| parse_error(path, e))?;
            let remark = match (frame.energy_remark, level_of_theory) {
                (Some(energy), Some(level)) => Some(format!("{} {}", level, energy)),
                (energy, level) => energy.or(level),
            };
            Ok((frame.system, InputMetadata::Gaussian { remark }))
        }
    }
}

fn write_structure(
    system: &MolecularSystem,
    metadata: &InputMetadata,
    format: FileFormat,
    path: &Path,
) -> Result<()> {
    let write_error = |source: anyhow::Error| CliError::FileWriting {
        path: path.to_path_buf(),
        source,
    };

    match (format, metadata) {
        (FileFormat::Bgf, InputMetadata::Bgf(bgf)) => {
            BgfFile::write_to_path(system, bgf, path).map_err(|e| write_error(e.into()))
        }
        (FileFormat::Bgf, _) => {
            BgfFile::write_system_to_path(system, path).map_err(|e| write_error(e.into()))
        }
        (FileFormat::Xyz, InputMetadata::Xyz(xyz)) => {
            XyzFile::write_to_path(system, xyz, path).map_err(|e| write_error(e.into()))
        }
        (FileFormat::Xyz, InputMetadata::Gaussian { remark: Some(remark) }) => {
            let xyz = XyzMetadata {
                comment: remark.clone(),
            };
            XyzFile::write_to_path(system, &xyz, path).map_err(|e| write_error(e.into()))
        }
        (FileFormat::Xyz, _) => {
            XyzFile::write_system_to_path(system, path).map_err(|e| write_error(e.into()))
        }
        (FileFormat::GaussianLog, _) => Err(CliError::Argument(
            "Gaussian logs cannot be written".to_string(),
        )),
    }
}
