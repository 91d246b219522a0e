use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    name = "rebond",
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "rebond++ CLI - Reconstructs covalent bonds of molecular structures from 3D coordinates and covalent radii.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output and progress bars except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconstruct the bonds of a structure and write the result.
    Bond(BondArgs),
    /// Print the covalent radius table used for atom typing.
    Radii(RadiiArgs),
}

/// Arguments for the `bond` subcommand.
#[derive(Args, Debug)]
pub struct BondArgs {
    // --- Core Arguments ---
    /// Path to the input structure (.xyz, .bgf, or a Gaussian .log).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output structure (.bgf keeps the bonds as CONECT records).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Input format, overriding the file extension (xyz, bgf, gaussian).
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Output format, overriding the file extension (xyz, bgf).
    #[arg(long, value_name = "FORMAT")]
    pub output_format: Option<String>,

    /// Zero-based frame to use from multi-frame inputs. Defaults to the first
    /// XYZ frame and the last Gaussian geometry.
    #[arg(long, value_name = "INDEX")]
    pub frame: Option<usize>,

    // --- Bonding Overrides ---
    /// Override the bond tolerance (Å) added to the sum of covalent radii.
    #[arg(short = 't', long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    /// Override the minimum bond distance (Å).
    #[arg(short = 'm', long, value_name = "FLOAT")]
    pub min_distance: Option<f64>,

    // --- Radius Overrides ---
    /// TOML file with per-element covalent radius overrides.
    #[arg(short = 'r', long, value_name = "PATH")]
    pub radii: Option<PathBuf>,

    /// Replace covalent radii already present in the input with tabulated ones.
    #[arg(long)]
    pub overwrite_radii: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S bonding.tolerance=0.5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `radii` subcommand.
#[derive(Args, Debug)]
pub struct RadiiArgs {
    /// TOML file with per-element covalent radius overrides.
    #[arg(short = 'r', long, value_name = "PATH")]
    pub radii: Option<PathBuf>,

    /// Only show these elements.
    #[arg(value_name = "ELEMENT")]
    pub elements: Vec<String>,
}
