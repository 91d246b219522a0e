use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// The molecular file formats known to rebond++.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    Xyz,
    Bgf,
    /// Gaussian output log. Read only.
    GaussianLog,
}

#[derive(Debug, Error)]
#[error("Unknown file format '{0}' (expected one of: xyz, bgf, log)")]
pub struct ParseFileFormatError(String);

impl FileFormat {
    /// Guesses the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        extension.parse().ok()
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::GaussianLog)
    }
}

impl FromStr for FileFormat {
    type Err = ParseFileFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xyz" => Ok(Self::Xyz),
            "bgf" => Ok(Self::Bgf),
            "log" | "out" | "gaussian" => Ok(Self::GaussianLog),
            _ => Err(ParseFileFormatError(s.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xyz => "xyz",
            Self::Bgf => "bgf",
            Self::GaussianLog => "gaussian",
        })
    }
}
