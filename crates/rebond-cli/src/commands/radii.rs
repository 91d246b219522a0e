use crate::cli::RadiiArgs;
use crate::error::{CliError, Result};
use rebondpp::core::elements::{CovalentRadii, normalize_symbol};
use std::fmt::Write;
use tracing::info;

pub fn run(args: RadiiArgs) -> Result<()> {
    let radii = match &args.radii {
        Some(path) => {
            info!("Loading covalent radius overrides from {:?}", path);
            CovalentRadii::load(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?
        }
        None => CovalentRadii::default(),
    };

    print!("{}", render_table(&radii, &args.elements)?);
    Ok(())
}

/// Formats the radius of each requested element, or of every known element when
/// `elements` is empty. Overridden values are marked with `*`.
pub fn render_table(radii: &CovalentRadii, elements: &[String]) -> Result<String> {
    let rows: Vec<(&'static str, Option<f64>)> = if elements.is_empty() {
        radii
            .entries()
            .into_iter()
            .map(|(symbol, radius)| (symbol, Some(radius)))
            .collect()
    } else {
        elements
            .iter()
            .map(|e| {
                let symbol = normalize_symbol(e)
                    .ok_or_else(|| CliError::Argument(format!("Unknown element '{}'", e)))?;
                Ok((symbol, radii.lookup(symbol)))
            })
            .collect::<Result<_>>()?
    };

    let mut table = String::from("Element  Radius (Å)\n");
    for (symbol, radius) in rows {
        let marker = if radii.is_overridden(symbol) { "*" } else { "" };
        let written = match radius {
            Some(r) => writeln!(table, "{:<7}  {:>6.3}{}", symbol, r, marker),
            None => writeln!(table, "{:<7}  {:>6}", symbol, "-"),
        };
        written.map_err(|e| CliError::Other(e.into()))?;
    }
    Ok(table)
}
