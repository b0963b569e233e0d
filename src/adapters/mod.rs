//! Concrete adapter implementations for ports.

pub mod csv_figure;
pub mod external_solver;
pub mod file_config_adapter;
pub mod json_store;
pub mod svg_figure;

use crate::domain::error::ClearbenchError;
use crate::ports::figure_port::FigurePort;

/// Picks the figure sink for a configured extension (".svg" or ".csv").
pub fn figure_for_extension(extension: &str) -> Result<Box<dyn FigurePort>, ClearbenchError> {
    match extension.to_ascii_lowercase().as_str() {
        ".svg" => Ok(Box::new(svg_figure::SvgFigure::new())),
        ".csv" => Ok(Box::new(csv_figure::CsvFigure::new())),
        other => Err(ClearbenchError::Figure {
            reason: format!("no figure sink for extension '{}'", other),
        }),
    }
}
