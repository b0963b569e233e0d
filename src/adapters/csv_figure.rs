//! CSV figure sink: one `label,x,y` row per point.

use crate::domain::error::ClearbenchError;
use crate::domain::series::Series;
use crate::ports::figure_port::{AxisScale, FigurePort};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default)]
pub struct CsvFigure {
    x_label: String,
    y_label: String,
    series: Vec<Series>,
}

impl CsvFigure {
    pub fn new() -> Self {
        Self::default()
    }

    fn figure_error(path: &Path, e: impl std::fmt::Display) -> ClearbenchError {
        ClearbenchError::Figure {
            reason: format!("failed to write {}: {}", path.display(), e),
        }
    }
}

impl FigurePort for CsvFigure {
    fn set_labels(&mut self, x_label: &str, y_label: &str) {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
    }

    fn set_scale(&mut self, _x: AxisScale, _y: AxisScale) {}

    fn annotate(&mut self, _text: &str) {}

    fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    fn flush(&mut self, path: &Path) -> Result<(), ClearbenchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Self::figure_error(path, e))?;
        }
        let x_header = if self.x_label.is_empty() { "x" } else { self.x_label.as_str() };
        let y_header = if self.y_label.is_empty() { "y" } else { self.y_label.as_str() };

        let mut writer = csv::Writer::from_path(path).map_err(|e| Self::figure_error(path, e))?;
        writer
            .write_record(["label", x_header, y_header])
            .map_err(|e| Self::figure_error(path, e))?;
        for s in &self.series {
            for (x, y) in &s.points {
                writer
                    .write_record([s.label.clone(), x.to_string(), y.to_string()])
                    .map_err(|e| Self::figure_error(path, e))?;
            }
        }
        writer.flush().map_err(|e| Self::figure_error(path, e))?;
        info!(path = %path.display(), series = self.series.len(), "series written");
        *self = CsvFigure::default();
        Ok(())
    }
}
