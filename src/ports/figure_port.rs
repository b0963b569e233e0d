//! Visualization sink port trait.

use crate::domain::error::ClearbenchError;
use crate::domain::series::Series;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AxisScale {
    #[default]
    Linear,
    Log,
}

/// Port for an accumulating figure. Every `add_series` before a `flush`
/// lands on the same figure; `flush` writes it and starts a new one.
pub trait FigurePort {
    fn set_labels(&mut self, x_label: &str, y_label: &str);

    fn set_scale(&mut self, x: AxisScale, y: AxisScale);

    /// Free text shown beside the plot (e.g. run parameters).
    fn annotate(&mut self, text: &str);

    fn add_series(&mut self, series: Series);

    fn flush(&mut self, path: &Path) -> Result<(), ClearbenchError>;
}
