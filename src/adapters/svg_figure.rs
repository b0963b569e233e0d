//! SVG line-chart figure sink.

use crate::domain::error::ClearbenchError;
use crate::domain::series::Series;
use crate::ports::figure_port::{AxisScale, FigurePort};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 50.0;
const LEGEND_WIDTH: f64 = 160.0;

const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

#[derive(Debug, Default)]
pub struct SvgFigure {
    x_label: String,
    y_label: String,
    x_scale: AxisScale,
    y_scale: AxisScale,
    annotation: Option<String>,
    series: Vec<Series>,
}

impl SvgFigure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Renders the accumulated figure without resetting it.
    pub fn render(&self) -> String {
        let mut svg = String::new();
        let total_width = WIDTH + LEGEND_WIDTH;
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}">"#,
            total_width, HEIGHT, total_width, HEIGHT
        );
        let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

        let plot_width = WIDTH - 2.0 * PADDING;
        let plot_height = HEIGHT - 2.0 * PADDING;
        let _ = writeln!(
            svg,
            r#"<line x1="{p:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="black"/>"#,
            p = PADDING,
            b = HEIGHT - PADDING,
            r = PADDING + plot_width
        );
        let _ = writeln!(
            svg,
            r#"<line x1="{p:.1}" y1="{p:.1}" x2="{p:.1}" y2="{b:.1}" stroke="black"/>"#,
            p = PADDING,
            b = HEIGHT - PADDING
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12">{}</text>"#,
            PADDING + plot_width / 2.0,
            HEIGHT - PADDING / 3.0,
            escape(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12" transform="rotate(-90 {:.1} {:.1})">{}</text>"#,
            PADDING / 3.0,
            PADDING + plot_height / 2.0,
            PADDING / 3.0,
            PADDING + plot_height / 2.0,
            escape(&self.y_label)
        );

        let projected: Vec<Vec<(f64, f64)>> = self
            .series
            .iter()
            .map(|s| {
                s.points
                    .iter()
                    .filter_map(|&(x, y)| Some((project(x, self.x_scale)?, project(y, self.y_scale)?)))
                    .collect()
            })
            .collect();

        if let Some(bounds) = Bounds::of(projected.iter().flatten()) {
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="10">{}</text>"#,
                PADDING,
                HEIGHT - PADDING + 14.0,
                tick_label(bounds.min_x, self.x_scale)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
                PADDING + plot_width,
                HEIGHT - PADDING + 14.0,
                tick_label(bounds.max_x, self.x_scale)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
                PADDING - 4.0,
                HEIGHT - PADDING,
                tick_label(bounds.min_y, self.y_scale)
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="10" text-anchor="end">{}</text>"#,
                PADDING - 4.0,
                PADDING + 4.0,
                tick_label(bounds.max_y, self.y_scale)
            );

            for (i, points) in projected.iter().enumerate() {
                let colour = PALETTE[i % PALETTE.len()];
                let coords: Vec<String> = points
                    .iter()
                    .map(|&(x, y)| {
                        let px = PADDING + bounds.fraction_x(x) * plot_width;
                        let py = HEIGHT - PADDING - bounds.fraction_y(y) * plot_height;
                        format!("{:.1},{:.1}", px, py)
                    })
                    .collect();
                let _ = writeln!(
                    svg,
                    r#"<polyline fill="none" stroke="{}" stroke-width="1.5" points="{}"/>"#,
                    colour,
                    coords.join(" ")
                );
            }
        }

        for (i, s) in self.series.iter().enumerate() {
            let colour = PALETTE[i % PALETTE.len()];
            let y = PADDING + 16.0 * i as f64;
            let _ = writeln!(
                svg,
                r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/>"#,
                WIDTH,
                y,
                WIDTH + 20.0,
                y,
                colour
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="11">{}</text>"#,
                WIDTH + 24.0,
                y + 4.0,
                escape(&s.label)
            );
        }

        if let Some(text) = &self.annotation {
            let top = PADDING + 16.0 * self.series.len() as f64 + 16.0;
            for (i, line) in text.lines().enumerate() {
                let _ = writeln!(
                    svg,
                    r#"<text x="{:.1}" y="{:.1}" font-size="10">{}</text>"#,
                    WIDTH,
                    top + 13.0 * i as f64,
                    escape(line)
                );
            }
        }

        svg.push_str("</svg>\n");
        svg
    }
}

fn project(value: f64, scale: AxisScale) -> Option<f64> {
    match scale {
        AxisScale::Linear => value.is_finite().then_some(value),
        AxisScale::Log if value > 0.0 && value.is_finite() => Some(value.log10()),
        AxisScale::Log => None,
    }
}

fn tick_label(projected: f64, scale: AxisScale) -> String {
    match scale {
        AxisScale::Linear => format!("{:.3}", projected),
        AxisScale::Log => format!("{:.3e}", 10f64.powf(projected)),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn of<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> Option<Self> {
        points.fold(None, |acc: Option<Bounds>, &(x, y)| {
            Some(match acc {
                None => Bounds {
                    min_x: x,
                    max_x: x,
                    min_y: y,
                    max_y: y,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(x),
                    max_x: b.max_x.max(x),
                    min_y: b.min_y.min(y),
                    max_y: b.max_y.max(y),
                },
            })
        })
    }

    fn fraction_x(&self, x: f64) -> f64 {
        fraction(x, self.min_x, self.max_x)
    }

    fn fraction_y(&self, y: f64) -> f64 {
        fraction(y, self.min_y, self.max_y)
    }
}

fn fraction(v: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 { (v - min) / range } else { 0.5 }
}

impl FigurePort for SvgFigure {
    fn set_labels(&mut self, x_label: &str, y_label: &str) {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
    }

    fn set_scale(&mut self, x: AxisScale, y: AxisScale) {
        self.x_scale = x;
        self.y_scale = y;
    }

    fn annotate(&mut self, text: &str) {
        self.annotation = Some(text.to_string());
    }

    fn add_series(&mut self, series: Series) {
        if self.y_scale == AxisScale::Log && series.points.iter().any(|&(_, y)| y <= 0.0) {
            warn!(label = %series.label, "non-positive values dropped on log axis");
        }
        self.series.push(series);
    }

    fn flush(&mut self, path: &Path) -> Result<(), ClearbenchError> {
        let svg = self.render();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ClearbenchError::Figure {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        fs::write(path, svg).map_err(|e| ClearbenchError::Figure {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;
        info!(path = %path.display(), series = self.series.len(), "figure written");
        *self = SvgFigure::default();
        Ok(())
    }
}
