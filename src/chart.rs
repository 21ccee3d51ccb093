use crate::errors::ChartError;
use crate::models::{ResultTable, Value};
use serde::Serialize;
use std::fmt::Write;

/// Qualitative palette used when a [`ChartSpec`] does not pin a colour.
pub const DEFAULT_SEQUENCE: &[&str] = &[
    "#636efa", "#ef553b", "#00cc96", "#ab63fa", "#ffa15a", "#19d3f3", "#ff6692", "#b6e880",
    "#ff97ff", "#fecb52",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarMode {
    Group,
    Stack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Palette {
    /// Colours assigned to series in order, cycling.
    Sequence(&'static [&'static str]),
    /// Colours keyed by series name.
    Map(&'static [(&'static str, &'static str)]),
}

impl Palette {
    pub fn color_for(&self, key: &str, index: usize) -> &'static str {
        let fallback = DEFAULT_SEQUENCE[index % DEFAULT_SEQUENCE.len()];
        match self {
            Palette::Sequence(colors) if !colors.is_empty() => colors[index % colors.len()],
            Palette::Sequence(_) => fallback,
            Palette::Map(entries) => entries
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, color)| *color)
                .unwrap_or(fallback),
        }
    }
}

/// Declarative bar chart over a [`ResultTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: &'static str,
    pub x: &'static str,
    pub y: &'static str,
    pub color: Option<&'static str>,
    pub palette: Palette,
    pub mode: BarMode,
    pub labels: &'static [(&'static str, &'static str)],
}

impl ChartSpec {
    /// Display label for a field, defaulting to the field name.
    pub fn label<'a>(&'a self, field: &'a str) -> &'a str {
        self.labels
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, label)| *label)
            .unwrap_or(field)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub color: String,
    /// One slot per category; `None` where the series has no bar.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_title: Option<String>,
    pub mode: BarMode,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

impl BarChart {
    pub fn build(spec: &ChartSpec, table: &ResultTable) -> Result<Self, ChartError> {
        let x_index = column(table, spec.x)?;
        let y_index = column(table, spec.y)?;
        let color_index = spec.color.map(|field| column(table, field)).transpose()?;

        let categories: Vec<Value> = table
            .distinct(spec.x)
            .into_iter()
            .filter(|value| !value.is_null())
            .collect();
        if categories.is_empty() {
            return Err(ChartError::NoData);
        }

        let series_keys: Vec<Value> = match spec.color {
            Some(field) => table.distinct(field),
            None => vec![Value::from(spec.label(spec.y))],
        };

        let mut series: Vec<Series> = series_keys
            .iter()
            .enumerate()
            .map(|(index, key)| {
                let name = key.to_string();
                Series {
                    color: spec.palette.color_for(&name, index).to_string(),
                    name,
                    values: vec![None; categories.len()],
                }
            })
            .collect();

        for row in &table.rows {
            let Some(category) = categories.iter().position(|value| *value == row[x_index]) else {
                continue;
            };
            let slot = match color_index {
                Some(index) => series_keys
                    .iter()
                    .position(|key| *key == row[index])
                    .unwrap_or_default(),
                None => 0,
            };
            let amount = match &row[y_index] {
                Value::Null => continue,
                Value::Text(text) => {
                    return Err(ChartError::NonNumeric {
                        column: spec.y.to_string(),
                        value: text.clone(),
                    });
                }
                other => other.as_f64().unwrap_or_default(),
            };
            let cell = &mut series[slot].values[category];
            *cell = Some(cell.unwrap_or_default() + amount);
        }

        Ok(Self {
            title: spec.title.to_string(),
            x_label: spec.label(spec.x).to_string(),
            y_label: spec.label(spec.y).to_string(),
            legend_title: spec.color.map(|field| spec.label(field).to_string()),
            mode: spec.mode,
            categories: categories.iter().map(Value::to_string).collect(),
            series,
        })
    }

    pub fn bar_count(&self) -> usize {
        self.series
            .iter()
            .flat_map(|series| series.values.iter())
            .filter(|value| value.is_some())
            .count()
    }

    /// Value range covered by the bars, always including zero.
    fn extent(&self) -> (f64, f64) {
        let mut low = 0.0f64;
        let mut high = 0.0f64;
        for category in 0..self.categories.len() {
            let values = self.series.iter().filter_map(|series| series.values[category]);
            match self.mode {
                BarMode::Group => {
                    for value in values {
                        low = low.min(value);
                        high = high.max(value);
                    }
                }
                BarMode::Stack => {
                    let (mut below, mut above) = (0.0f64, 0.0f64);
                    for value in values {
                        if value < 0.0 {
                            below += value;
                        } else {
                            above += value;
                        }
                    }
                    low = low.min(below);
                    high = high.max(above);
                }
            }
        }
        if low == high {
            high = low + 1.0;
        }
        (low, high)
    }
}

fn column(table: &ResultTable, field: &str) -> Result<usize, ChartError> {
    table
        .column_index(field)
        .ok_or_else(|| ChartError::MissingColumn(field.to_string()))
}

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 380.0;
const LEFT: f64 = 64.0;
const RIGHT: f64 = 20.0;
const TOP: f64 = 56.0;
const BOTTOM: f64 = 72.0;
const TICKS: usize = 4;

/// Draws the chart as a standalone inline SVG element.
pub fn render_svg(chart: &BarChart) -> String {
    let plot_width = WIDTH - LEFT - RIGHT;
    let plot_height = HEIGHT - TOP - BOTTOM;
    let (low, high) = chart.extent();
    let scale = plot_height / (high - low);
    let y = |value: f64| TOP + (high - value) * scale;

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg class='chart' xmlns='http://www.w3.org/2000/svg' viewBox='0 0 {WIDTH:.0} {HEIGHT:.0}' role='img' aria-label='{}'>",
        escape_text(&chart.title)
    );
    let _ = writeln!(
        svg,
        "  <text class='chart-title' x='{LEFT:.0}' y='24'>{}</text>",
        escape_text(&chart.title)
    );

    for tick in 0..=TICKS {
        let value = low + (high - low) * tick as f64 / TICKS as f64;
        let y_pos = y(value);
        let _ = writeln!(
            svg,
            "  <line class='chart-grid' x1='{LEFT:.0}' y1='{y_pos:.2}' x2='{:.0}' y2='{y_pos:.2}'/>",
            WIDTH - RIGHT
        );
        let _ = writeln!(
            svg,
            "  <text class='chart-label' x='{:.0}' y='{:.2}' text-anchor='end'>{}</text>",
            LEFT - 8.0,
            y_pos + 4.0,
            format_tick(value)
        );
    }

    let band = plot_width / chart.categories.len().max(1) as f64;
    let group_slots = chart.series.len().max(1) as f64;
    for (category, name) in chart.categories.iter().enumerate() {
        let band_x = LEFT + band * category as f64;
        let (mut above, mut below) = (0.0f64, 0.0f64);
        for (slot, series) in chart.series.iter().enumerate() {
            let Some(value) = series.values[category] else {
                continue;
            };
            let (x, width, base) = match chart.mode {
                BarMode::Group => {
                    let width = band * 0.8 / group_slots;
                    (band_x + band * 0.1 + width * slot as f64, width, 0.0)
                }
                BarMode::Stack if value < 0.0 => {
                    below += value;
                    (band_x + band * 0.1, band * 0.8, below - value)
                }
                BarMode::Stack => {
                    above += value;
                    (band_x + band * 0.1, band * 0.8, above - value)
                }
            };
            let top = y((base + value).max(base));
            let height = (y(base) - y(base + value)).abs();
            let _ = writeln!(
                svg,
                "  <rect class='bar' x='{x:.2}' y='{top:.2}' width='{width:.2}' height='{height:.2}' fill='{}'><title>{}: {}</title></rect>",
                escape_text(&series.color),
                escape_text(&format!("{name} · {}", series.name)),
                format_tick(value)
            );
        }
        let _ = writeln!(
            svg,
            "  <text class='chart-label' x='{:.2}' y='{:.0}' text-anchor='middle'>{}</text>",
            band_x + band / 2.0,
            HEIGHT - BOTTOM + 18.0,
            escape_text(name)
        );
    }

    let _ = writeln!(
        svg,
        "  <line class='chart-axis' x1='{LEFT:.0}' y1='{:.2}' x2='{:.0}' y2='{:.2}'/>",
        y(0.0),
        WIDTH - RIGHT,
        y(0.0)
    );
    let _ = writeln!(
        svg,
        "  <text class='chart-axis-title' x='{:.0}' y='{:.0}' text-anchor='middle'>{}</text>",
        LEFT + plot_width / 2.0,
        HEIGHT - 16.0,
        escape_text(&chart.x_label)
    );
    let _ = writeln!(
        svg,
        "  <text class='chart-axis-title' transform='translate(16 {:.0}) rotate(-90)' text-anchor='middle'>{}</text>",
        TOP + plot_height / 2.0,
        escape_text(&chart.y_label)
    );

    if chart.legend_title.is_some() && chart.series.len() > 1 {
        let mut x = LEFT;
        for series in &chart.series {
            let _ = writeln!(
                svg,
                "  <rect class='legend-swatch' x='{x:.0}' y='34' width='10' height='10' fill='{}'/>",
                escape_text(&series.color)
            );
            let _ = writeln!(
                svg,
                "  <text class='chart-label' x='{:.0}' y='43'>{}</text>",
                x + 14.0,
                escape_text(&series.name)
            );
            x += 24.0 + series.name.chars().count() as f64 * 6.5;
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn format_tick(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

pub fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::count_by;

    const KITCHEN: ChartSpec = ChartSpec {
        title: "Conteo",
        x: "ElementoCocina",
        y: "ConteoRegistros",
        color: Some("ElementoCocina"),
        palette: Palette::Sequence(&["#c9eab8"]),
        mode: BarMode::Stack,
        labels: &[("ElementoCocina", "Elemento de Cocina")],
    };

    fn kitchen_rows() -> ResultTable {
        ResultTable::new(
            vec!["ElementoCocina".into()],
            vec![
                vec!["Refrigerator".into()],
                vec!["Refrigerator".into()],
                vec!["Stove".into()],
            ],
        )
    }

    #[test]
    fn counts_become_one_bar_per_category() {
        let counts = count_by(&kitchen_rows(), "ElementoCocina", "ConteoRegistros").unwrap();
        let chart = BarChart::build(&KITCHEN, &counts).unwrap();

        assert_eq!(chart.categories, vec!["Refrigerator", "Stove"]);
        assert_eq!(chart.bar_count(), 2);
        assert_eq!(chart.series[0].values, vec![Some(2.0), None]);
        assert_eq!(chart.series[1].values, vec![None, Some(1.0)]);
        assert!(chart.series.iter().all(|series| series.color == "#c9eab8"));
        assert_eq!(chart.x_label, "Elemento de Cocina");
        assert_eq!(chart.y_label, "ConteoRegistros");
    }

    #[test]
    fn null_measures_leave_gaps_instead_of_failing() {
        let spec = ChartSpec {
            color: None,
            y: "PromedioHuella",
            x: "TipoDeTransporte",
            ..KITCHEN
        };
        let table = ResultTable::new(
            vec!["TipoDeTransporte".into(), "PromedioHuella".into()],
            vec![
                vec!["public".into(), Value::Real(1200.5)],
                vec!["walk".into(), Value::Null],
            ],
        );
        let chart = BarChart::build(&spec, &table).unwrap();

        assert_eq!(chart.categories.len(), 2);
        assert_eq!(chart.bar_count(), 1);
        assert_eq!(render_svg(&chart).matches("<rect class='bar'").count(), 1);
    }

    #[test]
    fn missing_columns_and_empty_tables_fail() {
        assert_eq!(
            BarChart::build(&KITCHEN, &ResultTable::default()),
            Err(ChartError::MissingColumn("ElementoCocina".into()))
        );
        let empty = ResultTable::new(
            vec!["ElementoCocina".into(), "ConteoRegistros".into()],
            Vec::new(),
        );
        assert_eq!(BarChart::build(&KITCHEN, &empty), Err(ChartError::NoData));
    }

    #[test]
    fn map_palette_falls_back_to_default_sequence() {
        let palette = Palette::Map(&[("DailyHourTVPC", "#97c182")]);
        assert_eq!(palette.color_for("DailyHourTVPC", 3), "#97c182");
        assert_eq!(palette.color_for("other", 1), DEFAULT_SEQUENCE[1]);
    }

    #[test]
    fn svg_escapes_labels() {
        let table = ResultTable::new(
            vec!["ElementoCocina".into(), "ConteoRegistros".into()],
            vec![vec!["Pots & <Pans>".into(), Value::Integer(1)]],
        );
        let svg = render_svg(&BarChart::build(&KITCHEN, &table).unwrap());
        assert!(svg.contains("Pots &amp; &lt;Pans&gt;"));
        assert!(!svg.contains("<Pans>"));
    }
}
