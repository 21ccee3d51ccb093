use crate::aggregate::{Aggregation, Melt};
use crate::chart::{BarMode, ChartSpec, Palette};
use crate::errors::AppError;
use crate::models::{FilterCriterion, ResultTable, Value, ViewSummary};
use serde::Serialize;

const MINT: &[&str] = &["#c9eab8"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewId {
    #[serde(rename = "cocina")]
    KitchenEfficiency,
    #[serde(rename = "actividad")]
    ActivityHours,
    #[serde(rename = "promedio-transporte")]
    TransportAverageByFrequency,
    #[serde(rename = "huella-transporte")]
    TransportAverageByType,
}

impl ViewId {
    /// Menu order; the first entry is the landing view.
    pub const ALL: [ViewId; 4] = [
        ViewId::KitchenEfficiency,
        ViewId::ActivityHours,
        ViewId::TransportAverageByFrequency,
        ViewId::TransportAverageByType,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ViewId::KitchenEfficiency => "cocina",
            ViewId::ActivityHours => "actividad",
            ViewId::TransportAverageByFrequency => "promedio-transporte",
            ViewId::TransportAverageByType => "huella-transporte",
        }
    }

    pub fn from_slug(slug: &str) -> Option<ViewId> {
        Self::ALL.into_iter().find(|view| view.slug() == slug)
    }

    pub fn descriptor(self) -> &'static ViewDescriptor {
        match self {
            ViewId::KitchenEfficiency => &KITCHEN_EFFICIENCY,
            ViewId::ActivityHours => &ACTIVITY_HOURS,
            ViewId::TransportAverageByFrequency => &TRANSPORT_BY_FREQUENCY,
            ViewId::TransportAverageByType => &TRANSPORT_BY_TYPE,
        }
    }

    pub fn summary(self) -> ViewSummary {
        ViewSummary {
            slug: self.slug(),
            label: self.descriptor().label,
        }
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::ALL[0]
    }
}

/// User-facing control that narrows the table (never the chart).
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    /// Free-text field whose content must parse as an integer.
    IntegerId {
        column: &'static str,
        heading: &'static str,
        prompt: &'static str,
    },
    /// Drop-down of fixed values plus an escape value that disables the filter.
    Choice {
        column: &'static str,
        prompt: &'static str,
        all: &'static str,
        options: &'static [&'static str],
    },
}

impl FilterSpec {
    /// Blank input means "no filter".
    pub fn parse(&self, raw: Option<&str>) -> Result<Option<FilterCriterion>, AppError> {
        let raw = raw.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(None);
        }

        match self {
            FilterSpec::IntegerId { column, .. } => raw
                .parse::<i64>()
                .map(|id| Some(FilterCriterion::new(*column, Value::Integer(id))))
                .map_err(|_| AppError::bad_request(format!("{column} must be an integer"))),
            FilterSpec::Choice {
                column,
                all,
                options,
                ..
            } => {
                if raw == *all {
                    Ok(None)
                } else if options.contains(&raw) {
                    Ok(Some(FilterCriterion::new(*column, raw)))
                } else {
                    Err(AppError::bad_request(format!(
                        "{column} must be one of {all}, {}",
                        options.join(", ")
                    )))
                }
            }
        }
    }
}

/// Column fix-ups applied to every fetch of a view, before filtering or charting.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    Rename(&'static [(&'static str, &'static str)]),
    CoerceNumeric(&'static str),
}

/// Where the chart reads its rows from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSource {
    /// A second, unfiltered fetch of the same query.
    Refetch,
    /// The unfiltered rows already fetched for the table.
    Reuse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewDescriptor {
    pub id: ViewId,
    pub label: &'static str,
    pub header: &'static str,
    pub query: &'static str,
    pub filter: Option<FilterSpec>,
    pub transforms: &'static [Transform],
    pub table_title: Option<&'static str>,
    pub chart_title: Option<&'static str>,
    pub chart_source: ChartSource,
    pub aggregation: Aggregation,
    pub chart: ChartSpec,
}

impl ViewDescriptor {
    pub fn prepare(&self, table: ResultTable) -> ResultTable {
        self.transforms
            .iter()
            .fold(table, |table, transform| match transform {
                Transform::Rename(renames) => table.rename_columns(renames),
                Transform::CoerceNumeric(column) => table.coerce_numeric(column),
            })
    }
}

pub static KITCHEN_EFFICIENCY: ViewDescriptor = ViewDescriptor {
    id: ViewId::KitchenEfficiency,
    label: "Cocina y eficiencia",
    header: "Cocina y Eficiencia Energética",
    query: "SELECT * FROM cocina_eficiencia_huella",
    filter: Some(FilterSpec::IntegerId {
        column: "IDPersona",
        heading: "Buscar por ID de Persona",
        prompt: "Ingresa el IDPersona:",
    }),
    transforms: &[],
    table_title: Some("Tabla Elementos Cocina"),
    chart_title: Some("Conteo de Registros por Elemento de Cocina"),
    chart_source: ChartSource::Refetch,
    aggregation: Aggregation::Count {
        by: "ElementoCocina",
        count_column: "ConteoRegistros",
    },
    chart: ChartSpec {
        title: "Conteo de Registros por Elemento de Cocina",
        x: "ElementoCocina",
        y: "ConteoRegistros",
        color: Some("ElementoCocina"),
        palette: Palette::Sequence(MINT),
        mode: BarMode::Stack,
        labels: &[
            ("ElementoCocina", "Elemento de Cocina"),
            ("ConteoRegistros", "Número de Registros"),
        ],
    },
};

pub static ACTIVITY_HOURS: ViewDescriptor = ViewDescriptor {
    id: ViewId::ActivityHours,
    label: "Horas de actividad",
    header: "Horas de Actividad y Uso de Tecnología",
    query: "SELECT * FROM horas_actividad_otro",
    filter: Some(FilterSpec::Choice {
        column: "Sex",
        prompt: "Selecciona el género:",
        all: "Todos",
        options: &["male", "female"],
    }),
    transforms: &[],
    table_title: None,
    chart_title: Some("Gráfico de Horas de Internet y TV por Género"),
    chart_source: ChartSource::Refetch,
    aggregation: Aggregation::Mean {
        by: "Sex",
        measures: &["DailyHourTVPC", "DailyHourInternrt"],
        melt: Some(Melt {
            var_name: "Actividad",
            value_name: "Horas Promedio",
        }),
    },
    chart: ChartSpec {
        title: "Promedio de Horas de TV e Internet por Género",
        x: "Sex",
        y: "Horas Promedio",
        color: Some("Actividad"),
        palette: Palette::Map(&[
            ("DailyHourTVPC", "#97c182"),
            ("DailyHourInternrt", "#c9eab8"),
            ("female", "#ff7f0e"),
            ("male", "#ffbb78"),
        ]),
        mode: BarMode::Group,
        labels: &[
            ("Sex", "Género"),
            ("Horas Promedio", "Horas Promedio"),
            ("Actividad", "Actividad"),
        ],
    },
};

const TRANSPORT_LABELS: &[(&str, &str)] = &[
    ("TipoDeTransporte", "Tipo de Transporte"),
    ("PromedioHuella", "Promedio de Huella de Carbono"),
];

pub static TRANSPORT_BY_TYPE: ViewDescriptor = ViewDescriptor {
    id: ViewId::TransportAverageByType,
    label: "Huella por transporte",
    header: "Huella de Carbono por Transporte",
    query: "SELECT * FROM huella_carbono_por_transporte",
    filter: None,
    transforms: &[
        Transform::Rename(&[
            ("TipoDeTransporte", "TipoDeTransporte"),
            ("PromedioHuellaCarbono", "PromedioHuella"),
        ]),
        Transform::CoerceNumeric("PromedioHuella"),
    ],
    table_title: None,
    chart_title: Some("Gráfico de Huella de Carbono por Transporte"),
    chart_source: ChartSource::Reuse,
    aggregation: Aggregation::Identity,
    chart: ChartSpec {
        title: "Huella de Carbono por Transporte",
        x: "TipoDeTransporte",
        y: "PromedioHuella",
        color: Some("TipoDeTransporte"),
        palette: Palette::Sequence(MINT),
        mode: BarMode::Stack,
        labels: TRANSPORT_LABELS,
    },
};

// Travel frequency is displayed under the transport-type column name and labels.
pub static TRANSPORT_BY_FREQUENCY: ViewDescriptor = ViewDescriptor {
    id: ViewId::TransportAverageByFrequency,
    label: "Promedio de transporte",
    header: "Promedio de Huella de Carbono por Frecuencia de Viajes",
    query: "SELECT * FROM promedio_transporte",
    filter: None,
    transforms: &[
        Transform::Rename(&[
            ("FrecuencyTraveling", "TipoDeTransporte"),
            ("PromedioHuellaCarbono", "PromedioHuella"),
        ]),
        Transform::CoerceNumeric("PromedioHuella"),
    ],
    table_title: None,
    chart_title: None,
    chart_source: ChartSource::Reuse,
    aggregation: Aggregation::Identity,
    chart: ChartSpec {
        title: "Huella de Carbono por Tipo de Transporte",
        x: "TipoDeTransporte",
        y: "PromedioHuella",
        color: Some("TipoDeTransporte"),
        palette: Palette::Sequence(MINT),
        mode: BarMode::Stack,
        labels: TRANSPORT_LABELS,
    },
};
