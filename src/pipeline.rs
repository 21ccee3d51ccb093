use crate::chart::BarChart;
use crate::errors::AppError;
use crate::models::{ResultTable, ViewOutput, Warning};
use crate::storage::{load_table, Database};
use crate::views::{ChartSource, ViewDescriptor, ViewId};
use chrono::Local;
use tracing::warn;

/// fetch → transform → filter (table only) → aggregate → chart, for one view.
pub struct Pipeline {
    descriptor: &'static ViewDescriptor,
}

impl Pipeline {
    pub fn for_view(view: ViewId) -> Self {
        Self {
            descriptor: view.descriptor(),
        }
    }

    pub async fn run(&self, db: &Database, raw_filter: Option<&str>) -> Result<ViewOutput, AppError> {
        let view = self.descriptor;
        let criterion = match &view.filter {
            Some(spec) => spec.parse(raw_filter)?,
            None => None,
        };

        let mut warnings = Vec::new();
        let fetched = self.fetch(db, &mut warnings).await;
        let chart_input = match view.chart_source {
            ChartSource::Reuse => fetched.clone(),
            ChartSource::Refetch => self.fetch(db, &mut warnings).await,
        };

        let table = match &criterion {
            Some(criterion) => fetched.filter(criterion),
            None => fetched,
        };

        let charted = view
            .aggregation
            .apply(&chart_input)
            .and_then(|aggregate| {
                let chart = BarChart::build(&view.chart, &aggregate)?;
                Ok((aggregate, chart))
            });
        let (aggregate, chart) = match charted {
            Ok((aggregate, chart)) => (Some(aggregate), Some(chart)),
            Err(err) => {
                warn!(view = view.id.slug(), "chart unavailable: {err}");
                warnings.push(Warning::chart(err));
                (None, None)
            }
        };

        Ok(ViewOutput {
            view: view.id,
            label: view.label,
            header: view.header,
            table_title: view.table_title,
            chart_title: view.chart_title,
            filter: criterion.map(|criterion| criterion.literal.to_string()),
            table,
            aggregate,
            chart_spec: view.chart.clone(),
            chart,
            warnings,
            rendered_at: Local::now(),
        })
    }

    async fn fetch(&self, db: &Database, warnings: &mut Vec<Warning>) -> ResultTable {
        let (table, warning) = load_table(db, self.descriptor.query).await;
        warnings.extend(warning);
        self.descriptor.prepare(table)
    }
}
