use crate::chart::{escape_text as escape, render_svg};
use crate::config::{Layout, PAGE};
use crate::models::{ResultTable, Value, ViewOutput, Warning, WarningKind};
use crate::views::{FilterSpec, ViewId};
use std::fmt::Write;

pub fn render_page(output: &ViewOutput) -> String {
    let descriptor = output.view.descriptor();
    let (query_warnings, chart_warnings): (Vec<&Warning>, Vec<&Warning>) = output
        .warnings
        .iter()
        .partition(|warning| warning.kind == WarningKind::Query);

    let filter = descriptor
        .filter
        .as_ref()
        .map(|spec| render_filter(output.view, spec, output.filter.as_deref()))
        .unwrap_or_default();

    let chart = match &output.chart {
        Some(chart) => render_svg(chart),
        None => String::new(),
    };

    let layout = match PAGE.layout {
        Layout::Wide => "wide",
        Layout::Centered => "centered",
    };
    let sidebar = if PAGE.sidebar_expanded {
        "expanded"
    } else {
        "collapsed"
    };

    fill(
        INDEX_HTML,
        &[
            ("TITLE", escape(PAGE.title)),
            ("ICON", PAGE.icon.to_string()),
            ("LAYOUT", layout.to_string()),
            ("SIDEBAR", sidebar.to_string()),
            ("SIDEBAR_TITLE", escape(PAGE.sidebar_title)),
            ("NAV_PROMPT", escape(PAGE.nav_prompt)),
            ("NAV", render_nav(output.view)),
            ("FOOTER", escape(PAGE.footer)),
            ("HEADER", escape(output.header)),
            ("QUERY_WARNINGS", render_warnings(&query_warnings)),
            ("FILTER", filter),
            ("TABLE_TITLE", subheader(output.table_title)),
            ("TABLE", render_table(&output.table)),
            ("CHART_TITLE", subheader(output.chart_title)),
            ("CHART_WARNINGS", render_warnings(&chart_warnings)),
            ("CHART", chart),
            (
                "RENDERED_AT",
                output.rendered_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
        ],
    )
}

/// Substitutes `{{KEY}}` markers in one pass, so inserted content is never rescanned.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match values.iter().find(|(name, _)| *name == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn render_nav(active: ViewId) -> String {
    let mut html = String::new();
    for view in ViewId::ALL {
        let checked = if view == active { " checked" } else { "" };
        let _ = writeln!(
            html,
            "<label class=\"nav-option\"><input type=\"radio\" name=\"view\" value=\"{}\"{checked} onchange=\"this.form.submit()\" /> {}</label>",
            view.slug(),
            escape(view.descriptor().label)
        );
    }
    html
}

fn render_filter(view: ViewId, spec: &FilterSpec, current: Option<&str>) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<form class=\"filter\" method=\"get\" action=\"/\">");
    let _ = writeln!(
        html,
        "<input type=\"hidden\" name=\"view\" value=\"{}\" />",
        view.slug()
    );
    match spec {
        FilterSpec::IntegerId {
            heading, prompt, ..
        } => {
            let _ = writeln!(html, "<h3>{}</h3>", escape(heading));
            let _ = writeln!(
                html,
                "<label>{}<input type=\"text\" name=\"filter\" value=\"{}\" inputmode=\"numeric\" /></label>",
                escape(prompt),
                escape(current.unwrap_or_default())
            );
        }
        FilterSpec::Choice {
            prompt,
            all,
            options,
            ..
        } => {
            let _ = writeln!(
                html,
                "<label>{}<select name=\"filter\" onchange=\"this.form.submit()\">",
                escape(prompt)
            );
            let selected = current.unwrap_or(*all);
            for option in std::iter::once(all).chain(options.iter()) {
                let marker = if *option == selected { " selected" } else { "" };
                let _ = writeln!(
                    html,
                    "<option value=\"{0}\"{marker}>{0}</option>",
                    escape(option)
                );
            }
            let _ = writeln!(html, "</select></label>");
        }
    }
    let _ = writeln!(html, "</form>");
    html
}

fn render_table(table: &ResultTable) -> String {
    if table.columns.is_empty() {
        return "<p class=\"empty\">Sin datos</p>".to_string();
    }

    let mut html = String::from("<div class=\"table-wrap\"><table>\n<thead><tr><th></th>");
    for column in &table.columns {
        let _ = write!(html, "<th>{}</th>", escape(column));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for (index, row) in table.rows.iter().enumerate() {
        let _ = write!(html, "<tr><th>{index}</th>");
        for cell in row {
            match cell {
                Value::Null => html.push_str("<td class=\"null\"></td>"),
                Value::Integer(_) | Value::Real(_) => {
                    let _ = write!(html, "<td class=\"num\">{cell}</td>");
                }
                Value::Text(text) => {
                    let _ = write!(html, "<td>{}</td>", escape(text));
                }
            }
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table></div>");
    html
}

fn render_warnings(warnings: &[&Warning]) -> String {
    warnings
        .iter()
        .map(|warning| {
            format!(
                "<div class=\"warning\" role=\"alert\">{}</div>\n",
                escape(&warning.message)
            )
        })
        .collect()
}

fn subheader(title: Option<&str>) -> String {
    title
        .map(|title| format!("<h3>{}</h3>", escape(title)))
        .unwrap_or_default()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>{{TITLE}}</title>
  <link rel="icon" href="data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>{{ICON}}</text></svg>" />
  <style>
    :root {
      --bg: #f7faf5;
      --sidebar: #eef5e9;
      --ink: #22302a;
      --muted: #66756d;
      --accent: #97c182;
      --accent-soft: #c9eab8;
      --warn-bg: #fdecea;
      --warn-ink: #a8322a;
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      display: flex;
      background: var(--bg);
      color: var(--ink);
      font-family: "Source Sans Pro", "Segoe UI", sans-serif;
    }

    .sidebar {
      width: 280px;
      flex-shrink: 0;
      background: var(--sidebar);
      padding: 24px 20px;
      display: flex;
      flex-direction: column;
      gap: 16px;
      transition: margin-left 200ms ease;
    }

    body[data-sidebar="collapsed"] .sidebar {
      margin-left: -280px;
    }

    .sidebar img {
      width: 100%;
      border-radius: 12px;
    }

    .sidebar h2 {
      margin: 0;
      font-size: 1.4rem;
    }

    .nav-option {
      display: block;
      padding: 6px 0;
      cursor: pointer;
    }

    .toggle {
      position: fixed;
      top: 12px;
      left: 12px;
      border: none;
      background: white;
      border-radius: 8px;
      padding: 4px 10px;
      cursor: pointer;
      box-shadow: 0 2px 6px rgba(0, 0, 0, 0.12);
    }

    main {
      flex: 1;
      padding: 32px 40px;
      margin: 0 auto;
    }

    body[data-layout="centered"] main {
      max-width: 760px;
    }

    .columns {
      display: grid;
      grid-template-columns: 1fr 1fr;
      gap: 24px;
      align-items: start;
    }

    .table-wrap {
      max-height: 420px;
      overflow: auto;
      border: 1px solid #dde6d8;
      border-radius: 8px;
      background: white;
    }

    table {
      border-collapse: collapse;
      width: 100%;
      font-size: 0.9rem;
    }

    th,
    td {
      padding: 4px 10px;
      border-bottom: 1px solid #eef2ec;
      text-align: left;
      white-space: nowrap;
    }

    thead th {
      position: sticky;
      top: 0;
      background: #f3f7f0;
    }

    tbody th {
      color: var(--muted);
      font-weight: normal;
    }

    td.num {
      text-align: right;
      font-variant-numeric: tabular-nums;
    }

    .warning {
      background: var(--warn-bg);
      color: var(--warn-ink);
      border-radius: 8px;
      padding: 10px 14px;
      margin: 8px 0;
    }

    .empty {
      color: var(--muted);
    }

    .chart {
      width: 100%;
      background: white;
      border-radius: 8px;
    }

    .chart-title {
      font-size: 16px;
      font-weight: 600;
      fill: var(--ink);
    }

    .chart-grid {
      stroke: #e3ebdf;
    }

    .chart-axis {
      stroke: #9aa89f;
    }

    .chart-label,
    .chart-axis-title {
      fill: var(--muted);
      font-size: 11px;
    }

    .rendered {
      margin-top: 32px;
      font-size: 0.8rem;
      color: var(--muted);
    }

    @media (max-width: 900px) {
      .columns {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
<body data-layout="{{LAYOUT}}" data-sidebar="{{SIDEBAR}}">
  <button class="toggle" type="button" id="toggle" aria-label="Menú">☰</button>
  <aside class="sidebar">
    <img src="/logo" alt="" onerror="this.remove()" />
    <h2>{{SIDEBAR_TITLE}}</h2>
    <form method="get" action="/">
      <p>{{NAV_PROMPT}}</p>
      {{NAV}}
    </form>
    <h3>{{FOOTER}}</h3>
  </aside>

  <main>
    <h1>{{HEADER}}</h1>
    {{QUERY_WARNINGS}}
    {{FILTER}}
    <section class="columns">
      <div>
        {{TABLE_TITLE}}
        {{TABLE}}
      </div>
      <div>
        {{CHART_TITLE}}
        {{CHART_WARNINGS}}
        {{CHART}}
      </div>
    </section>
    <p class="rendered">{{RENDERED_AT}}</p>
  </main>

  <script>
    document.getElementById('toggle').addEventListener('click', () => {
      const body = document.body;
      body.dataset.sidebar = body.dataset.sidebar === 'collapsed' ? 'expanded' : 'collapsed';
    });
  </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{BarChart, BarMode};
    use crate::views::KITCHEN_EFFICIENCY;
    use chrono::Local;

    fn output(view: ViewId, table: ResultTable, warnings: Vec<Warning>) -> ViewOutput {
        let descriptor = view.descriptor();
        ViewOutput {
            view,
            label: descriptor.label,
            header: descriptor.header,
            table_title: descriptor.table_title,
            chart_title: descriptor.chart_title,
            filter: None,
            table,
            aggregate: None,
            chart_spec: descriptor.chart.clone(),
            chart: None,
            warnings,
            rendered_at: Local::now(),
        }
    }

    #[test]
    fn fill_does_not_rescan_inserted_values() {
        let html = fill("<p>{{A}}{{B}}{{C}}</p>", &[("A", "{{B}}".into()), ("B", "b".into())]);
        assert_eq!(html, "<p>{{B}}b{{C}}</p>");
    }

    #[test]
    fn page_has_chrome_nav_and_blank_nulls() {
        let table = ResultTable::new(
            vec!["IDPersona".into(), "ElementoCocina".into()],
            vec![vec![Value::Integer(7), Value::Null]],
        );
        let mut page = output(ViewId::KitchenEfficiency, table, Vec::new());
        page.filter = Some("7".into());
        page.chart = Some(BarChart {
            title: "Conteo".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            legend_title: None,
            mode: BarMode::Stack,
            categories: vec!["Stove".into()],
            series: Vec::new(),
        });
        let html = render_page(&page);

        assert!(html.contains("<title>Huella de Carbono</title>"));
        assert!(html.contains("Menú de Navegación"));
        assert!(html.contains("Reduce tu huella de carbono"));
        assert!(html.contains(KITCHEN_EFFICIENCY.header));
        assert!(html.contains("value=\"cocina\" checked"));
        assert!(html.contains("name=\"filter\" value=\"7\""));
        assert!(html.contains("<td class=\"null\"></td>"));
        assert!(html.contains("<svg class='chart'"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn warnings_are_visible_and_escaped() {
        let page = output(
            ViewId::ActivityHours,
            ResultTable::default(),
            vec![
                Warning::query("no such table: <x>"),
                Warning::chart("column `Sex` not found"),
            ],
        );
        let html = render_page(&page);

        assert!(html.contains("Error al cargar los datos: no such table: &lt;x&gt;"));
        assert!(html.contains("Error al procesar el gráfico"));
        assert!(html.contains("Sin datos"));
        assert!(html.contains("<option value=\"Todos\" selected>"));
    }
}
