//! Chart page and fragment templates.
//!
//! Two documents are rendered with Tera:
//!
//! - the **page**: a standalone HTML document drawing one chart, loaded by the
//!   render service and snapshotted to SVG;
//! - the **fragment**: the embeddable HTML returned to the platform when no
//!   pre-rendered file is requested.
//!
//! Both ship built in and can be replaced per engine with
//! [`TeraTemplateEngine::with_template`].

use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tera::{Context as TeraContext, Tera};
use tracing::debug;

use crate::core::ChartError;

/// Which document to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartTemplate {
    /// Standalone document for the render service.
    Page,
    /// Embeddable fragment for the platform's record page.
    Fragment,
}

impl ChartTemplate {
    /// Template name; the `.html` suffix turns on Tera's autoescaping.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Page => "chart_page.html",
            Self::Fragment => "chart_fragment.html",
        }
    }

    const fn builtin(self) -> &'static str {
        match self {
            Self::Page => PAGE_TEMPLATE,
            Self::Fragment => FRAGMENT_TEMPLATE,
        }
    }
}

impl fmt::Display for ChartTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Renders chart documents from a JSON context.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: ChartTemplate, context: &Value) -> Result<String>;
}

/// [`TemplateEngine`] backed by Tera.
#[derive(Debug, Clone, Default)]
pub struct TeraTemplateEngine {
    overrides: HashMap<ChartTemplate, String>,
}

impl TeraTemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `source` instead of the built-in template for `template`.
    #[must_use]
    pub fn with_template(mut self, template: ChartTemplate, source: impl Into<String>) -> Self {
        self.overrides.insert(template, source.into());
        self
    }

    fn source(&self, template: ChartTemplate) -> &str {
        self.overrides.get(&template).map_or(template.builtin(), String::as_str)
    }
}

impl TemplateEngine for TeraTemplateEngine {
    fn render(&self, template: ChartTemplate, context: &Value) -> Result<String> {
        let template_error = |e: tera::Error| ChartError::TemplateError {
            template: template.name().to_string(),
            message: format_tera_error(&e),
        };

        // Fresh instance per render, no state shared between requests
        let mut tera = Tera::default();
        tera.add_raw_template(template.name(), self.source(template)).map_err(template_error)?;

        let context = TeraContext::from_serialize(context).map_err(template_error)?;
        let rendered = tera.render(template.name(), &context).map_err(template_error)?;

        debug!(template = %template, bytes = rendered.len(), "Rendered chart template");
        Ok(rendered)
    }
}

/// Flatten a Tera error and its sources into one line.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        let message = err.to_string();
        if !messages.contains(&message) {
            messages.push(message);
        }
        current = err.source();
    }
    messages.join(": ")
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<script src="{{ chart_script_url }}"></script>
</head>
<body class="linegraph-theme-{{ theme }}">
<div id="{{ element_id }}" class="linegraph-chart" style="width: {{ display.width }}px; height: {{ display.height }}px;"></div>
<script type="application/json" id="{{ element_id }}_data">{{ series | json_encode() | safe }}</script>
<script>
linegraph.draw("{{ element_id }}", {
    title: {{ title | json_encode() | safe }},
    width: {{ display.width }},
    height: {{ display.height }},
    xAxisCaption: {{ display.x_axis_caption | json_encode() | safe }},
    yAxisCaption: {{ display.y_axis_caption | json_encode() | safe }}
});
</script>
</body>
</html>
"#;

const FRAGMENT_TEMPLATE: &str = r#"<div class="linegraph linegraph-theme-{{ theme }}" data-datatype="{{ datatype_id }}">
<script src="{{ chart_script_url }}"></script>
{% for chart in charts %}
<div class="linegraph-record" data-record="{{ chart.record_id }}" data-rank="{{ chart.rank }}">
  <h4>{{ chart.label }}</h4>
  <div id="{{ chart.element_id }}" class="linegraph-chart" style="width: {{ display.width }}px; height: {{ display.height }}px;"></div>
  <script type="application/json" id="{{ chart.element_id }}_data">{{ chart.series | json_encode() | safe }}</script>
  {% if chart.svg_url %}<a class="linegraph-download" href="{{ chart.svg_url }}">SVG</a>{% endif %}
</div>
{% endfor %}
{% if show_rollup %}
<div class="linegraph-record linegraph-rollup" data-record="rollup">
  <h4>{{ rollup.label }}</h4>
  <div id="{{ rollup.element_id }}" class="linegraph-chart" style="width: {{ display.width }}px; height: {{ display.height }}px;"></div>
  <script type="application/json" id="{{ rollup.element_id }}_data">{{ rollup.series | json_encode() | safe }}</script>
  {% if rollup.svg_url %}<a class="linegraph-download" href="{{ rollup.svg_url }}">SVG</a>{% endif %}
</div>
{% endif %}
</div>
"#;
