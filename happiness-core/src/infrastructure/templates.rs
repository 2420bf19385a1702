// happiness-core/src/infrastructure/templates.rs
//
// Dashboard pages. Templates are compiled into the binary.

use minijinja::{Environment, Value};
use serde::Serialize;

use crate::domain::naming::label;
use crate::infrastructure::error::InfrastructureError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("macros.html", include_str!("../../templates/macros.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("dataset.html", include_str!("../../templates/dataset.html")),
    ("distribution.html", include_str!("../../templates/distribution.html")),
    ("relationship.html", include_str!("../../templates/relationship.html")),
    ("geo.html", include_str!("../../templates/geo.html")),
    ("trends.html", include_str!("../../templates/trends.html")),
    ("averages.html", include_str!("../../templates/averages.html")),
];

/// Numbers to 3 decimals; none renders empty.
fn num(value: Value) -> String {
    if value.is_none() || value.is_undefined() {
        return String::new();
    }
    match f64::try_from(value.clone()) {
        Ok(v) => format!("{v:.3}"),
        Err(_) => value.to_string(),
    }
}

pub struct PageRenderer {
    env: Environment<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, InfrastructureError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        env.add_filter("label", |value: Value| label(&value.to_string()));
        env.add_filter("num", num);
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String, InfrastructureError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(context)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use minijinja::context;

    #[test]
    fn test_every_template_parses() -> Result<()> {
        let renderer = PageRenderer::new()?;
        for (name, _) in TEMPLATES {
            assert!(renderer.env.get_template(name).is_ok(), "{name}");
        }
        Ok(())
    }

    #[test]
    fn test_filters() -> Result<()> {
        let renderer = PageRenderer::new()?;
        let out = renderer.env.render_str(
            "{{ 'ladder_score' | label }} {{ 7.61234 | num }} {{ none | num }}|",
            context! {},
        )?;
        assert_eq!(out, "Ladder Score 7.612 |");
        Ok(())
    }

    #[test]
    fn test_select_macro_marks_selection() -> Result<()> {
        let renderer = PageRenderer::new()?;
        let out = renderer.env.render_str(
            r#"{% import "macros.html" as m %}{{ m.select("region", ["A", "B"], ["B"], true) }}"#,
            context! {},
        )?;
        assert!(out.contains(r#"<option value="B" selected>"#));
        assert!(!out.contains(r#"<option value="A" selected>"#));
        Ok(())
    }
}
