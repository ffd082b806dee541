//! Template interpolation for load targets
//!
//! Handles `{{ variable }}` interpolation in object URIs and table names,
//! e.g. `gs://{{ bucket }}/albums-full-info-{{ num }}`.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable }}
static TEMPLATE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}").unwrap());

/// Variables available to a template
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.vars.insert(name.into(), value.to_string());
        self
    }

    /// Set a variable in place
    pub fn set(&mut self, name: impl Into<String>, value: impl ToString) -> &mut Self {
        self.vars.insert(name.into(), value.to_string());
        self
    }

    /// Get a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }
}

/// Render a template string with the given context
///
/// Every referenced variable must be defined; undefined names are reported
/// together in a single error.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut errors = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match ctx.get(name) {
            Some(value) => value.to_string(),
            None => {
                errors.push(name.to_string());
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple() {
        let ctx = TemplateContext::new()
            .with("bucket", "prefect-gcs-bucket-bandcamp")
            .with("num", 2);
        let out = render("gs://{{ bucket }}/albums-full-info-{{num}}", &ctx).unwrap();
        assert_eq!(out, "gs://prefect-gcs-bucket-bandcamp/albums-full-info-2");
    }

    #[test]
    fn test_render_repeated_variable() {
        let ctx = TemplateContext::new().with("year", 2019);
        let out = render("{{ year }}/{{ year }}", &ctx).unwrap();
        assert_eq!(out, "2019/2019");
    }

    #[test]
    fn test_render_undefined_variables() {
        let ctx = TemplateContext::new().with("num", 1);
        let err = render("{{ bucket }}/{{ num }}/{{ month }}", &ctx).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Undefined variable in template: bucket, month"
        );
    }

    #[test]
    fn test_render_without_templates() {
        let ctx = TemplateContext::new();
        assert_eq!(render("plain", &ctx).unwrap(), "plain");
        assert!(!has_templates("plain"));
        assert!(has_templates("a-{{ num }}"));
    }

    #[test]
    fn test_extract_variables() {
        let vars = extract_variables("gs://{{ bucket }}/fhv_{{ year }}-{{ month }}.parquet");
        assert_eq!(vars, vec!["bucket", "year", "month"]);
    }
}
