//! Compiles handlebars query templates into reusable [QueryTemplate]s.
//!
//! Next to plain variable substitution, the following helpers are available to templates:
//!
//! - `{{filter-by-iri}}` renders `FILTER (?iri = <x>)` for a single identifier and
//!   `FILTER (?iri IN (<a>, <b>))` for a list. Without an argument it uses the `iri` variable.
//! - `{{join ", " values}}` joins a single value or a list with a separator.
//! - `{{as-iriref values}}` wraps every value in angle brackets.
//! - `{{as-string values}}` quotes every value as a string literal.

use crate::error::TemplateError;
use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperResult, JsonValue, Output, RenderContext,
};
use regex::Regex;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock};

const TEMPLATE_NAME: &str = "query";

const BUILTIN_HELPERS: [&str; 17] = [
    "if", "unless", "each", "with", "lookup", "log", "raw", "else", "eq", "ne", "gt", "gte", "lt",
    "lte", "and", "or", "not",
];

const GATEWAY_HELPERS: [&str; 4] = ["filter-by-iri", "join", "as-iriref", "as-string"];

static MUSTACHE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("valid regex"));
static SUBEXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*([A-Za-z_][\w\-]*)\s+[^)\s]").expect("valid regex"));

/// Turns template text into [QueryTemplate]s.
///
/// A single compiler is created at startup. Every compiled template shares the helpers registered
/// on it.
pub struct TemplateCompiler {
    registry: Handlebars<'static>,
}

impl Default for TemplateCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCompiler {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("filter-by-iri", Box::new(filter_by_iri));
        registry.register_helper("join", Box::new(join_helper));
        registry.register_helper("as-iriref", Box::new(as_iriref_helper));
        registry.register_helper("as-string", Box::new(as_string_helper));
        Self { registry }
    }

    /// Compiles `text` into a [QueryTemplate].
    ///
    /// Fails if `text` is not valid handlebars or calls a helper that does not exist.
    pub fn compile(&self, text: &str) -> Result<QueryTemplate, TemplateError> {
        let mut registry = self.registry.clone();
        registry
            .register_template_string(TEMPLATE_NAME, text)
            .map_err(|e| TemplateError::Syntax(Box::new(e)))?;
        check_helpers(text)?;
        Ok(QueryTemplate {
            registry: Arc::new(registry),
        })
    }
}

/// A compiled query template. Rendering is pure and the template can be shared between threads.
#[derive(Clone)]
pub struct QueryTemplate {
    registry: Arc<Handlebars<'static>>,
}

impl QueryTemplate {
    /// Renders a concrete query from the argument record `args`.
    pub fn render(&self, args: &JsonValue) -> Result<String, TemplateError> {
        self.registry
            .render(TEMPLATE_NAME, args)
            .map_err(|e| TemplateError::Render(Box::new(e)))
    }
}

impl Debug for QueryTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryTemplate").finish_non_exhaustive()
    }
}

/// Rejects calls of helpers that are neither built in nor registered by the gateway.
fn check_helpers(text: &str) -> Result<(), TemplateError> {
    for mustache in MUSTACHE.captures_iter(text) {
        let content = mustache[1].trim_matches(|c: char| c == '{' || c == '}' || c == '~');
        let content = content.trim();
        if content.starts_with(['!', '>', '/', '*']) {
            continue;
        }
        let content = content.trim_start_matches(['#', '^', '&']).trim_start();

        let mut tokens = content.splitn(2, char::is_whitespace);
        let head = tokens.next().unwrap_or_default();
        let has_params = tokens.next().is_some_and(|rest| !rest.trim().is_empty());
        if has_params {
            ensure_helper(head)?;
        }

        for subexpression in SUBEXPRESSION.captures_iter(content) {
            ensure_helper(&subexpression[1])?;
        }
    }
    Ok(())
}

fn ensure_helper(name: &str) -> Result<(), TemplateError> {
    if BUILTIN_HELPERS.contains(&name) || GATEWAY_HELPERS.contains(&name) {
        Ok(())
    } else {
        Err(TemplateError::UndefinedHelper(name.to_owned()))
    }
}

/// Turns a single value or a list into a list of strings.
fn ensure_array(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::Null => Vec::new(),
        JsonValue::Array(values) => values.iter().flat_map(ensure_array).collect(),
        JsonValue::String(value) => vec![value.clone()],
        other => vec![other.to_string()],
    }
}

fn quote_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

handlebars_helper!(join_helper: |separator: str, values: Json| ensure_array(values).join(separator));

handlebars_helper!(as_iriref_helper: |values: Json| {
    ensure_array(values)
        .into_iter()
        .map(|value| format!("<{value}>"))
        .collect::<Vec<_>>()
});

handlebars_helper!(as_string_helper: |values: Json| {
    ensure_array(values)
        .iter()
        .map(|value| quote_string(value))
        .collect::<Vec<_>>()
});

fn filter_by_iri(
    h: &Helper<'_>,
    _: &Handlebars<'_>,
    ctx: &Context,
    _: &mut RenderContext<'_, '_>,
    out: &mut dyn Output,
) -> HelperResult {
    let iri = match h.param(0) {
        Some(param) => param.value(),
        None => ctx.data().get("iri").unwrap_or(&JsonValue::Null),
    };

    let filter = match iri {
        JsonValue::Array(_) => {
            let refs = ensure_array(iri)
                .into_iter()
                .map(|iri| format!("<{iri}>"))
                .collect::<Vec<_>>();
            format!("FILTER (?iri IN ({}))", refs.join(", "))
        }
        _ => {
            let iri = ensure_array(iri).into_iter().next().unwrap_or_default();
            format!("FILTER (?iri = <{iri}>)")
        }
    };
    out.write(&filter)?;
    Ok(())
}
