// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Command template rendering
//!
//! Supported syntax:
//!
//! - `{{ name }}` substitutes a context variable
//! - `{{ macros.ds_add(ds, 7) }}` shifts a `YYYY-MM-DD` variable by a number of days
//! - `{% for i in range(N) %} ... {% endfor %}` repeats the enclosed text N times,
//!   binding `i` to `0..N`
//!
//! Rendering is a pure function of the template and the context.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::errors::{FlowError, FlowResult};

/// Default upper bound on `range(N)`
pub const DEFAULT_MAX_REPEAT: usize = 1000;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn block_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{%-?\s*(.*?)\s*-?%\}").expect("valid block tag regex"))
}

fn for_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^for\s+([A-Za-z_]\w*)\s+in\s+range\(\s*([A-Za-z_]\w*|\d+)\s*\)$")
            .expect("valid for tag regex")
    })
}

fn expression() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("valid expression regex"))
}

fn ds_add_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:macros\.)?ds_add\(\s*([A-Za-z_]\w*)\s*,\s*(-?\d+)\s*\)$")
            .expect("valid ds_add regex")
    })
}

fn identifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_]\w*$").expect("valid identifier regex"))
}

/// Variables available to a template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContext {
    vars: BTreeMap<String, String>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard variables for one logical run of a pipeline
    pub fn for_run(pipeline: &str, logical_date: DateTime<Utc>) -> Self {
        Self::new()
            .with("ds", logical_date.format(DATE_FORMAT).to_string())
            .with("ds_nodash", logical_date.format("%Y%m%d").to_string())
            .with("ts", logical_date.to_rfc3339())
            .with("pipeline", pipeline)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

/// Lookup scope: the context plus the current loop variable, if any
struct Scope<'a> {
    ctx: &'a TemplateContext,
    local: Option<(&'a str, String)>,
}

impl Scope<'_> {
    fn get(&self, name: &str) -> Option<&str> {
        match &self.local {
            Some((var, value)) if *var == name => Some(value.as_str()),
            _ => self.ctx.get(name),
        }
    }
}

/// Template renderer with a bound on loop repetitions
#[derive(Debug, Clone, Copy)]
pub struct TemplateRenderer {
    max_repeat: usize,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REPEAT)
    }
}

impl TemplateRenderer {
    pub fn new(max_repeat: usize) -> Self {
        Self { max_repeat }
    }

    /// Render `template` against `ctx`
    pub fn render(&self, template: &str, ctx: &TemplateContext) -> FlowResult<String> {
        let root = Scope { ctx, local: None };
        let mut out = String::with_capacity(template.len());
        let mut tags = block_tag().captures_iter(template);
        let mut cursor = 0;

        while let Some(open) = tags.next() {
            let Some(whole) = open.get(0) else { break };
            let tag = open.get(1).map_or("", |m| m.as_str());

            out.push_str(&substitute(&template[cursor..whole.start()], &root)?);

            let Some(header) = for_tag().captures(tag) else {
                return Err(if tag == "endfor" {
                    FlowError::template("'endfor' without a matching 'for'")
                } else {
                    FlowError::Template {
                        message: format!("unsupported block '{{% {} %}}'", tag),
                        help: Some("Only '{% for i in range(N) %}' blocks are supported".into()),
                    }
                });
            };

            let close = tags
                .next()
                .ok_or_else(|| FlowError::template(format!("'{{% {} %}}' is never closed", tag)))?;
            let Some(close_whole) = close.get(0) else { break };
            match close.get(1).map_or("", |m| m.as_str()) {
                "endfor" => {}
                inner if inner.starts_with("for ") => {
                    return Err(FlowError::template("nested 'for' blocks are not supported"));
                }
                inner => {
                    return Err(FlowError::template(format!(
                        "expected 'endfor', found '{{% {} %}}'",
                        inner
                    )));
                }
            }

            let var = header.get(1).map_or("i", |m| m.as_str());
            let count = self.repeat_count(header.get(2).map_or("", |m| m.as_str()), &root)?;
            let body = &template[whole.end()..close_whole.start()];

            for i in 0..count {
                let scope = Scope {
                    ctx,
                    local: Some((var, i.to_string())),
                };
                out.push_str(&substitute(body, &scope)?);
            }

            cursor = close_whole.end();
        }

        out.push_str(&substitute(&template[cursor..], &root)?);
        Ok(out)
    }

    fn repeat_count(&self, arg: &str, scope: &Scope<'_>) -> FlowResult<usize> {
        let raw = if identifier().is_match(arg) {
            scope
                .get(arg)
                .ok_or_else(|| FlowError::missing_placeholder(arg))?
        } else {
            arg
        };

        let count: usize = raw.trim().parse().map_err(|_| {
            FlowError::template(format!("range({}) is not a non-negative integer: '{}'", arg, raw))
        })?;

        if count > self.max_repeat {
            return Err(FlowError::Template {
                message: format!("range({}) exceeds the repeat limit of {}", count, self.max_repeat),
                help: Some("Raise `max_repeat` in flowdef.toml if this is intended".into()),
            });
        }

        Ok(count)
    }
}

/// Render with the default repeat bound
pub fn render(template: &str, ctx: &TemplateContext) -> FlowResult<String> {
    TemplateRenderer::default().render(template, ctx)
}

/// Names of the context variables a template refers to, in order of first use
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let loop_vars: Vec<&str> = block_tag()
        .captures_iter(template)
        .filter_map(|c| for_tag().captures(c.get(1)?.as_str()))
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    for cap in expression().captures_iter(template) {
        let expr = cap.get(1).map_or("", |m| m.as_str());
        let name = match ds_add_call().captures(expr) {
            Some(call) => call.get(1).map_or("", |m| m.as_str()),
            None => expr,
        };
        if identifier().is_match(name)
            && !loop_vars.contains(&name)
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }

    names
}

fn substitute(text: &str, scope: &Scope<'_>) -> FlowResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for cap in expression().captures_iter(text) {
        let Some(whole) = cap.get(0) else { continue };
        out.push_str(&text[cursor..whole.start()]);
        out.push_str(&evaluate(cap.get(1).map_or("", |m| m.as_str()), scope)?);
        cursor = whole.end();
    }

    out.push_str(&text[cursor..]);
    Ok(out)
}

fn evaluate(expr: &str, scope: &Scope<'_>) -> FlowResult<String> {
    if identifier().is_match(expr) {
        return scope
            .get(expr)
            .map(str::to_string)
            .ok_or_else(|| FlowError::missing_placeholder(expr));
    }

    if let Some(call) = ds_add_call().captures(expr) {
        let var = call.get(1).map_or("", |m| m.as_str());
        let days: i64 = call
            .get(2)
            .map_or("0", |m| m.as_str())
            .parse()
            .map_err(|_| FlowError::template(format!("invalid day offset in '{}'", expr)))?;
        let value = scope
            .get(var)
            .ok_or_else(|| FlowError::missing_placeholder(var))?;
        return ds_add(value, days);
    }

    Err(FlowError::Template {
        message: format!("unsupported expression '{{{{ {} }}}}'", expr),
        help: Some("Use a variable name or macros.ds_add(<var>, <days>)".into()),
    })
}

/// Shift a `YYYY-MM-DD` date by `days`
pub fn ds_add(ds: &str, days: i64) -> FlowResult<String> {
    let date = NaiveDate::parse_from_str(ds, DATE_FORMAT)
        .map_err(|e| FlowError::template(format!("'{}' is not a YYYY-MM-DD date: {}", ds, e)))?;
    let offset = ChronoDuration::try_days(days)
        .ok_or_else(|| FlowError::template(format!("{} days is not a valid offset", days)))?;
    let shifted = date
        .checked_add_signed(offset)
        .ok_or_else(|| FlowError::template(format!("'{}' + {} days is out of range", ds, days)))?;
    Ok(shifted.format(DATE_FORMAT).to_string())
}
