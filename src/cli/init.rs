// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowdef contributors

//! Init command - write an example definition

use chrono::{TimeZone, Utc};
use colored::Colorize;
use miette::Result;
use std::path::PathBuf;
use std::time::Duration;

use super::output::{line, Status};
use crate::config::FlowdefConfig;
use crate::errors::FlowResult;
use crate::pipeline::{raw_params, ParamValue, PipelineDefinition, RawParams, Schedule};

const TEMPLATED_COMMAND: &str = r#"{% for i in range(5) %}
    echo "{{ ds }}"
    echo "{{ macros.ds_add(ds, 7) }}"
{% endfor %}"#;

const PIPELINE_DOC: &str = "### Example pipeline\n\
    Prints the date, then sleeps and echoes a templated command in parallel.\n";

const TEMPLATED_DOC: &str = "#### Templated task\n\
    Echoes the logical date and the date a week later, five times.\n";

/// The example pipeline: `print_date`, then `sleep` and `templated`
pub fn example_definition(config: &FlowdefConfig) -> FlowResult<PipelineDefinition> {
    let defaults = raw_params([
        ("depends_on_past", ParamValue::Bool(false)),
        ("notify_on_failure", ParamValue::Bool(false)),
        ("notify_on_retry", ParamValue::Bool(false)),
        ("retries", ParamValue::Int(1)),
        ("retry_delay", ParamValue::Duration(Duration::from_secs(300))),
    ]);

    let start_date = Utc
        .with_ymd_and_hms(2021, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();

    let mut definition = PipelineDefinition::create(
        "example_pipeline",
        &defaults,
        Schedule::parse("1d"),
        start_date,
        Some("A simple example pipeline".to_string()),
    )?
    .with_options(config.definitions)
    .with_catchup(false)
    .with_tags(["example"])
    .with_documentation(PIPELINE_DOC);

    definition.add_node("print_date", "date", &RawParams::new(), None)?;
    definition.add_node(
        "sleep",
        "sleep 5",
        &raw_params([("depends_on_past", ParamValue::Bool(false)), ("retries", ParamValue::Int(3))]),
        None,
    )?;
    definition.add_node(
        "templated",
        TEMPLATED_COMMAND,
        &RawParams::new(),
        Some(TEMPLATED_DOC.to_string()),
    )?;

    definition.add_fan_out("print_date", &["sleep", "templated"])?;

    Ok(definition)
}

/// Run the init command
pub async fn run(file: PathBuf, force: bool, config: &FlowdefConfig, verbose: bool) -> Result<()> {
    println!("{}", "Writing example definition...".bold());
    println!();

    if file.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            file.display()
        ));
    }

    let definition = example_definition(config)?;
    definition.save(&file)?;

    line(Status::Ok, format!("Created {}", file.display()));
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to declare your tasks", file.display().to_string().cyan());
    println!("  2. Run {} to check it", format!("flowdef validate {}", file.display()).cyan());
    println!(
        "  3. Run {} to see the executor hand-off",
        format!("flowdef export {}", file.display()).cyan()
    );
    println!();

    if verbose {
        println!("{}", "Generated definition:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", definition.to_yaml()?.dimmed());
    }

    Ok(())
}
