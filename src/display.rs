//! Colored terminal output for investigation progress.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::ai::truncate;
use crate::supervisor::{AuditReport, SupervisorEvent};

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Format tool arguments for display, truncating long values.
#[must_use]
pub fn format_tool_args(args: &serde_json::Value, max_value_len: usize) -> String {
    match args {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => truncate(s, max_value_len),
                    other => truncate(&other.to_string(), max_value_len),
                };
                format!("{k}={value}")
            })
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Null => String::new(),
        other => truncate(&other.to_string(), max_value_len),
    }
}

/// Collapse a multi-line tool result to a single bounded line.
#[must_use]
pub fn one_line(text: &str, max_len: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, max_len)
}

pub fn print_task_start(run_id: &str, task: &str, transaction_id: &str) {
    println!(
        "{} {} run={} transaction={} {}",
        timestamp().dimmed(),
        "[TASK]".blue().bold(),
        run_id.get(..8).unwrap_or(run_id).dimmed(),
        transaction_id.cyan(),
        truncate(task, 120)
    );
    let _ = io::stdout().flush();
}

pub fn print_tool_call(name: &str, args: &serde_json::Value) {
    println!(
        "{} {} ({})",
        "[TOOL]".cyan().bold(),
        name.bold(),
        format_tool_args(args, 50).dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print a tool result. Results that read as errors are shown in red.
pub fn print_tool_result(name: &str, output: &str, max_len: usize) {
    let line = one_line(output, max_len);
    let is_error = output.starts_with("Unknown ")
        || output.starts_with("Error:")
        || output.starts_with("Invalid arguments");
    if is_error {
        println!("{} {} {}", "[RESULT]".red().bold(), name.dimmed(), line);
    } else {
        println!("{} {} {}", "[RESULT]".green().bold(), name.dimmed(), line);
    }
    let _ = io::stdout().flush();
}

pub fn print_model_message(text: &str) {
    println!("{} {}", "[MODEL]".magenta().bold(), text);
    let _ = io::stdout().flush();
}

/// Print a short report summary line.
pub fn print_report_summary(report: &AuditReport) {
    println!(
        "{} {} confirmed={} potential={} confidence={:.2}",
        timestamp().dimmed(),
        "[REPORT]".blue().bold(),
        report.confirmed_issues.len().to_string().red(),
        report.potential_issues.len().to_string().yellow(),
        report.confidence_score
    );
    let _ = io::stdout().flush();
}

pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

/// Print any supervisor event.
pub fn print_event(event: &SupervisorEvent, max_tool_chars: usize) {
    match event {
        SupervisorEvent::TaskStarted {
            run_id,
            task,
            transaction_id,
        } => print_task_start(&run_id.to_string(), task, transaction_id),
        SupervisorEvent::ToolCall { name, args } => print_tool_call(name, args),
        SupervisorEvent::ToolResult { name, output } => {
            print_tool_result(name, output, max_tool_chars);
        }
        SupervisorEvent::ModelMessage(text) => print_model_message(text),
        SupervisorEvent::ReportBuilt(report) => print_report_summary(report),
    }
}
