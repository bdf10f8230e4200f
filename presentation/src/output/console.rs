//! Console output formatter for invocation results

use crate::output::formatter::OutputFormatter;
use crate::output::report::BatchReport;
use colored::Colorize;
use toolgate_domain::{ConfigIssue, InvocationResult, Severity, ToolSpec};

/// Formats results, tool listings and config issues for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete result
    pub fn format(result: &InvocationResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header(&format!("Tool: {}", result.tool_id)));
        output.push('\n');

        match &result.error {
            None => output.push_str(&format!("{} {}\n", "Status:".cyan().bold(), "ok".green())),
            Some(err) => output.push_str(&format!(
                "{} {} {}\n",
                "Status:".cyan().bold(),
                err.kind.as_str().red().bold(),
                err.message
            )),
        }
        if let Some(key) = &result.idempotency_key {
            output.push_str(&format!("{} {}\n", "Key:".cyan().bold(), key));
        }

        output.push_str(&Self::section_header("Content"));
        let content = serde_json::to_string_pretty(&result.content)
            .unwrap_or_else(|_| result.content.to_string());
        output.push_str(&Self::indent(&content, "  "));
        output.push('\n');

        output.push_str(&Self::section_header("Usage"));
        let usage = &result.usage;
        output.push_str(&format!(
            "  attempts: {}  retries: {}  in: {}B  out: {}B  latency: {}ms\n",
            usage.attempts, usage.retries, usage.input_bytes, usage.output_bytes, result.latency_ms
        ));
        if usage.circuit_opened {
            output.push_str(&format!("  {}\n", "circuit open".red()));
        }

        if !result.warnings.is_empty() {
            output.push_str(&format!("\n{}\n", "Warnings:".yellow().bold()));
            for warning in &result.warnings {
                output.push_str(&format!("  * {}\n", warning));
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(result: &InvocationResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format as a single line
    pub fn format_summary(result: &InvocationResult) -> String {
        let status = match &result.error {
            None => "ok".green().to_string(),
            Some(err) => err.kind.as_str().red().to_string(),
        };
        let detail = match &result.error {
            None => result.content.to_string(),
            Some(err) => err.message.clone(),
        };
        format!(
            "{} {} attempts={} {}ms {}",
            result.tool_id.bold(),
            status,
            result.usage.attempts,
            result.latency_ms,
            Self::truncate(&detail, 80)
        )
    }

    /// Table of configured tools
    pub fn format_tool_list(specs: &[ToolSpec]) -> String {
        if specs.is_empty() {
            return "No tools configured.\n".to_string();
        }

        let mut output = String::new();
        output.push_str(&format!(
            "{}\n",
            format!(
                "{:<16} {:<10} {:>8} {:<18} {:<10} {}",
                "ID", "DRIVER", "TIMEOUT", "RETRY", "BREAKER", "IDEMPOTENT"
            )
            .bold()
        ));
        for spec in specs {
            let retry = match spec.retry_policy.max_attempts() {
                1 => spec.retry_policy.name().to_string(),
                n => format!("{} x{}", spec.retry_policy.name(), n),
            };
            output.push_str(&format!(
                "{:<16} {:<10} {:>7}s {:<18} {:<10} {}\n",
                spec.id.cyan(),
                spec.driver,
                spec.timeout.as_secs_f64(),
                retry,
                spec.circuit_breaker.name(),
                if spec.idempotency.enabled { "yes" } else { "no" }
            ));
            if !spec.description.is_empty() {
                output.push_str(&format!("  {}\n", spec.description.dimmed()));
            }
        }
        output
    }

    /// One line per configuration issue
    pub fn format_issues(issues: &[ConfigIssue]) -> String {
        issues
            .iter()
            .map(|issue| {
                let label = match issue.severity {
                    Severity::Error => issue.severity.as_str().red().bold(),
                    Severity::Warning => issue.severity.as_str().yellow().bold(),
                };
                format!("{}: {}\n", label, issue.message)
            })
            .collect()
    }

    /// Aggregate figures for a batch of calls
    pub fn format_report(report: &BatchReport) -> String {
        let mut output = Self::section_header("Batch");
        output.push_str(&format!(
            "  calls: {}  {} {}  {} {}\n",
            report.calls,
            "ok:".green(),
            report.succeeded,
            "failed:".red(),
            report.failed()
        ));
        for (kind, count) in &report.failures {
            output.push_str(&format!("    {}: {}\n", kind, count));
        }
        output.push_str(&format!(
            "  attempts: {}  distinct keys: {}\n",
            report.attempts, report.distinct_keys
        ));
        output.push_str(&format!(
            "  latency p50: {}ms  p95: {}ms  max: {}ms  wall: {}ms\n",
            report.latency_p50_ms, report.latency_p95_ms, report.latency_max_ms, report.wall_time_ms
        ));
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, result: &InvocationResult) -> String {
        Self::format(result)
    }

    fn format_json(&self, result: &InvocationResult) -> String {
        Self::format_json(result)
    }

    fn format_summary(&self, result: &InvocationResult) -> String {
        Self::format_summary(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolgate_domain::{ConfigIssueCode, InvocationError, OutputFormat, Usage};

    fn success() -> InvocationResult {
        InvocationResult::success("add", json!({"sum": 5}))
            .with_idempotency_key("abc123")
            .with_latency_ms(12)
            .with_usage(Usage {
                attempts: 2,
                retries: 1,
                ..Usage::default()
            })
    }

    #[test]
    fn test_format_full() {
        let output = ConsoleFormatter::format(&success());
        assert!(output.contains("Tool: add"));
        assert!(output.contains("abc123"));
        assert!(output.contains("\"sum\": 5"));
        assert!(output.contains("attempts: 2"));
    }

    #[test]
    fn test_format_failure() {
        let err = InvocationError::circuit_open("add");
        let output = ConsoleFormatter::format(&InvocationResult::failure("add", &err));
        assert!(output.contains("circuit_open"));
        assert!(output.contains("Warnings:"));
        assert!(output.contains("circuit open"));
    }

    #[test]
    fn test_format_json_round_trips() {
        let output = ConsoleFormatter::format_json(&success());
        let back: InvocationResult = serde_json::from_str(&output).unwrap();
        assert_eq!(back, success());
    }

    #[test]
    fn test_render_dispatches_on_format() {
        let formatter = ConsoleFormatter;
        let summary = formatter.render(&success(), OutputFormat::Summary);
        assert!(!summary.trim_end().contains('\n'));
        assert!(summary.contains("attempts=2"));
        assert!(formatter.render(&success(), OutputFormat::Json).starts_with('{'));
    }

    #[test]
    fn test_summary_truncates_long_content() {
        let result = InvocationResult::success("echo", json!("x".repeat(500)));
        let summary = ConsoleFormatter::format_summary(&result);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_tool_list() {
        let specs = vec![
            ToolSpec::new("add", "function").with_description("Add two numbers"),
            ToolSpec::new("fetch", "http"),
        ];
        let output = ConsoleFormatter::format_tool_list(&specs);
        assert!(output.contains("add"));
        assert!(output.contains("http"));
        assert!(output.contains("Add two numbers"));
        assert_eq!(ConsoleFormatter::format_tool_list(&[]), "No tools configured.\n");
    }

    #[test]
    fn test_issues() {
        let issues = vec![ConfigIssue::error(
            ConfigIssueCode::DuplicateToolId { id: "a".into() },
            "tools[1]: duplicate tool id 'a'",
        )];
        let output = ConsoleFormatter::format_issues(&issues);
        assert!(output.contains("duplicate tool id 'a'"));
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_report() {
        let report = BatchReport::from_results(&[success(), success()], 30);
        let output = ConsoleFormatter::format_report(&report);
        assert!(output.contains("distinct keys: 1"));
        assert!(output.contains("wall: 30ms"));
    }
}
