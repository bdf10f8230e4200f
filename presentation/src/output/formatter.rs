//! Output formatter trait

use toolgate_domain::{InvocationResult, OutputFormat};

/// Trait for formatting invocation results
pub trait OutputFormatter {
    /// Format the complete result: content, usage and warnings
    fn format(&self, result: &InvocationResult) -> String;

    /// Format as JSON
    fn format_json(&self, result: &InvocationResult) -> String;

    /// Format as a single line
    fn format_summary(&self, result: &InvocationResult) -> String;

    fn render(&self, result: &InvocationResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => self.format(result),
            OutputFormat::Summary => self.format_summary(result),
            OutputFormat::Json => self.format_json(result),
        }
    }
}
