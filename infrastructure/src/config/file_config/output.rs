//! `[output]` section: how the CLI renders results

use serde::{Deserialize, Serialize};
use toolgate_domain::OutputFormat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Result format used when `--output` is not given
    pub format: Option<OutputFormat>,
    /// ANSI colors in console output (`--no-color` forces them off)
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

impl FileOutputConfig {
    /// The command-line choice wins over the configured one
    pub fn resolve_format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.or(self.format).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_format() {
        let config: super::super::FileConfig = toml::from_str("[output]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.output.resolve_format(None), OutputFormat::Json);
        assert_eq!(
            config.output.resolve_format(Some(OutputFormat::Summary)),
            OutputFormat::Summary
        );
        assert_eq!(FileOutputConfig::default().resolve_format(None), OutputFormat::Full);
    }
}
