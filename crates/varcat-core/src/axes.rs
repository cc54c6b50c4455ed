//! Variant axis reference data loaded from `config/axes.yaml`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub title: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct AxesFile {
    pub axes: Vec<AxisConfig>,
}

/// Load and validate the variant axes configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_axes(path: &Path) -> Result<AxesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::AxesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_axes(&content)
}

/// Parse and validate axes YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML cannot be parsed or fails validation.
pub fn parse_axes(content: &str) -> Result<AxesFile, ConfigError> {
    let axes_file: AxesFile = serde_yaml::from_str(content)?;
    validate_axes(&axes_file)?;
    Ok(axes_file)
}

fn validate_axes(axes_file: &AxesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for axis in &axes_file.axes {
        if axis.title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "axis title must be non-empty".to_string(),
            ));
        }

        if !seen.insert(axis.title.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate axis title: '{}'",
                axis.title
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_axes_with_default_active_flag() {
        let file = parse_axes(
            "axes:\n  - title: Color\n  - title: Size\n  - title: Style\n    active: false\n",
        )
        .expect("valid axes file");
        assert_eq!(file.axes.len(), 3);
        assert!(file.axes[0].active);
        assert!(!file.axes[2].active);
    }

    #[test]
    fn rejects_blank_title() {
        let err = parse_axes("axes:\n  - title: \"  \"\n").expect_err("blank title");
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_case_insensitive_duplicates() {
        let err = parse_axes("axes:\n  - title: Color\n  - title: color\n").expect_err("duplicate");
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("color")));
    }

    #[test]
    fn reports_parse_errors() {
        let err = parse_axes("axes: [").expect_err("malformed yaml");
        assert!(matches!(err, ConfigError::AxesFileParse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_axes(Path::new("/nonexistent/axes.yaml")).expect_err("missing file");
        assert!(
            matches!(err, ConfigError::AxesFileIo { ref path, .. } if path.contains("nonexistent"))
        );
    }

    #[test]
    fn shipped_axes_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/axes.yaml");
        let file = load_axes(&path).expect("config/axes.yaml must be valid");
        assert!(!file.axes.is_empty());
    }
}
