use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WysiwygConfig {
    /// Throttle window for content checks after an engine update.
    pub content_throttle_ms: u64,
    /// Quiet period before the final content check of a burst.
    pub content_debounce_ms: u64,
    pub selection_throttle_ms: u64,
    pub text_style: TextStyleDefaults,
    pub view: ViewConfig,
}

impl Default for WysiwygConfig {
    fn default() -> Self {
        Self {
            content_throttle_ms: 500,
            content_debounce_ms: 500,
            selection_throttle_ms: 500,
            text_style: TextStyleDefaults::default(),
            view: ViewConfig::default(),
        }
    }
}

impl WysiwygConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view.line_heights.is_empty() {
            return Err(ConfigError::Invalid("lineHeights must not be empty".into()));
        }
        if !self.view.line_heights.contains(&self.text_style.line_height) {
            return Err(ConfigError::Invalid(format!(
                "default line height {} is not one of the allowed line heights",
                self.text_style.line_height
            )));
        }
        Ok(())
    }

    pub fn content_throttle(&self) -> Duration {
        Duration::from_millis(self.content_throttle_ms)
    }

    pub fn content_debounce(&self) -> Duration {
        Duration::from_millis(self.content_debounce_ms)
    }

    pub fn selection_throttle(&self) -> Duration {
        Duration::from_millis(self.selection_throttle_ms)
    }
}

/// Values the snapshot reports when the selection carries no explicit style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextStyleDefaults {
    pub font_family: String,
    pub font_size: String,
    pub color: String,
    pub line_height: String,
}

impl Default for TextStyleDefaults {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".into(),
            font_size: "16px".into(),
            color: "#000000".into(),
            line_height: "1.4".into(),
        }
    }
}

/// Option lists the toolbar and menubar build their dropdowns from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewConfig {
    pub font_families: Vec<String>,
    pub font_sizes: Vec<String>,
    pub line_heights: Vec<String>,
    pub colors: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            font_families: strings(&[
                "Arial",
                "Courier New",
                "Georgia",
                "Helvetica",
                "Tahoma",
                "Times New Roman",
                "Verdana",
            ]),
            font_sizes: strings(&[
                "8px", "10px", "12px", "14px", "16px", "18px", "24px", "30px", "36px", "48px",
            ]),
            line_heights: strings(&["1", "1.1", "1.2", "1.3", "1.4", "1.5", "2"]),
            colors: strings(&[
                "#000000", "#434343", "#666666", "#999999", "#ffffff", "#e03e2d", "#f1c40f",
                "#2dc26b", "#3598db", "#b96ad9", "#fbeeb8", "#bfedd2",
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = WysiwygConfig::from_json_str(r#"{ "contentThrottleMs": 250, "textStyle": { "fontSize": "14px" } }"#)
            .unwrap();

        assert_eq!(config.content_throttle(), Duration::from_millis(250));
        assert_eq!(config.content_debounce_ms, 500);
        assert_eq!(config.text_style.font_size, "14px");
        assert_eq!(config.text_style.font_family, "Helvetica");
        assert_eq!(config.view, ViewConfig::default());
    }

    #[test]
    fn default_line_height_must_be_allowed() {
        let err = WysiwygConfig::from_json_str(r#"{ "view": { "lineHeights": ["1", "2"] } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        assert!(matches!(
            WysiwygConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
