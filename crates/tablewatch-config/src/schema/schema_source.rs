//! Watched-source configuration types.

use serde::{Deserialize, Serialize};

/// The page and table being watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page URL.
    #[serde(default)]
    pub url: String,

    /// Timezone the page's clock times are denominated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Header of the column whose cells label each row.
    #[serde(default)]
    pub row_label_column: String,

    /// Field name that carries the timestamp in every target.
    #[serde(default = "default_temporal_field")]
    pub temporal_field: String,

    #[serde(default)]
    pub table: TableLocator,

    #[serde(default)]
    pub popup: PopupConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timezone: default_timezone(),
            row_label_column: String::new(),
            temporal_field: default_temporal_field(),
            table: TableLocator::default(),
            popup: PopupConfig::default(),
        }
    }
}

fn default_timezone() -> String {
    "GMT".to_string()
}

fn default_temporal_field() -> String {
    "UTCTime".to_string()
}

/// Attribute-based locator for the one table of interest,
/// e.g. `attribute = "id"`, `value = "bonds"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLocator {
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub value: String,
}

impl TableLocator {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// CSS selector matching the table element.
    pub fn css(&self) -> String {
        format!(
            "table[{}=\"{}\"]",
            self.attribute,
            self.value.replace('\\', "\\\\").replace('"', "\\\"")
        )
    }
}

/// Interstitial dismissed once after every page load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    /// Text contained in the dismiss link. Empty disables dismissal.
    #[serde(default = "default_link_text")]
    pub link_text: String,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            link_text: default_link_text(),
        }
    }
}

fn default_link_text() -> String {
    "Continue".to_string()
}
