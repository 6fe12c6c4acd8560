use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::ValidationError;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_LEADS_TAB: &str = "Leads";
const DEFAULT_TRADING_VOLUME_TAB: &str = "Daily Trading Volume";
const DEFAULT_STATUS_COLUMN: &str = "upload_status";

/// Connection settings for the spreadsheet holding leads and trading volume.
///
/// This intentionally does not implement [`Serialize`] to avoid accidentally
/// leaking the API token into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetSourceConfig {
    /// Base URL of the spreadsheet API.
    ///
    /// Overridable so tests and local mocks can point at a fake server.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Identifier of the spreadsheet document to sync from.
    pub spreadsheet_id: String,
    /// Bearer token used to authenticate API calls.
    pub api_token: SecretString,
    /// Name of the tab holding lead rows.
    #[serde(default = "default_leads_tab")]
    pub leads_tab: String,
    /// Name of the tab holding daily trading volume rows.
    #[serde(default = "default_trading_volume_tab")]
    pub trading_volume_tab: String,
    /// Header of the column where row outcomes are written back.
    #[serde(default = "default_status_column")]
    pub status_column: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_leads_tab() -> String {
    DEFAULT_LEADS_TAB.to_string()
}

fn default_trading_volume_tab() -> String {
    DEFAULT_TRADING_VOLUME_TAB.to_string()
}

fn default_status_column() -> String {
    DEFAULT_STATUS_COLUMN.to_string()
}

impl SheetSourceConfig {
    /// Validates spreadsheet source settings.
    ///
    /// All fields must be non-empty, including the ones that carry defaults,
    /// since an explicit empty override would produce unusable API URLs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::EmptySourceField("base_url"));
        }

        if self.spreadsheet_id.is_empty() {
            return Err(ValidationError::EmptySourceField("spreadsheet_id"));
        }

        if self.leads_tab.is_empty() {
            return Err(ValidationError::EmptySourceField("leads_tab"));
        }

        if self.trading_volume_tab.is_empty() {
            return Err(ValidationError::EmptySourceField("trading_volume_tab"));
        }

        if self.status_column.is_empty() {
            return Err(ValidationError::EmptySourceField("status_column"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let config: SheetSourceConfig = serde_json::from_value(json!({
            "spreadsheet_id": "sheet-123",
            "api_token": "token",
        }))
        .unwrap();

        assert_eq!(config.base_url, "https://sheets.googleapis.com");
        assert_eq!(config.leads_tab, "Leads");
        assert_eq!(config.trading_volume_tab, "Daily Trading Volume");
        assert_eq!(config.status_column, "upload_status");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_spreadsheet_id_fails_validation() {
        let config: SheetSourceConfig = serde_json::from_value(json!({
            "spreadsheet_id": "",
            "api_token": "token",
        }))
        .unwrap();

        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptySourceField("spreadsheet_id"))
        ));
    }
}
