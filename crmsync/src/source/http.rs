//! HTTP implementation of [`SheetSource`] for a Sheets-style values API.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crmsync_config::shared::SheetSourceConfig;

use crate::error::{ErrorKind, IngestResult};
use crate::source::base::{CellRef, SheetSnapshot, SheetSource};
use crate::{bail, ingest_error};

/// Per-request timeout applied to every sheet API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response body of the values endpoint.
///
/// The service omits `values` entirely for an empty range, so the field
/// defaults to an empty grid.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// [`SheetSource`] backed by a Sheets-style HTTP API.
///
/// Reads use `GET .../values/<tab>` which returns the populated grid of a tab
/// as JSON. Status writes use `PUT .../values/<tab>!<cell>` with a raw value,
/// one cell per request, so the caller's write pacing maps 1:1 onto API
/// requests.
#[derive(Debug, Clone)]
pub struct HttpSheetSource {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    api_token: SecretString,
    status_column: String,
}

impl HttpSheetSource {
    pub fn new(config: &SheetSourceConfig) -> IngestResult<HttpSheetSource> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| {
                ingest_error!(
                    ErrorKind::SourceConnectionFailed,
                    "Failed to build the sheet API client",
                    source: error
                )
            })?;

        Ok(HttpSheetSource {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_token: config.api_token.clone(),
            status_column: config.status_column.clone(),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{range}",
            self.base_url, self.spreadsheet_id
        )
    }
}

impl SheetSource for HttpSheetSource {
    async fn fetch_snapshot(&self, tab: &str) -> IngestResult<SheetSnapshot> {
        let response = self
            .client
            .get(self.values_url(tab))
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await?
            .error_for_status()?;

        let value_range: ValueRange = response.json().await?;

        SheetSnapshot::from_grid(tab, &self.status_column, value_range.values)
    }

    async fn write_status(&self, tab: &str, cell: CellRef, value: &str) -> IngestResult<()> {
        let range = format!("{tab}!{cell}");
        let body = serde_json::json!({
            "range": range,
            "values": [[value]],
        });

        let response = self
            .client
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(self.api_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        // A 429 is retryable by the caller; any other non-2xx status means
        // the write will not succeed as-is.
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            bail!(
                ErrorKind::SourceRateLimited,
                "Sheet API rate limit hit during status write",
                format!("cell {range}")
            );
        }

        if let Err(error) = response.error_for_status() {
            bail!(
                ErrorKind::StatusWriteFailed,
                "Sheet API rejected the status write",
                detail = format!("cell {range}"),
                source: error
            );
        }

        Ok(())
    }
}
