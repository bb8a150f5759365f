//! Implements the `Sheet` trait for the tabs of a Google sheet.
//!
//! Reads and range writes go through the `sheets` client. Listing and adding tabs and appending
//! rows go through the REST API directly with `reqwest`.

use crate::api::{Authorizer, Sheet};
use crate::Result;
use anyhow::{bail, Context};
use serde::Deserialize;
use sheets::types::{
    BatchUpdateValuesRequest, DateTimeRenderOption, Dimension, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::{debug, trace};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Cells are stored exactly as written. Text such as a memo starting with `=` stays text.
const VALUE_INPUT: ValueInputOption = ValueInputOption::Raw;

/// A Google sheet. A fresh `sheets::Client` is made for each call so that the access token is
/// always current.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    authorizer: Authorizer,
}

impl GoogleSheet {
    pub(super) fn new(spreadsheet_id: impl Into<String>, authorizer: Authorizer) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            authorizer,
        }
    }

    async fn client(&mut self) -> Result<sheets::Client> {
        let access_token = self.authorizer.access_token().await?;
        // Only the access token matters; refreshing is handled by the `Authorizer`
        Ok(sheets::Client::new(
            String::new(),
            String::new(),
            String::new(),
            access_token,
            String::new(),
        ))
    }

    /// The titles of every tab in the sheet.
    async fn titles(&mut self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Spreadsheet {
            #[serde(default)]
            sheets: Vec<Tab>,
        }
        #[derive(Deserialize)]
        struct Tab {
            properties: Properties,
        }
        #[derive(Deserialize)]
        struct Properties {
            title: String,
        }

        let token = self.authorizer.access_token().await?;
        let url = format!("{SHEETS_API}/{}", self.spreadsheet_id);
        let response = reqwest::Client::new()
            .get(&url)
            .query(&[("fields", "sheets.properties.title")])
            .bearer_auth(token)
            .send()
            .await
            .context("Failed to send the request for the sheet's tabs")?;
        let spreadsheet: Spreadsheet = check(response, "list tabs")
            .await?
            .json()
            .await
            .context("Failed to parse the list of tabs")?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|t| t.properties.title)
            .collect())
    }

    async fn add_tab(&mut self, title: &str) -> Result<()> {
        debug!("Adding tab {title}");
        let token = self.authorizer.access_token().await?;
        let url = format!("{SHEETS_API}/{}:batchUpdate", self.spreadsheet_id);
        let response = reqwest::Client::new()
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }))
            .send()
            .await
            .with_context(|| format!("Failed to send the request to add tab {title}"))?;
        check(response, "add a tab").await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn ensure_table(&mut self, table: &str, header: &[String]) -> Result<bool> {
        if !self.titles().await?.iter().any(|t| t == table) {
            self.add_tab(table).await?;
        } else if !self.get_rows(table).await?.is_empty() {
            return Ok(false);
        }
        self.update_range(table, 1, &[header.to_vec()]).await?;
        Ok(true)
    }

    async fn get_rows(&mut self, table: &str) -> Result<Vec<Vec<String>>> {
        trace!("get_rows for {table}");
        let client = self.client().await?;
        let range = format!("{table}!A:ZZ");
        let response = client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {table} sheet data"))?;
        Ok(response.body.values)
    }

    async fn append_row(&mut self, table: &str, row: &[String]) -> Result<()> {
        trace!("append_row for {table}");
        let token = self.authorizer.access_token().await?;
        let url = format!(
            "{SHEETS_API}/{}/values/{table}!A1:append",
            self.spreadsheet_id
        );
        let response = reqwest::Client::new()
            .post(&url)
            .query(&append_query())
            .bearer_auth(token)
            .json(&serde_json::json!({ "values": [row] }))
            .send()
            .await
            .with_context(|| format!("Failed to send the append request for {table}"))?;
        check(response, "append a row").await?;
        Ok(())
    }

    async fn update_range(
        &mut self,
        table: &str,
        start_row: usize,
        rows: &[Vec<String>],
    ) -> Result<()> {
        trace!("update_range for {table} starting at row {start_row}");
        if start_row == 0 {
            bail!("Row numbers start at 1");
        }
        let client = self.client().await?;
        let request = BatchUpdateValuesRequest {
            data: vec![ValueRange {
                major_dimension: Some(Dimension::Rows),
                range: format!("{table}!A{start_row}"),
                values: rows.to_vec(),
            }],
            include_values_in_response: Some(false),
            response_date_time_render_option: None,
            response_value_render_option: None,
            value_input_option: Some(VALUE_INPUT),
        };
        client
            .spreadsheets()
            .values_batch_update(&self.spreadsheet_id, &request)
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to write {table}"))?;
        Ok(())
    }
}

fn append_query() -> [(&'static str, String); 2] {
    [
        ("valueInputOption", VALUE_INPUT.to_string()),
        ("insertDataOption", String::from("INSERT_ROWS")),
    ]
}

/// Turns an unsuccessful response into an error that carries Google's message.
async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    bail!("Google Sheets API call to {what} failed with status {status}: {body}")
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_are_written_raw() {
        assert_eq!(VALUE_INPUT, ValueInputOption::Raw);
        let query = append_query();
        assert_eq!(query[0], ("valueInputOption", String::from("RAW")));
        assert_eq!(query[1].1, "INSERT_ROWS");
    }
}
