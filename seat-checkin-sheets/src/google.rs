use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{StatusCode, Url};
use seat_checkin_config::{ServiceAccountKey, Worksheet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::error::SheetsError;
use crate::table::Table;
use crate::TableStore;

const SHEETS_API_URL: &str = "https://sheets.googleapis.com";
const SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// Whole-worksheet reads and writes through the Google Sheets values API.
pub struct GoogleSheets {
    client: reqwest::Client,
    token_provider: Arc<dyn TokenProvider>,
    base_url: String,
    spreadsheet_id: String,
    /// Worksheet titles in tab order, fetched on first use of an index selector.
    titles: OnceCell<Vec<String>>,
}

impl fmt::Debug for GoogleSheets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSheets")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("token_provider", &"<TokenProvider>")
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetMetadata>,
}

#[derive(Deserialize)]
struct SheetMetadata {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GoogleSheets {
    pub fn new(spreadsheet_id: String, key: &ServiceAccountKey) -> Result<Self, SheetsError> {
        let token_provider = CustomServiceAccount::from_json(&serde_json::to_string(key)?)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self::with_token_provider(
            spreadsheet_id,
            Arc::new(token_provider),
            client,
        ))
    }

    #[must_use]
    pub fn with_token_provider(
        spreadsheet_id: String,
        token_provider: Arc<dyn TokenProvider>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            token_provider,
            base_url: SHEETS_API_URL.to_owned(),
            spreadsheet_id,
            titles: OnceCell::new(),
        }
    }

    /// Points the client at another API host, e.g. a local emulator.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn token(&self) -> Result<Arc<gcp_auth::Token>, SheetsError> {
        Ok(self.token_provider.token(SCOPES).await?)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|err| SheetsError::Url(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| SheetsError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn worksheet_titles(&self) -> Result<Vec<String>, SheetsError> {
        debug!(spreadsheet_id = %self.spreadsheet_id, "fetching worksheet titles");
        let response = self
            .client
            .get(self.url(&[])?)
            .bearer_auth(self.token().await?.as_str())
            .query(&[("fields", "sheets.properties(title,index)")])
            .send()
            .await?;
        let mut sheets = check(response)
            .await?
            .json::<SpreadsheetMetadata>()
            .await?
            .sheets;
        sheets.sort_by_key(|sheet| sheet.properties.index);
        Ok(sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }

    async fn title(&self, worksheet: &Worksheet) -> Result<String, SheetsError> {
        match worksheet {
            Worksheet::Title(title) => Ok(title.clone()),
            Worksheet::Index(index) => self
                .titles
                .get_or_try_init(|| self.worksheet_titles())
                .await?
                .get(*index)
                .cloned()
                .ok_or_else(|| SheetsError::WorksheetNotFound(worksheet.clone())),
        }
    }
}

/// A1 notation for a whole worksheet.
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map_or(body, |error| error.error.message);
    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(SheetsError::RateLimited(message))
    } else {
        Err(SheetsError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text,
        Value::Number(number) => number.as_i64().map_or_else(
            || {
                number
                    .as_f64()
                    .filter(|float| float.fract().abs() < f64::EPSILON && float.abs() < 9.0e15)
                    .map_or_else(|| number.to_string(), |float| format!("{float:.0}"))
            },
            |integer| integer.to_string(),
        ),
        other => other.to_string(),
    }
}

/// Integers go out as numbers so the sheet keeps treating seat columns as numeric.
fn cell_value(text: &str) -> Value {
    match text.parse::<i64>() {
        Ok(integer) if integer.to_string() == text => Value::from(integer),
        _ => Value::String(text.to_owned()),
    }
}

impl TableStore for GoogleSheets {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, worksheet: &Worksheet) -> Result<Table, SheetsError> {
        let range = sheet_range(&self.title(worksheet).await?);
        let response = self
            .client
            .get(self.url(&["values", &range])?)
            .bearer_auth(self.token().await?.as_str())
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("majorDimension", "ROWS"),
            ])
            .send()
            .await?;
        let values = check(response).await?.json::<ValueRange>().await?.values;
        let table = Table::from_values(
            values
                .into_iter()
                .map(|row| row.into_iter().map(cell_text).collect())
                .collect(),
        );
        debug!(rows = table.len(), "fetched worksheet");
        Ok(table)
    }

    /// Writes the snapshot over the top of the worksheet, then clears whatever
    /// lies below it. A failed write leaves the previous rows in place.
    #[tracing::instrument(skip(self, table), fields(rows = table.len()))]
    async fn save(&self, worksheet: &Worksheet, table: &Table) -> Result<(), SheetsError> {
        let range = sheet_range(&self.title(worksheet).await?);
        let token = self.token().await?;

        let values: Vec<Vec<Value>> = table
            .to_values()
            .iter()
            .map(|row| row.iter().map(|cell| cell_value(cell)).collect())
            .collect();

        let stale = if values.is_empty() {
            range
        } else {
            let first_stale_row = values.len() + 1;
            let written = format!("{range}!A1");
            let response = self
                .client
                .put(self.url(&["values", &written])?)
                .bearer_auth(token.as_str())
                .query(&[("valueInputOption", "RAW")])
                .json(&ValueRangeUpdate {
                    range: &written,
                    major_dimension: "ROWS",
                    values,
                })
                .send()
                .await?;
            check(response).await?;
            format!("{range}!A{first_stale_row}:ZZZ")
        };

        let response = self
            .client
            .post(self.url(&["values", &format!("{stale}:clear")])?)
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check(response).await?;
        debug!("saved worksheet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_are_read_as_plain_text() {
        assert_eq!(cell_text(json!(5)), "5");
        assert_eq!(cell_text(json!(5.0)), "5");
        assert_eq!(cell_text(json!(2.5)), "2.5");
        assert_eq!(cell_text(json!(null)), "");
        assert_eq!(cell_text(json!("Taro")), "Taro");
        assert_eq!(cell_text(json!(true)), "true");
    }

    #[test]
    fn only_canonical_integers_are_written_as_numbers() {
        assert_eq!(cell_value("5"), json!(5));
        assert_eq!(cell_value("007"), json!("007"));
        assert_eq!(cell_value(""), json!(""));
        assert_eq!(cell_value("s001"), json!("s001"));
    }

    #[test]
    fn quotes_in_titles_are_escaped() {
        assert_eq!(sheet_range("Sheet1"), "'Sheet1'");
        assert_eq!(sheet_range("Taro's"), "'Taro''s'");
    }
}
