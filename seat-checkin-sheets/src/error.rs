use seat_checkin_config::Worksheet;
use thiserror::Error;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("failed to authorize against Google: {0}")]
    Auth(#[from] gcp_auth::Error),
    #[error("request to the Google Sheets API failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Google Sheets API rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Google Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("{0} does not exist in the spreadsheet")]
    WorksheetNotFound(Worksheet),
    #[error("invalid Google Sheets API url: {0}")]
    Url(String),
    #[error("failed to encode the service account key: {0}")]
    Credentials(#[from] serde_json::Error),
    #[error("the table store is unavailable")]
    Unavailable,
}
