use bytes::Bytes;
use headers::ContentType;
use http::{Response, StatusCode};
use http_body_util::Full;
use seat_checkin_config::{Config, ConfigError};
use seat_checkin_sheets::SheetsError;

use crate::components::main::main;
use crate::components::Escaped;
use crate::session::{ResponseSessionExt as _, Session};
use crate::ResponseTypedHeaderExt as _;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    File(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] http::Error),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("table store error: {0}")]
    Sheets(#[from] SheetsError),
    #[error("form submission error: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("failed to read the request body: {0}")]
    Body(String),
    #[error("request body too large")]
    BodyTooLarge,
    #[error("failed to render the page: {0}")]
    Render(#[from] core::fmt::Error),
    #[error("wrong csrf token")]
    WrongCsrfToken,
    #[error("page not found")]
    NotFound,
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Form(_) | Self::Body(_) | Self::WrongCsrfToken => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::File(_)
            | Self::Http(_)
            | Self::Config(_)
            | Self::Sheets(_)
            | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error page. Never fails, falling back to plain text if the page
    /// itself cannot be built.
    pub fn build_error_template(self, session: Session, config: &Config) -> Response<Full<Bytes>> {
        let status = self.status();
        let title = status.canonical_reason().unwrap_or("Error");
        let inner = format!(
            "<h1 class=\"center\">{}</h1>\n<div class=\"error-message\">{}</div>\n<p><a \
             href=\"/\">戻る</a></p>\n",
            Escaped(title),
            Escaped(&self.to_string()),
        );
        let body = main(title, config, &inner).unwrap_or(inner);
        Response::builder()
            .with_session(session)
            .status(status)
            .typed_header(ContentType::html())
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| {
                let mut response = Response::new(Full::new(Bytes::from_static(b"error")));
                *response.status_mut() = status;
                response
            })
    }
}
