use bytes::Bytes;
use http::{Method, Request};
use http_body::Body;
use http_body_util::{BodyExt as _, LengthLimitError, Limited};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::session::Session;

/// Largest accepted form body.
pub const MAX_FORM_BODY: usize = 16 * 1024;

pub trait CsrfToken {
    fn csrf_token(&self) -> &str;
}

/// An urlencoded form whose csrf token matched the session cookie.
#[derive(Debug)]
pub struct CsrfSafeForm<T: CsrfToken> {
    pub value: T,
}

impl<T: DeserializeOwned + CsrfToken> CsrfSafeForm<T> {
    pub async fn from_request<B>(request: Request<B>, session: &Session) -> Result<Self, AppError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let not_get_or_head = !(request.method() == Method::GET || request.method() == Method::HEAD);
        let body = Limited::new(request.into_body(), MAX_FORM_BODY)
            .collect()
            .await
            .map_err(|err| {
                if err.is::<LengthLimitError>() {
                    AppError::BodyTooLarge
                } else {
                    AppError::Body(err.to_string())
                }
            })?
            .to_bytes();

        let value: T = serde_urlencoded::from_bytes(&body)?;

        if not_get_or_head && value.csrf_token() != session.csrf_token() {
            return Err(AppError::WrongCsrfToken);
        }
        Ok(Self { value })
    }
}
