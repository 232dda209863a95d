use bytes::Bytes;
use headers::ContentType;
use http::{Response, StatusCode};
use http_body_util::Full;

use crate::error::AppError;
use crate::ResponseTypedHeaderExt as _;

/// Liveness only, the table store is not contacted.
pub fn health() -> Result<Response<Full<Bytes>>, AppError> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .typed_header(ContentType::text_utf8())
        .body(Full::new(Bytes::from_static(b"ok")))?)
}
