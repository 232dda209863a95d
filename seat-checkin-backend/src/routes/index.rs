use bytes::Bytes;
use headers::ContentType;
use http::{Response, StatusCode};
use http_body_util::Full;
use seat_checkin_config::Config;

use crate::components::checkin_form::{checkin_form, FormValues};
use crate::error::AppError;
use crate::session::{ResponseSessionExt as _, Session};
use crate::ResponseTypedHeaderExt as _;

pub fn index(session: Session, config: &Config) -> Result<Response<Full<Bytes>>, AppError> {
    let html = checkin_form(config, session.csrf_token(), &FormValues::default(), None)?;
    Ok(Response::builder()
        .with_session(session)
        .status(StatusCode::OK)
        .typed_header(ContentType::html())
        .body(Full::new(Bytes::from(html)))?)
}
