use bytes::Bytes;
use headers::ContentType;
use http::{Request, Response, StatusCode};
use http_body::Body;
use http_body_util::Full;
use seat_checkin_sheets::TableStore;
use serde::Deserialize;

use crate::checkin::Lookup;
use crate::components::checkin_form::{checkin_form, FormValues};
use crate::csrf_protection::{CsrfSafeForm, CsrfToken};
use crate::error::AppError;
use crate::session::{ResponseSessionExt as _, Session};
use crate::{AppState, ResponseTypedHeaderExt as _};

#[derive(Deserialize, Debug)]
pub struct CheckInPayload {
    csrf_token: String,
    #[serde(default)]
    identifier: String,
    /// Present (as `on`) when the checkbox is ticked.
    #[serde(default)]
    by_name: Option<String>,
}

impl CheckInPayload {
    fn lookup(&self) -> Lookup {
        if self.by_name.is_some() {
            Lookup::Name
        } else {
            Lookup::Identifier
        }
    }
}

impl CsrfToken for CheckInPayload {
    fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

pub async fn checkin<S, B>(
    request: Request<B>,
    session: &Session,
    state: &AppState<S>,
) -> Result<Response<Full<Bytes>>, AppError>
where
    S: TableStore,
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let form = CsrfSafeForm::<CheckInPayload>::from_request(request, session).await?;
    let lookup = form.value.lookup();
    let outcome = state
        .check_in
        .check_in(&form.value.identifier, lookup)
        .await;

    let status = match &outcome {
        Err(err) if err.is_provider_error() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    let values = FormValues {
        identifier: &form.value.identifier,
        by_name: lookup == Lookup::Name,
    };
    let html = checkin_form(
        &state.config,
        session.csrf_token(),
        &values,
        Some(&outcome),
    )?;
    Ok(Response::builder()
        .with_session(session.clone())
        .status(status)
        .typed_header(ContentType::html())
        .body(Full::new(Bytes::from(html)))?)
}
