use cookie::{Cookie, SameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::Request;
use rand::{thread_rng, Rng as _};

pub const COOKIE_NAME_CSRF_TOKEN: &str = "__Host_csrf_token";

/// Per-browser state carried in cookies. Only the csrf token is needed, the
/// form itself is anonymous.
#[derive(Clone, Debug)]
#[must_use]
pub struct Session {
    // bool is true when the value was changed
    csrf_token: (String, bool),
}

impl Session {
    pub fn new<T>(request: &Request<T>) -> Self {
        let csrf_token = request
            .headers()
            .get_all(COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .map(std::borrow::ToOwned::to_owned)
            .flat_map(Cookie::split_parse)
            .filter_map(std::result::Result::ok)
            .find(|cookie| cookie.name() == COOKIE_NAME_CSRF_TOKEN && !cookie.value().is_empty())
            .map(|cookie| (cookie.value().to_owned(), false));
        let csrf_token = csrf_token.unwrap_or_else(|| {
            (
                thread_rng()
                    .sample_iter(&rand::distributions::Alphanumeric)
                    .take(30)
                    .map(char::from)
                    .collect(),
                true,
            )
        });
        Self { csrf_token }
    }

    #[must_use]
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token.0
    }
}

pub trait ResponseSessionExt {
    #[must_use]
    fn with_session(self, session: Session) -> Self;
}

impl ResponseSessionExt for http::response::Builder {
    fn with_session(self, session: Session) -> Self {
        if let (value, true) = session.csrf_token {
            let cookie = Cookie::build((COOKIE_NAME_CSRF_TOKEN, value))
                .http_only(true)
                .same_site(SameSite::Strict)
                .path("/")
                .build();
            self.header(SET_COOKIE, cookie.to_string())
        } else {
            self
        }
    }
}
