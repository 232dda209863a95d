use core::hash::{Hash as _, Hasher as _};
use core::time::Duration;
use std::collections::hash_map::DefaultHasher;

use bytes::Bytes;
use headers::{CacheControl, ContentType, ETag, HeaderMapExt as _, IfNoneMatch};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use once_cell::sync::Lazy;

use crate::error::AppError;
use crate::ResponseTypedHeaderExt as _;

static INDEX_CSS: &[u8] = include_bytes!("../../frontend/index.css");

/// Content hash of the stylesheet, used for cache busting and as the etag.
pub static INDEX_CSS_VERSION: Lazy<String> = Lazy::new(|| {
    let mut hasher = DefaultHasher::new();
    INDEX_CSS.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
});

static INDEX_CSS_ETAG: Lazy<Option<ETag>> =
    Lazy::new(|| format!("\"{}\"", &*INDEX_CSS_VERSION).parse().ok());

pub fn indexcss<B>(request: &Request<B>) -> Result<Response<Full<Bytes>>, AppError> {
    let if_none_match: Option<IfNoneMatch> = request.headers().typed_get();
    let Some(etag) = INDEX_CSS_ETAG.as_ref() else {
        return Ok(Response::builder()
            .status(StatusCode::OK)
            .typed_header(ContentType::from(mime::TEXT_CSS_UTF_8))
            .body(Full::new(Bytes::from_static(INDEX_CSS)))?);
    };
    if if_none_match.map_or(true, |header| header.precondition_passes(etag)) {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .typed_header(ContentType::from(mime::TEXT_CSS_UTF_8))
            .typed_header(etag.clone())
            .typed_header(
                CacheControl::new()
                    .with_immutable()
                    .with_public()
                    .with_max_age(Duration::from_secs(31_536_000)),
            )
            .body(Full::new(Bytes::from_static(INDEX_CSS)))?)
    } else {
        Ok(Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .typed_header(etag.clone())
            .body(Full::new(Bytes::new()))?)
    }
}

#[cfg(test)]
mod tests {
    use http::header::{ETAG, IF_NONE_MATCH};

    use super::*;

    #[test]
    fn serves_css_with_etag() {
        let request = Request::builder().uri("/index.css").body(()).unwrap();
        let response = indexcss(&request).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[ETAG].to_str().unwrap(),
            format!("\"{}\"", &*INDEX_CSS_VERSION)
        );
    }

    #[test]
    fn matching_etag_is_not_modified() {
        let request = Request::builder()
            .uri("/index.css")
            .header(IF_NONE_MATCH, format!("\"{}\"", &*INDEX_CSS_VERSION))
            .body(())
            .unwrap();
        let response = indexcss(&request).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

        let request = Request::builder()
            .uri("/index.css")
            .header(IF_NONE_MATCH, "\"stale\"")
            .body(())
            .unwrap();
        assert_eq!(indexcss(&request).unwrap().status(), StatusCode::OK);
    }
}
