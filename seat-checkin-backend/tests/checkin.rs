use std::sync::Arc;

use bytes::Bytes;
use figment::providers::{Format as _, Toml};
use figment::Figment;
use http::header::{CONTENT_TYPE, COOKIE, IF_NONE_MATCH, SET_COOKIE};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt as _, Full};
use seat_checkin_backend::routes::indexcss::INDEX_CSS_VERSION;
use seat_checkin_backend::{handle, serve, AppState};
use seat_checkin_config::{from_figment, Worksheet};
use seat_checkin_sheets::{InMemoryTables, Table};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};

const REGISTERED: Worksheet = Worksheet::Index(0);
const ROSTER: Worksheet = Worksheet::Index(2);

fn state(settings: &str, store: &InMemoryTables) -> Arc<AppState<InMemoryTables>> {
    let toml = format!("backend = \"memory\"\n{settings}");
    let config = from_figment(&Figment::from(Toml::string(&toml))).unwrap();
    Arc::new(AppState::new(config, store.clone()))
}

fn roster_store() -> InMemoryTables {
    let mut roster = Table::new(["no", "名前", "座席"]);
    roster.push_record(&[("no", "s001"), ("名前", "Taro"), ("座席", "5")]);
    roster.push_record(&[("no", "sp002"), ("名前", "Hanako"), ("座席", "12")]);
    InMemoryTables::new().with_table(ROSTER, roster)
}

async fn body_text(response: Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Loads the page like a browser and returns the csrf token from the cookie.
async fn csrf_token(state: &Arc<AppState<InMemoryTables>>) -> String {
    let request = Request::builder()
        .uri("/")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = handle(request, Arc::clone(state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_owned();
    let token = cookie
        .strip_prefix("__Host_csrf_token=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_owned();
    assert!(body_text(response).await.contains(&token));
    token
}

async fn submit(
    state: &Arc<AppState<InMemoryTables>>,
    token: &str,
    form: &str,
) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(COOKIE, format!("__Host_csrf_token={token}"))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Full::new(Bytes::from(format!("csrf_token={token}&{form}"))))
        .unwrap();
    let response = handle(request, Arc::clone(state)).await;
    let status = response.status();
    (status, body_text(response).await)
}

#[tokio::test]
async fn roster_identifier_check_in_and_duplicate() {
    let store = roster_store();
    let state = state("", &store);
    let token = csrf_token(&state).await;

    let (status, html) = submit(&state, &token, "identifier=s001").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Taroさんの席番号は5番テーブルです。"), "{html}");

    let registered = store.table(&REGISTERED);
    assert_eq!(registered.len(), 1);
    let record = registered.find("名前", "Taro").unwrap();
    assert_eq!(record.get("座席"), Some("5"));

    let (status, html) = submit(&state, &token, "identifier=s001").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Taroさんは既に登録されています。"), "{html}");
    assert!(html.contains(r#"class="warning-message""#));
    assert_eq!(store.table(&REGISTERED).len(), 1);
}

#[tokio::test]
async fn roster_name_check_in() {
    let store = roster_store();
    let state = state("", &store);
    let token = csrf_token(&state).await;

    let (_, html) = submit(&state, &token, "identifier=Hanako&by_name=on").await;
    assert!(html.contains("Hanakoさんの席番号は12番テーブルです。"), "{html}");

    let (_, html) = submit(&state, &token, "identifier=Saburo&by_name=on").await;
    assert!(html.contains("名前が見つかりません。"), "{html}");
    assert!(html.contains(r#"value="Saburo""#));
    assert_eq!(store.table(&REGISTERED).len(), 1);
}

#[tokio::test]
async fn unknown_identifier_is_a_warning() {
    let store = roster_store();
    let state = state("", &store);
    let token = csrf_token(&state).await;

    let (status, html) = submit(&state, &token, "identifier=s999").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("番号が見つかりません。"), "{html}");
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn wrong_csrf_token_is_rejected() {
    let store = roster_store();
    let state = state("", &store);
    let token = csrf_token(&state).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(COOKIE, format!("__Host_csrf_token={token}"))
        .body(Full::new(Bytes::from("csrf_token=forged&identifier=s001")))
        .unwrap();
    let response = handle(request, Arc::clone(&state)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let store = roster_store();
    let state = state("", &store);
    let token = csrf_token(&state).await;

    let (status, _) = submit(&state, &token, &format!("identifier={}", "9".repeat(20_000))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn random_mode_draws_from_the_pool() {
    let store = InMemoryTables::new();
    let state = state("mode = \"random\"", &store);
    let token = csrf_token(&state).await;

    let (status, html) = submit(&state, &token, "identifier=%E6%97%A5%E7%BD%AE%E5%A4%AA%E9%83%8E").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("日置太郎さんの席番号は"), "{html}");

    let registered = store.table(&REGISTERED);
    assert_eq!(registered.len(), 1);
    let seat: u32 = registered
        .find("名前", "日置太郎")
        .and_then(|record| record.get("座席"))
        .unwrap()
        .parse()
        .unwrap();
    assert!((3..=21).contains(&seat) && seat != 4, "seat {seat}");

    let (_, html) = submit(&state, &token, "identifier=%E6%97%A5%E7%BD%AE%E5%A4%AA%E9%83%8E").await;
    assert!(html.contains("既に登録されています"), "{html}");
    assert_eq!(store.table(&REGISTERED).len(), 1);
}

#[tokio::test]
async fn random_mode_closes_at_the_limit() {
    let mut registered = Table::new(["名前", "座席"]);
    registered.push_record(&[("名前", "A"), ("座席", "3")]);
    registered.push_record(&[("名前", "B"), ("座席", "5")]);
    let store = InMemoryTables::new().with_table(REGISTERED, registered);
    let state = state("mode = \"random\"\n[seating]\nmax_registrations = 2", &store);
    let token = csrf_token(&state).await;

    let (status, html) = submit(&state, &token, "identifier=C").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("定員（2名）に達したため、受付を終了しました。"), "{html}");
    assert!(html.contains(r#"class="info-message""#));
    assert!(html.contains(r#"name="identifier""#));
    assert_eq!(store.save_count(), 0);
    assert_eq!(store.table(&REGISTERED).len(), 2);
}

#[tokio::test]
async fn unavailable_store_is_reported() {
    let store = roster_store();
    let state = state("", &store);
    let token = csrf_token(&state).await;
    store.set_unavailable(true);

    let (status, html) = submit(&state, &token, "identifier=s001").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(html.contains("データの取得に失敗しました。"), "{html}");
    assert!(html.contains(r#"value="s001""#));
}

#[tokio::test]
async fn stylesheet_health_and_not_found() {
    let state = state("", &InMemoryTables::new());

    let request = Request::builder()
        .uri("/index.css")
        .header(IF_NONE_MATCH, format!("\"{}\"", &*INDEX_CSS_VERSION))
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = handle(request, Arc::clone(&state)).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    let request = Request::builder()
        .uri("/health")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = handle(request, Arc::clone(&state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let request = Request::builder()
        .uri("/admin")
        .body(Full::new(Bytes::new()))
        .unwrap();
    let response = handle(request, Arc::clone(&state)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Not Found"));
}

#[tokio::test]
async fn serves_over_tcp_and_shuts_down() {
    let state = state("", &InMemoryTables::new());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, state, async {
        let _ = shutdown_rx.await;
    }));

    let mut stream = TcpStream::connect(address).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("ok"), "{response}");

    shutdown_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
