//! Integration tests for the record-replay cycle against a local server

use std::convert::Infallible;
use std::fs;
use std::net::SocketAddr;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tempfile::TempDir;
use tokio::net::TcpListener;

use httprec::config::RecorderConfig;
use httprec::network::Transport;
use httprec::recording::{Termination, MAX_HOPS};
use httprec::storage::Scenario;
use httprec::{HttprecError, MatchPolicy, Mock, Recorder};

const PAGE: &str = "<html><body>Welcome to ProcessOne</body></html>";
const LOGO: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

async fn route(addr: SocketAddr, req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let builder = Response::builder();

    let response = match path.as_str() {
        "/" => builder
            .status(StatusCode::MOVED_PERMANENTLY)
            .header("location", "/en/")
            .body(Full::new(Bytes::from_static(b"moved"))),
        "/en/" => builder
            .status(StatusCode::FOUND)
            .header("location", format!("http://{addr}/en/home"))
            .body(Full::new(Bytes::new())),
        "/en/home" => builder
            .header("content-type", "text/html; charset=utf-8")
            .header("set-cookie", "session=1")
            .header("set-cookie", "lang=en")
            .body(Full::new(Bytes::from_static(PAGE.as_bytes()))),
        "/logo" => builder
            .header("content-type", "image/png")
            .body(Full::new(Bytes::from_static(LOGO))),
        "/missing" => builder
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from_static(b"nope"))),
        "/nowhere" => builder
            .status(StatusCode::FOUND)
            .body(Full::new(Bytes::new())),
        p if p.starts_with("/loop/") => {
            let n: u32 = p.trim_start_matches("/loop/").parse().unwrap_or(0);
            builder
                .status(StatusCode::FOUND)
                .header("location", format!("/loop/{}", n + 1))
                .body(Full::new(Bytes::new()))
        }
        _ => builder
            .header("content-type", "application/x-httprec-test")
            .body(Full::new(Bytes::from(path))),
    };

    Ok(response.unwrap())
}

/// Start a local HTTP/1.1 server and return its address
async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let service = service_fn(move |req| route(addr, req));
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    addr
}

fn fast_config() -> RecorderConfig {
    RecorderConfig {
        connect_timeout_ms: 1_000,
        request_timeout_ms: 5_000,
        max_hops: MAX_HOPS,
    }
}

#[tokio::test]
async fn test_record_and_replay_redirect_chain() {
    let addr = start_server().await;
    let temp_dir = TempDir::new().unwrap();
    let name = temp_dir.path().join("ProcessOne");
    let start = format!("http://{addr}/");

    let report = Recorder::from_config(&fast_config())
        .record(&start, &name)
        .await
        .unwrap();

    assert_eq!(report.termination, Termination::Response);
    assert_eq!(report.hops, 3);

    let scenario = Scenario::load(temp_dir.path().join("ProcessOne.json")).unwrap();
    let steps = &scenario.sequences[0].steps;
    let urls: Vec<_> = steps.iter().map(|s| s.request_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("http://{addr}/"),
            format!("http://{addr}/en/"),
            format!("http://{addr}/en/home"),
        ]
    );
    assert_eq!(steps[0].response().unwrap().status, 301);
    assert_eq!(steps[1].response().unwrap().status, 302);

    let terminal = steps[2].response().unwrap();
    let body_file = terminal.body_filename.clone().unwrap();
    assert_eq!(body_file, "ProcessOne-1-3.html");
    assert_eq!(
        fs::read_to_string(temp_dir.path().join(&body_file)).unwrap(),
        PAGE
    );

    let url_list = fs::read_to_string(temp_dir.path().join("ProcessOne.url")).unwrap();
    assert_eq!(url_list, format!("{start}\n"));

    // Replay: terminal-only by default
    let mock = Mock::new(temp_dir.path());
    mock.load_scenario("ProcessOne").unwrap();
    let client = mock.client();

    let page = client
        .get(&format!("http://{addr}/en/home"))
        .await
        .unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.body, Bytes::from_static(PAGE.as_bytes()));
    assert_eq!(page.headers["set-cookie"], vec!["session=1", "lang=en"]);

    let err = client.get(&start).await.unwrap_err();
    assert!(err.is_not_found());

    // Replay following the recorded redirects from the top-level URL
    let following = Mock::new(temp_dir.path()).with_policy(MatchPolicy::FollowRedirects);
    following.load_scenario("ProcessOne").unwrap();
    let page = following.client().get(&start).await.unwrap();
    assert!(String::from_utf8_lossy(&page.body).contains("ProcessOne"));
}

#[tokio::test]
async fn test_record_binary_body_round_trip() {
    let addr = start_server().await;
    let temp_dir = TempDir::new().unwrap();
    let url = format!("http://{addr}/logo");

    let report = Recorder::from_config(&fast_config())
        .record(&url, temp_dir.path().join("assets"))
        .await
        .unwrap();
    assert_eq!(report.body_file, Some(temp_dir.path().join("assets-1-1.png")));

    let mock = Mock::new(temp_dir.path());
    mock.load_scenario("assets").unwrap();

    let request = Request::get(url.as_str()).body(()).unwrap();
    let response = mock.client().send(&request).unwrap();
    assert_eq!(response.headers()["content-type"], "image/png");
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), LOGO);
}

#[tokio::test]
async fn test_url_without_path_replays_through_send() {
    let addr = start_server().await;
    let temp_dir = TempDir::new().unwrap();
    let url = format!("http://{addr}");

    Recorder::from_config(&fast_config())
        .record(&url, temp_dir.path().join("bare"))
        .await
        .unwrap();

    let mock = Mock::new(temp_dir.path()).with_policy(MatchPolicy::FollowRedirects);
    mock.load_scenario("bare").unwrap();

    let request = Request::get(url.as_str()).body(()).unwrap();
    let response = mock.client().send(&request).unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body.as_ref(), PAGE.as_bytes());
}

#[tokio::test]
async fn test_recording_twice_accumulates() {
    let addr = start_server().await;
    let temp_dir = TempDir::new().unwrap();
    let name = temp_dir.path().join("api");
    let recorder = Recorder::from_config(&fast_config());

    for (i, path) in ["/a", "/b", "/a"].iter().enumerate() {
        let report = recorder
            .record(&format!("http://{addr}{path}"), &name)
            .await
            .unwrap();
        assert_eq!(report.sequence_ordinal, i + 1);

        let scenario = Scenario::load(temp_dir.path().join("api.json")).unwrap();
        assert_eq!(scenario.count(), i + 1);
    }

    for ordinal in 1..=3 {
        assert!(temp_dir.path().join(format!("api-{ordinal}-1.data")).exists());
    }

    let url_list = fs::read_to_string(temp_dir.path().join("api.url")).unwrap();
    assert_eq!(url_list, format!("http://{addr}/a\nhttp://{addr}/b\n"));

    let mock = Mock::new(temp_dir.path());
    mock.load_scenario("api").unwrap();
    let first = mock
        .client()
        .replay("GET", &format!("http://{addr}/a"))
        .unwrap();
    assert_eq!(first.body, Bytes::from_static(b"/a"));
}

#[tokio::test]
async fn test_non_success_status_is_recorded() {
    let addr = start_server().await;
    let temp_dir = TempDir::new().unwrap();

    let report = Recorder::from_config(&fast_config())
        .record(&format!("http://{addr}/missing"), temp_dir.path().join("errors"))
        .await
        .unwrap();
    assert_eq!(report.termination, Termination::Response);

    let mock = Mock::new(temp_dir.path());
    mock.load_scenario("errors").unwrap();
    let exchange = mock
        .client()
        .replay("GET", &format!("http://{addr}/missing"))
        .unwrap();
    assert_eq!(exchange.status, 404);
    assert_eq!(exchange.body, Bytes::from_static(b"nope"));
}

#[tokio::test]
async fn test_redirect_loop_stops_at_hop_limit() {
    let addr = start_server().await;
    let temp_dir = TempDir::new().unwrap();

    let report = Recorder::from_config(&fast_config())
        .record(&format!("http://{addr}/loop/0"), temp_dir.path().join("loop"))
        .await
        .unwrap();

    assert!(report.truncated());
    assert_eq!(report.hops, MAX_HOPS);
    assert!(report.body_file.is_none());

    let scenario = Scenario::load(temp_dir.path().join("loop.json")).unwrap();
    let steps = &scenario.sequences[0].steps;
    assert_eq!(steps.len(), MAX_HOPS);
    assert!(steps.iter().all(|s| s.is_redirect()));
    assert_eq!(steps[9].request_url, format!("http://{addr}/loop/9"));
}

#[tokio::test]
async fn test_redirect_without_location_stops() {
    let addr = start_server().await;
    let temp_dir = TempDir::new().unwrap();

    let report = Recorder::from_config(&fast_config())
        .record(&format!("http://{addr}/nowhere"), temp_dir.path().join("nowhere"))
        .await
        .unwrap();
    assert_eq!(report.termination, Termination::InvalidRedirect);
    assert_eq!(report.hops, 1);
}

#[tokio::test]
async fn test_connection_refused_is_captured() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let temp_dir = TempDir::new().unwrap();
    let url = format!("http://127.0.0.1:{port}/");

    let report = Recorder::from_config(&fast_config())
        .record(&url, temp_dir.path().join("refused"))
        .await
        .unwrap();
    assert_eq!(report.termination, Termination::TransportError);

    let scenario = Scenario::load(temp_dir.path().join("refused.json")).unwrap();
    let steps = &scenario.sequences[0].steps;
    assert_eq!(steps.len(), 1);
    assert!(steps[0].error().is_some());
    assert!(steps[0].response().is_none());

    let body_files = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter(|e| {
            let name = e.as_ref().unwrap().file_name();
            name.to_string_lossy().starts_with("refused-")
        })
        .count();
    assert_eq!(body_files, 0);

    let mock = Mock::new(temp_dir.path());
    mock.load_scenario("refused").unwrap();
    let err = mock.client().replay("GET", &url).unwrap_err();
    assert!(matches!(err, HttprecError::Transport(_)));
}

#[tokio::test]
async fn test_replay_from_loaded_fixture_without_network() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("offline.json"),
        r#"{"sequences": [{"steps": [
            {"method": "GET", "requestUrl": "https://api.example/v1/status",
             "response": {"status": 200,
                          "headers": {"Content-Type": ["application/json"]},
                          "bodyFilename": "offline-1-1.json"}}
        ]}]}"#,
    )
    .unwrap();
    fs::write(temp_dir.path().join("offline-1-1.json"), r#"{"ok":true}"#).unwrap();

    let mock = Mock::new(temp_dir.path());
    mock.load_scenario("offline").unwrap();

    let exchange = mock
        .client()
        .get("https://api.example/v1/status")
        .await
        .unwrap();
    assert_eq!(exchange.header("content-type"), Some("application/json"));
    assert_eq!(exchange.body, Bytes::from_static(br#"{"ok":true}"#));
    assert_eq!(mock.stats().hits, 1);
}
