//! End-to-end behavior of the manifest HTTP endpoints.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::Path;
use axum::http::{Method, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use hxprezi::cache::{ManifestCache, MemoryCache};
use hxprezi::config::{ServerConfig, UpstreamConfig};
use hxprezi::manifest::{EndpointConfig, HttpFetcher, ProviderConfig, ProviderRegistry};
use hxprezi::{server, AppContext};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

const SAMPLE_M123: &str = r#"{
"attribution": "Provided by Harvard University",
"description": "Prosperous Suzhou Scroll",
"label": "Gusu fan hua tu",
"sequences": [{
  "canvases": [{
    "label": "Prosperous Suzhou Scroll",
    "width": 114981,
    "images": [{
      "resource": {
        "service": {
          "@context": "http://iiif.io/api/image/2/context.json",
          "profile": "http://iiif.io/api/image/2/profiles/level2.json",
          "@id": "https://images.vm-placeholder/ids/iiif/400098039"
        },
        "format": "image/jpeg",
        "height": 3466,
        "width": 114981,
        "@id": "https://images.vm-placeholder/ids/iiif/400098039/full/full/0/native",
        "@type": "dcterms:Image"
      },
      "on": "https://manifests.vm-placeholder/manifests/sample:m123/canvas/canvas-400098039.json",
      "motivation": "sc:painting",
      "@id": "https://manifests.vm-placeholder/manifests/sample:m123/annotation/anno-400098039.json",
      "@type": "oa:Annotation"
    }],
    "height": 3466,
    "@id": "https://manifests.vm-placeholder/manifests/sample:m123/canvas/canvas-400098039.json",
    "@type": "sc:Canvas"
  }],
  "viewingHint": "individuals",
  "@id": "https://manifests.vm-placeholder/manifests/sample:m123/sequence/normal.json",
  "@type": "sc:Sequence"
}],
"@context": "http://iiif.io/api/presentation/2/context.json",
"@id": "https://manifests.vm-placeholder/manifests/sample:m123",
"@type": "sc:Manifest",
"logo": "https://images.vm-placeholder/iiif/harvard_logo.jpg/full/full/0/default.jpg"
}"#;

struct TestApp {
    _dir: TempDir,
    app: Router,
    cache: Arc<MemoryCache>,
}

/// Provider standing in for a remote IIIF server, answering on plain http
async fn spawn_provider() -> String {
    let upstream = Router::new().route(
        "/manifests/:id",
        get(|Path(id): Path<String>| async move {
            match id.as_str() {
                "drs:blah" => axum::Json(serde_json::json!({
                    "@id": "https://iiif.provider.test/manifests/drs:blah",
                    "thumbnail": "https://images.provider.test/ids/iiif/1/full/80,/0/default.jpg"
                }))
                .into_response(),
                "drs:broken" => "this is not json".into_response(),
                _ => (StatusCode::FORBIDDEN, "no").into_response(),
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });
    addr.to_string()
}

fn provider_at(host: &str) -> ProviderConfig {
    let mut manifests = EndpointConfig::new(host, "manifests", "drs:", "iiif.provider.test");
    manifests.scheme = "http".to_string();
    ProviderConfig {
        manifests,
        images: EndpointConfig::new("images.provider.test", "ids/iiif", "", "images.provider.test"),
    }
}

async fn test_app(provider_host: &str) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServerConfig::default();
    config.storage.source_dir = dir.path().join("hx");
    config.storage.cache_dir = Some(dir.path().join("cache"));
    config.hx_servers.manifests = EndpointConfig::new(
        "manifests.example.org",
        "manifests",
        "",
        "manifests.vm-placeholder",
    );
    config.hx_servers.images =
        EndpointConfig::new("images.example.org", "iiif", "", "images.vm-placeholder");
    config.providers = ProviderRegistry::new().with_provider("drs", provider_at(provider_host));
    config.upstream = UpstreamConfig {
        timeout_secs: 2,
        user_agent: "hxprezi-test".to_string(),
    };

    std::fs::create_dir_all(&config.storage.source_dir).unwrap();
    std::fs::write(config.storage.source_dir.join("sample:m123.json"), SAMPLE_M123).unwrap();

    let cache = Arc::new(MemoryCache::new());
    let fetcher = Arc::new(HttpFetcher::new(&config.upstream).unwrap());
    let ctx = AppContext::with_services(config, cache.clone(), fetcher);

    TestApp {
        _dir: dir,
        app: server::build_router(ctx),
        cache,
    }
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn local_manifest_is_rewritten_and_cached() {
    let t = test_app("127.0.0.1:1").await;

    let (status, body) = send(&t.app, Method::GET, "/manifests/sample:m123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["@id"],
        "https://manifests.example.org/manifests/sample:m123"
    );
    assert!(!body.to_string().contains("vm-placeholder"));

    let cached = t.cache.get("sample:m123").await.unwrap();
    assert_eq!(cached, Some(body));
}

#[tokio::test]
async fn repeated_requests_return_identical_manifests() {
    let t = test_app("127.0.0.1:1").await;

    let (_, first) = send(&t.app, Method::GET, "/manifests/sample:m123").await;
    let (status, second) = send(&t.app, Method::GET, "/manifests/sample:m123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
}

#[tokio::test]
async fn too_many_delimiters_is_bad_request() {
    let t = test_app("127.0.0.1:1").await;

    let (status, body) = send(&t.app, Method::GET, "/manifests/too:many:colon:").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], 400);
    assert!(body["error_message"].as_str().unwrap().contains("invalid"));
}

#[tokio::test]
async fn unknown_source_without_local_file_is_not_found() {
    let t = test_app("127.0.0.1:1").await;

    let (status, body) = send(&t.app, Method::GET, "/manifests/chx:nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], 404);
    assert!(body["error_message"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn proxied_manifest_points_at_this_service() {
    let provider = spawn_provider().await;
    let t = test_app(&provider).await;

    let (status, body) = send(&t.app, Method::GET, "/manifests/drs:blah").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["@id"], "https://manifests.example.org/manifests/drs:blah");
    assert_eq!(
        body["thumbnail"],
        "https://images.example.org/ids/iiif/1/full/80,/0/default.jpg"
    );
    assert!(t.cache.get("drs:blah").await.unwrap().is_some());
}

#[tokio::test]
async fn provider_non_json_is_bad_gateway() {
    let provider = spawn_provider().await;
    let t = test_app(&provider).await;

    let (status, body) = send(&t.app, Method::GET, "/manifests/drs:broken").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .contains("error decoding json response"));
}

#[tokio::test]
async fn provider_status_is_passed_through() {
    let provider = spawn_provider().await;
    let t = test_app(&provider).await;

    let (status, body) = send(&t.app, Method::GET, "/manifests/drs:secret").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], 403);
}

#[tokio::test]
async fn unreachable_provider_is_service_unavailable() {
    // Reserve a port and free it so nothing answers there
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let t = test_app(&host).await;

    let (status, body) = send(&t.app, Method::GET, "/manifests/drs:blah").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let message = body["error_message"].as_str().unwrap();
    assert!(message.contains(&format!("http://{}/manifests/drs:blah", host)));
    assert!(t.cache.get("drs:blah").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_invalidates_cached_manifest() {
    let t = test_app("127.0.0.1:1").await;

    send(&t.app, Method::GET, "/manifests/sample:m123").await;
    assert!(t.cache.get("sample:m123").await.unwrap().is_some());

    let (status, _) = send(&t.app, Method::DELETE, "/manifests/sample:m123").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(t.cache.get("sample:m123").await.unwrap().is_none());
}

#[tokio::test]
async fn health_reports_package_version() {
    let t = test_app("127.0.0.1:1").await;

    let (status, body) = send(&t.app, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["package_version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn routes_are_also_served_under_api_prefix() {
    let t = test_app("127.0.0.1:1").await;

    let (status, body) = send(&t.app, Method::GET, "/api/v1/manifests/sample:m123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["@id"],
        "https://manifests.example.org/manifests/sample:m123"
    );

    let (status, _) = send(&t.app, Method::GET, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_uses_error_envelope() {
    let t = test_app("127.0.0.1:1").await;

    let (status, body) = send(&t.app, Method::GET, "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], 404);
}
