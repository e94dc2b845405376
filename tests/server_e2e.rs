//! End-to-end tests against a bound server over real HTTP

mod common;

use common::{gradient_image, jpeg_bytes, AllBackgroundRemover};
use image::GenericImageView;
use imgly_retouch::{
    FsImageStore, ImageCodec, RetouchServer, RetouchService, ServerConfig, ServerConfigBuilder,
    ShutdownHandle,
};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinHandle;

struct RunningServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    task: JoinHandle<imgly_retouch::Result<()>>,
    _dir: TempDir,
}

impl RunningServer {
    fn start() -> Self {
        Self::start_with(|builder| builder)
    }

    fn start_with(configure: impl FnOnce(ServerConfigBuilder) -> ServerConfigBuilder) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let builder = ServerConfig::builder()
            .port(0)
            .upload_dir(dir.path().join("uploads"));
        let config = configure(builder).build().expect("valid config");
        let store = Arc::new(FsImageStore::open(&config.upload_dir).expect("open store"));
        let service = Arc::new(RetouchService::new(
            &config,
            Arc::new(AllBackgroundRemover),
            store,
        ));

        let server = RetouchServer::bind(config.bind_addr(), service).expect("bind");
        let addr = server.addr();
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn(server.run());

        Self {
            addr,
            shutdown,
            task,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(self) {
        self.shutdown.shutdown();
        self.task
            .await
            .expect("server task")
            .expect("server exits cleanly");
    }
}

fn image_form(bytes: Vec<u8>) -> Form {
    Form::new().part("image", Part::bytes(bytes).file_name("input.jpg"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_upload_and_download_over_http() {
    let server = RunningServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/upload"))
        .multipart(image_form(jpeg_bytes(&gradient_image(16, 10))))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["processed_image_url"], "/download/processed_image");

    let response = client
        .get(server.url("/download/processed_image"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
    let bytes = response.bytes().await.unwrap();
    assert_eq!(ImageCodec::decode(&bytes).unwrap().dimensions(), (48, 30));

    let response = client
        .get(server.url("/download/nothing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid image type");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_remove_background_over_http() {
    let server = RunningServer::start();
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/remove-background"))
        .multipart(image_form(jpeg_bytes(&gradient_image(12, 12))))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");

    let cutout = ImageCodec::decode(&response.bytes().await.unwrap())
        .unwrap()
        .to_rgba8();
    assert!(cutout.pixels().all(|p| p[3] == 0));

    let response = client
        .post(server.url("/remove-background"))
        .multipart(Form::new().text("note", "no file here"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(response.text().await.unwrap(), "No file part");

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_preflight_and_health_over_http() {
    let server = RunningServer::start();
    let client = reqwest::Client::new();

    let response = client
        .request(reqwest::Method::OPTIONS, server.url("/upload"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-methods")
            .unwrap(),
        "GET, POST, OPTIONS"
    );

    let body: Value = client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["remover"], "all-background");

    let response = client.get(server.url("/missing")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_oversize_upload_over_http_is_413() {
    let server = RunningServer::start_with(|builder| builder.max_upload_bytes(1024));
    let client = reqwest::Client::new();
    let input = jpeg_bytes(&gradient_image(64, 64));
    assert!(input.len() > 1024);

    let response = client
        .post(server.url("/upload"))
        .multipart(image_form(input))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 413);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("exceeds"));

    let response = client
        .get(server.url("/download/original_image"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    server.stop().await;
}
