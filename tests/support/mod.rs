#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;

use ccna_tracker::{AppState, Store, build_router, serve};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub struct Response {
    pub status: u16,
    pub head: String,
    pub body: String,
}

impl Response {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("json body")
    }
}

/// Starts the full app on an ephemeral port with `root/data` as the data dir
/// and `root/public` as the static dir.
pub async fn spawn_app(root: &Path, videos: serde_json::Value) -> SocketAddr {
    let data = root.join("data");
    let public = root.join("public");
    std::fs::create_dir_all(&data).expect("data dir");
    std::fs::create_dir_all(&public).expect("public dir");
    std::fs::write(public.join("index.html"), "<h1>CCNA Tracker</h1>").expect("index");
    std::fs::write(public.join("tutorials.html"), "<h1>Tutorials</h1>").expect("tutorials");
    std::fs::write(data.join("videos.json"), videos.to_string()).expect("videos");

    let store = Store::open(&data).await.expect("open store");
    let app = build_router(AppState::new(store), &public);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        serve(listener, app, std::future::pending())
            .await
            .expect("serve app")
    });
    addr
}

pub async fn send(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> Response {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let req = match body {
        Some(body) => format!(
            "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\
             Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ),
        None => format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"),
    };
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    Response {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

pub async fn get(addr: SocketAddr, path: &str) -> Response {
    send(addr, "GET", path, None).await
}

pub async fn post(addr: SocketAddr, path: &str, body: &str) -> Response {
    send(addr, "POST", path, Some(body)).await
}

pub fn sample_videos() -> serde_json::Value {
    serde_json::json!([
        {
            "id": "v1",
            "title": "VLAN Basics",
            "channel": "Opentech",
            "thumbnail": "img/v1.jpg",
            "src": "media/v1.mp4",
            "duration": "12:04",
            "views": "1.2K views",
            "timestamp": "2 weeks ago",
            "likes": 10,
            "loves": 2,
            "comments": 0,
            "tags": ["switching", "vlan"]
        },
        {
            "id": "v2",
            "title": "OSPF Single Area",
            "channel": "Opentech",
            "thumbnail": "img/v2.jpg",
            "src": "media/v2.mp4",
            "duration": "20:31",
            "views": 845,
            "likes": 4,
            "loves": 0,
            "comments": 0,
            "tags": ["routing", "ospf"]
        }
    ])
}
