use std::{io::Write, time::Duration};

use flow_viewer::{
    error::ViewerError,
    resources::{MeshSource, Progress, resolve},
};

use crate::common::test_utils::{ascii_stl, binary_stl, box_triangles};

mod common;

/// Answers a single HTTP request on a local port, writing the body in `parts`
/// with a pause in between. Returns the server's base url.
async fn serve_once(status: &'static str, parts: Vec<Vec<u8>>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let len: usize = parts.iter().map(Vec::len).sum();
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
            status, len
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for part in parts {
            socket.write_all(&part).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let _ = socket.shutdown().await;
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn resolves_bytes_in_memory() {
    let bytes = binary_stl(&box_triangles([0.0; 3], [1.0; 3]));
    let mut events = Vec::new();

    let mesh = resolve(MeshSource::from(bytes), |p| events.push(p))
        .await
        .unwrap();

    assert_eq!(mesh.triangle_count(), 12);
    // nothing to download
    assert!(events.is_empty());
}

#[tokio::test]
async fn resolves_local_files_and_reports_progress() {
    let text = ascii_stl("part", &box_triangles([0.0; 3], [3.0, 2.0, 1.0]));
    let mut file = tempfile::Builder::new().suffix(".stl").tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    let locator = file.path().to_str().unwrap().to_string();
    let mut events: Vec<Progress> = Vec::new();

    let mesh = resolve(MeshSource::from(locator), |p| events.push(p))
        .await
        .unwrap();

    assert_eq!(mesh.triangle_count(), 12);
    let len = text.len() as u64;
    assert_eq!(
        events,
        vec![Progress {
            received: len,
            total: Some(len)
        }]
    );
    assert_eq!(events[0].percent(), Some(100.0));
}

#[tokio::test]
async fn file_urls_are_read_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".obj").tempfile().unwrap();
    file.write_all(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
    let locator = format!("file://{}", file.path().display());

    let mesh = resolve(MeshSource::Remote(locator), |_| {}).await.unwrap();

    assert_eq!(mesh.triangle_count(), 1);
}

#[tokio::test]
async fn missing_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let locator = dir.path().join("nope.stl").to_str().unwrap().to_string();

    let result = resolve(MeshSource::Remote(locator), |_| {}).await;

    assert!(matches!(result, Err(ViewerError::SourceUnavailable(_))));
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    // nothing listens on the discard port
    let result = resolve(MeshSource::from("http://127.0.0.1:9/model.stl"), |_| {}).await;

    assert!(matches!(result, Err(ViewerError::SourceUnavailable(_))));
}

#[tokio::test]
async fn downloads_report_progress_per_chunk() {
    let bytes = binary_stl(&box_triangles([0.0; 3], [2.0; 3]));
    let len = bytes.len() as u64;
    let (head, tail) = bytes.split_at(bytes.len() / 2);
    let base = serve_once("200 OK", vec![head.to_vec(), tail.to_vec()]).await;
    let mut events: Vec<Progress> = Vec::new();

    let mesh = resolve(MeshSource::from(format!("{}/part.stl", base)), |p| {
        events.push(p)
    })
    .await
    .unwrap();

    assert_eq!(mesh.triangle_count(), 12);
    assert!(events.len() > 1);
    assert!(events.windows(2).all(|w| w[0].received <= w[1].received));
    assert!(events.iter().all(|p| p.total == Some(len)));
    assert_eq!(events.last().map(|p| p.received), Some(len));
}

#[tokio::test]
async fn not_found_is_unavailable() {
    let base = serve_once("404 Not Found", vec![]).await;
    let mut events: Vec<Progress> = Vec::new();

    let result = resolve(MeshSource::from(format!("{}/missing.stl", base)), |p| {
        events.push(p)
    })
    .await;

    match result {
        Err(ViewerError::SourceUnavailable(reason)) => assert!(reason.contains("404")),
        other => panic!("expected an unavailable source, got {:?}", other),
    }
    assert!(events.is_empty());
}

#[tokio::test]
async fn undecodable_file_is_a_decode_error() {
    let mut file = tempfile::Builder::new().suffix(".stl").tempfile().unwrap();
    file.write_all(b"this is not an stl file at all").unwrap();
    let locator = file.path().to_str().unwrap().to_string();

    let result = resolve(MeshSource::Remote(locator), |_| {}).await;

    assert!(matches!(result, Err(ViewerError::Decode(_))));
}

#[test]
fn progress_without_total_has_no_percentage() {
    let p = Progress {
        received: 512,
        total: None,
    };
    assert_eq!(p.percent(), None);
    assert_eq!(
        Progress {
            received: 1,
            total: Some(4)
        }
        .percent(),
        Some(25.0)
    );
}

#[test]
fn in_memory_sources_stay_out_of_debug_output() {
    let source = MeshSource::InMemory(vec![0u8; 4096]);
    assert_eq!(format!("{:?}", source), "InMemory(4096)");
    assert_eq!(source.describe(), "<4096 bytes in memory>");
}
