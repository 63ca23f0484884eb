//! Shared helpers for the integration tests.
//!
//! The transport is blocking, so every round trip runs on a
//! `spawn_blocking` thread while the mock servers live on the async runtime.

#![allow(dead_code)]

use std::sync::Arc;

use gql_http::{HttpTransport, TransportConfig, TransportConfigBuilder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use wiremock::{MockServer, Request};

pub const CERT_PEM: &[u8] = include_bytes!("../fixtures/localhost.crt");
pub const KEY_PEM: &[u8] = include_bytes!("../fixtures/localhost.key");

pub const CONTINENTS_QUERY: &str = "query getContinents { continents { code name } }";

pub const CONTINENTS_ANSWER: &str = r#"{"data":{"continents":[{"code":"AF","name":"Africa"},{"code":"AN","name":"Antarctica"},{"code":"AS","name":"Asia"},{"code":"EU","name":"Europe"},{"code":"NA","name":"North America"},{"code":"OC","name":"Oceania"},{"code":"SA","name":"South America"}]}}"#;

pub const UPLOAD_MUTATION: &str =
    "mutation($file: Upload!) { singleUpload(file: $file) { id } }";

pub const UPLOAD_ANSWER: &str = r#"{"data":{"singleUpload":{"id":"1"}}}"#;

/// Runs blocking transport code off the async runtime.
pub async fn blocking<R, F>(f: F) -> R
where
    R: Send + 'static,
    F: FnOnce() -> R + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}

/// Endpoint on the mock server.
pub fn graphql_url(server: &MockServer) -> String {
    format!("{}/graphql", server.uri())
}

/// A config builder pointed at `url`.
pub fn config_for(url: &str) -> TransportConfigBuilder {
    TransportConfig::builder().url(url)
}

/// A disconnected transport pointed at `url`.
pub fn transport_for(url: &str) -> HttpTransport {
    HttpTransport::new(config_for(url).build().unwrap())
}

/// The single request the mock server received.
pub async fn only_request(server: &MockServer) -> Request {
    let mut requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "expected exactly one request");
    requests.remove(0)
}

/// One part of a `multipart/form-data` body.
#[derive(Debug)]
pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FormPart {
    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(index, _)| index)
        .collect()
}

fn quoted_param(headers: &str, param: &str) -> Option<String> {
    let start = headers.find(param)? + param.len();
    let end = headers[start..].find('"')?;
    Some(headers[start..start + end].to_string())
}

/// Splits a multipart request body into its parts, in wire order.
///
/// Panics if the request is not `multipart/form-data` or if anything follows
/// the closing delimiter.
pub fn parse_multipart(request: &Request) -> Vec<FormPart> {
    let content_type = request
        .headers
        .get("content-type")
        .expect("missing content-type")
        .to_str()
        .unwrap();
    assert!(
        content_type.starts_with("multipart/form-data"),
        "unexpected content-type {content_type}"
    );
    let boundary = content_type
        .split("boundary=")
        .nth(1)
        .expect("missing boundary")
        .trim_matches('"');
    let delimiter = format!("--{boundary}").into_bytes();

    let body = &request.body;
    let positions = find_all(body, &delimiter);
    assert!(positions.len() >= 2, "no parts in multipart body");

    let mut parts = Vec::new();
    for window in positions.windows(2) {
        let chunk = &body[window[0] + delimiter.len()..window[1]];
        let chunk = chunk.strip_prefix(b"\r\n").unwrap();
        let chunk = chunk.strip_suffix(b"\r\n").unwrap();
        let split = find_all(chunk, b"\r\n\r\n")[0];
        let headers = std::str::from_utf8(&chunk[..split]).unwrap();

        let content_type = headers
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-type")
                    .then(|| value.trim().to_string())
            });
        parts.push(FormPart {
            name: quoted_param(headers, "; name=\"").expect("part without name"),
            file_name: quoted_param(headers, "filename=\""),
            content_type,
            body: chunk[split + 4..].to_vec(),
        });
    }

    let tail = &body[positions[positions.len() - 1] + delimiter.len()..];
    assert!(
        tail == b"--\r\n" || tail == b"--",
        "unexpected data after the closing delimiter"
    );
    parts
}

async fn answer(stream: &mut (impl AsyncReadExt + AsyncWriteExt + Unpin), body: &str) {
    let mut request = Vec::new();
    let mut buffer = [0u8; 4096];
    let header_end = loop {
        let Ok(read) = stream.read(&mut buffer).await else {
            return;
        };
        if read == 0 {
            return;
        }
        request.extend_from_slice(&buffer[..read]);
        if let Some(position) = find_all(&request, b"\r\n\r\n").first() {
            break position + 4;
        }
    };

    let headers = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0);
    while request.len() < header_end + content_length {
        match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(read) => request.extend_from_slice(&buffer[..read]),
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Starts an HTTPS server on `127.0.0.1` presenting the self-signed
/// `localhost` fixture certificate, answering every request with `body`.
///
/// Returns the port.
pub async fn start_tls_server(body: &'static str) -> u16 {
    let certs = rustls_pemfile::certs(&mut &CERT_PEM[..])
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let key = rustls_pemfile::private_key(&mut &KEY_PEM[..])
        .unwrap()
        .unwrap();
    let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                // A client rejecting the certificate aborts the handshake.
                if let Ok(mut tls) = acceptor.accept(stream).await {
                    answer(&mut tls, body).await;
                }
            });
        }
    });

    port
}
