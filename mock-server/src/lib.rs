use std::{collections::BTreeMap, collections::HashMap, time::Duration};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const XML_ITEM: &str = "<item><id>7</id><name>bolt</name></item>";

/// What `/echo` saw: the request line, every header value, and the raw body.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl Echo {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// One part of a multipart upload as parsed by `/upload`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/items/{id}", get(get_item))
        .route("/search", get(search))
        .route("/echo", any(echo))
        .route("/text", get(text))
        .route("/text-json", get(text_json))
        .route("/xml", get(xml))
        .route("/not-json", get(not_json))
        .route("/upload", post(upload))
        .route("/download/{size}", get(download))
        .route("/status/{code}", get(status))
        .route("/slow/{millis}", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Deterministic download payload of `size` bytes.
pub fn download_bytes(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

async fn get_item(Path(id): Path<String>) -> Json<Item> {
    Json(Item { id })
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(params)
}

async fn echo(method: Method, uri: axum::http::Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        uri: uri.to_string(),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "hello")
}

async fn text_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], r#"{"id":"t1"}"#)
}

async fn xml() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], XML_ITEM)
}

async fn not_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "not json")
}

async fn upload(mut multipart: Multipart) -> Result<Json<Vec<UploadedPart>>, (StatusCode, String)> {
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let content = field
            .bytes()
            .await
            .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;
        parts.push(UploadedPart {
            name,
            file_name,
            content_type,
            content: String::from_utf8_lossy(&content).into_owned(),
        });
    }
    tracing::debug!(parts = parts.len(), "upload received");
    Ok(Json(parts))
}

async fn download(Path(size): Path<usize>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        download_bytes(size),
    )
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn slow(Path(millis): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    "done"
}
