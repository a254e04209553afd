//! HTTP handlers
//!
//! One handler per route. Each decodes its request, calls the storage
//! gateway and encodes the result.

use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use futures_util::TryStreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::error::{ApiError, status_for};
use crate::storage::{Disposition, FileDownload, Listing, StorageGateway, UploadItem, UploadReport};

/// Shared state handed to every handler
pub type AppState = Arc<StorageGateway>;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Characters kept verbatim in an RFC 5987 `filename*` value.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct MkdirRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    #[serde(flatten)]
    report: UploadReport,
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn list_files(
    State(gateway): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<Listing>, ApiError> {
    let listing = gateway.list(&query.path).await?;
    Ok(Json(listing))
}

pub async fn download_file(
    State(gateway): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let download = gateway.download(&path).await?;
    Ok(stream_file(download))
}

pub async fn view_file(
    State(gateway): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let download = gateway.view(&path).await?;
    Ok(stream_file(download))
}

/// Streams every file part of a multipart body into the gateway.
///
/// A `path` text field sets the destination for the file parts after it;
/// the `path` query parameter gives the initial destination.
pub async fn upload_files(
    State(gateway): State<AppState>,
    Query(query): Query<PathQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut dest = query.path;
    let mut report = UploadReport::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.file_name().map(str::to_owned) else {
            if field.name() == Some("path") {
                dest = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            }
            continue;
        };

        let reader = StreamReader::new(field.map_err(io::Error::other));
        tokio::pin!(reader);
        report.push(gateway.upload_item(&dest, UploadItem::new(name, reader)).await);
    }

    if report.is_empty() {
        return Err(ApiError::BadRequest("no files in upload".into()));
    }

    // Only when nothing was stored does the first failure decide the status.
    let status = match report.results.iter().find_map(|o| o.result.as_ref().err()) {
        Some(err) if report.results.iter().all(|o| o.result.is_err()) => status_for(err),
        _ => StatusCode::OK,
    };

    let body = UploadResponse {
        success: report.all_succeeded(),
        report,
    };
    Ok((status, Json(body)).into_response())
}

pub async fn create_folder(
    State(gateway): State<AppState>,
    payload: Result<Json<MkdirRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let outcome = gateway.mkdir(&request.path, &request.name).await?;
    Ok(Json(json!({ "success": true, "created": outcome.created() })))
}

pub async fn delete_item(
    State(gateway): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    gateway.delete(&request.path).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn not_found() -> ApiError {
    ApiError::NoRoute
}

fn stream_file(download: FileDownload) -> Response {
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_str(download.content_type.essence_str())
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(download.size)),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(download.disposition, &download.file_name),
        ),
    ];
    let body = Body::from_stream(ReaderStream::new(download.file));
    (StatusCode::OK, headers, body).into_response()
}

/// `Content-Disposition` with an ASCII fallback name and the exact UTF-8 name.
fn content_disposition(disposition: Disposition, file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    let value = format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        disposition.as_str(),
        fallback,
        utf8_percent_encode(file_name, FILENAME_ENCODE_SET)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static(disposition.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use tempfile::TempDir;

    fn make_state() -> (TempDir, AppState) {
        let temp = TempDir::new().unwrap();
        let gateway = StorageGateway::open(&temp.path().join("data")).unwrap();
        (temp, Arc::new(gateway))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_content_disposition_encoding() {
        let value = content_disposition(Disposition::Attachment, "résumé \"final\".pdf");
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"r_sum_ _final_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9%20%22final%22.pdf"
        );

        let value = content_disposition(Disposition::Inline, "x.png");
        assert_eq!(
            value.to_str().unwrap(),
            "inline; filename=\"x.png\"; filename*=UTF-8''x.png"
        );
    }

    #[tokio::test]
    async fn test_list_files_returns_items() {
        let (_temp, state) = make_state();
        state.mkdir("", "photos").await.unwrap();

        let Json(listing) = list_files(State(state), Query(PathQuery::default()))
            .await
            .unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(listing.items[0].name, "photos");
    }

    #[tokio::test]
    async fn test_list_files_rejects_traversal() {
        let (_temp, state) = make_state();
        let result = list_files(
            State(state),
            Query(PathQuery {
                path: "../..".into(),
            }),
        )
        .await;

        assert!(matches!(
            result,
            Err(ApiError::Storage(StorageError::Rejected(_)))
        ));
    }

    #[tokio::test]
    async fn test_download_sets_headers() {
        let (_temp, state) = make_state();
        state
            .upload_file("", "notes.txt", &mut &b"hello"[..])
            .await
            .unwrap();

        let response = download_file(State(state.clone()), Path("notes.txt".into()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::CONTENT_LENGTH], "5");
        assert!(
            headers[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .starts_with("attachment;")
        );
        assert_eq!(body_bytes(response).await, b"hello");

        let response = view_file(State(state), Path("notes.txt".into()))
            .await
            .unwrap();
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .starts_with("inline;")
        );
        assert_eq!(body_bytes(response).await, b"hello");
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let (_temp, state) = make_state();
        let result = download_file(State(state), Path("missing.bin".into())).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_folder_and_delete() {
        let (_temp, state) = make_state();

        let Json(value) = create_folder(
            State(state.clone()),
            Ok(Json(MkdirRequest {
                path: String::new(),
                name: "docs".into(),
            })),
        )
        .await
        .unwrap();
        assert_eq!(value, json!({"success": true, "created": true}));

        let Json(value) = create_folder(
            State(state.clone()),
            Ok(Json(MkdirRequest {
                path: String::new(),
                name: "docs".into(),
            })),
        )
        .await
        .unwrap();
        assert_eq!(value["created"], false);

        let Json(value) = delete_item(
            State(state.clone()),
            Ok(Json(DeleteRequest {
                path: "docs".into(),
            })),
        )
        .await
        .unwrap();
        assert_eq!(value, json!({"success": true}));
        assert!(!state.root().join("docs").exists());
    }

    #[tokio::test]
    async fn test_delete_root_is_rejected() {
        let (_temp, state) = make_state();
        let result = delete_item(
            State(state),
            Ok(Json(DeleteRequest {
                path: String::new(),
            })),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
