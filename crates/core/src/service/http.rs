use crate::config::Settings;
use crate::service::{AnalysisService, SelectedFile};
use crate::workflow::error::{Stage, TransportError};
use anyhow::Context;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpAnalysisService {
    http: reqwest::Client,
    base_url: String,
    lang: String,
}

impl HttpAnalysisService {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_api_base_url()?.to_string();
        Self::new(
            base_url,
            settings.analysis_lang.clone(),
            Duration::from_secs(settings.http_timeout_secs),
        )
    }

    pub fn new(base_url: String, lang: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build analysis service http client")?;

        Ok(Self {
            http,
            base_url,
            lang,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn execute(
        &self,
        stage: Stage,
        req: reqwest::RequestBuilder,
    ) -> Result<String, TransportError> {
        let res = req.send().await.map_err(|e| TransportError {
            stage,
            status: e.status().map(|s| s.as_u16()),
            server_message: None,
            detail: format!("request failed: {e}"),
        })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| TransportError {
            stage,
            status: Some(status.as_u16()),
            server_message: None,
            detail: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            return Err(TransportError {
                stage,
                status: Some(status.as_u16()),
                server_message: server_message(&text),
                detail: format!("status={status}"),
            });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn upload(&self, business_id: u64, file: &SelectedFile) -> Result<(), TransportError> {
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let form = Form::new().part("file", part);
        let req = self
            .http
            .post(self.url(&format!("/upload/{business_id}")))
            .multipart(form);

        self.execute(Stage::Upload, req).await?;
        tracing::debug!(business_id, file_name = %file.file_name, "upload accepted");
        Ok(())
    }

    async fn analyze(&self, business_id: u64) -> Result<Value, TransportError> {
        let req = self
            .http
            .post(self.url(&format!("/analyze/{business_id}")))
            .query(&[("lang", self.lang.as_str())]);

        let text = self.execute(Stage::Analyze, req).await?;
        serde_json::from_str::<Value>(&text).map_err(|e| TransportError {
            stage: Stage::Analyze,
            status: None,
            server_message: None,
            detail: format!("analysis response is not valid JSON: {e}"),
        })
    }
}

/// Extracts a `detail` or `message` string from an error body.
pub fn server_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<Value>(body).ok()?;
    ["detail", "message"]
        .iter()
        .filter_map(|key| json.get(*key))
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: String) -> HttpAnalysisService {
        HttpAnalysisService::new(base_url, "en".to_string(), Duration::from_secs(5)).unwrap()
    }

    fn csv() -> SelectedFile {
        SelectedFile::new("financials.csv", b"revenue,expenses,assets,liabilities\n1,2,3,4\n".to_vec())
    }

    #[test]
    fn server_message_prefers_detail_then_message() {
        assert_eq!(
            server_message(r#"{"detail":"model unavailable"}"#).as_deref(),
            Some("model unavailable")
        );
        assert_eq!(
            server_message(r#"{"status":"error","message":"Bad file"}"#).as_deref(),
            Some("Bad file")
        );
        // FastAPI validation errors carry a list in `detail`.
        assert_eq!(server_message(r#"{"detail":[{"loc":["file"]}]}"#), None);
        assert_eq!(server_message("<html>502</html>"), None);
        assert_eq!(server_message(r#"{"detail":"  "}"#), None);
    }

    #[tokio::test]
    async fn upload_posts_multipart_to_business_path() {
        let app = Router::new().route(
            "/upload/:id",
            post(|Path(id): Path<u64>, headers: HeaderMap, body: Bytes| async move {
                let content_type = headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let body = String::from_utf8_lossy(&body).to_string();
                if id == 7
                    && content_type.starts_with("multipart/form-data")
                    && body.contains("name=\"file\"")
                    && body.contains("filename=\"financials.csv\"")
                {
                    (StatusCode::OK, Json(json!({"message": "File uploaded successfully"})))
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({"detail": "unexpected request"})))
                }
            }),
        );
        let service = client(serve(app).await);
        service.upload(7, &csv()).await.unwrap();
    }

    #[tokio::test]
    async fn upload_failure_carries_service_detail() {
        let app = Router::new().route(
            "/upload/:id",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"detail": "Only CSV and XLSX files allowed."})),
                )
            }),
        );
        let err = client(serve(app).await).upload(1, &csv()).await.unwrap_err();
        assert_eq!(err.stage, Stage::Upload);
        assert_eq!(err.status, Some(400));
        assert_eq!(err.user_message(), "Only CSV and XLSX files allowed.");
    }

    #[tokio::test]
    async fn analyze_returns_raw_payload_and_forwards_lang() {
        let app = Router::new().route(
            "/analyze/:id",
            post(
                |Path(id): Path<u64>, Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "business": id,
                        "lang": q.get("lang").cloned().unwrap_or_default(),
                        "risk": {"score": 820, "category": "Low Risk"},
                    }))
                },
            ),
        );
        let payload = client(serve(app).await).analyze(3).await.unwrap();
        assert_eq!(payload["business"], 3);
        assert_eq!(payload["lang"], "en");
        assert_eq!(payload["risk"]["score"], 820);
    }

    #[tokio::test]
    async fn analyze_500_surfaces_detail() {
        let app = Router::new().route(
            "/analyze/:id",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "model unavailable"})),
                )
            }),
        );
        let err = client(serve(app).await).analyze(1).await.unwrap_err();
        assert_eq!(err.stage, Stage::Analyze);
        assert_eq!(err.status, Some(500));
        assert_eq!(err.user_message(), "model unavailable");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}")).analyze(1).await.unwrap_err();
        assert_eq!(err.server_message, None);
        assert_eq!(err.user_message(), "Analysis failed. Please try again.");
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_transport_error() {
        let app = Router::new().route("/analyze/:id", post(|| async { "<html>ok</html>" }));
        let err = client(serve(app).await).analyze(1).await.unwrap_err();
        assert!(err.detail.contains("not valid JSON"));
    }
}
