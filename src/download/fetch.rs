//! 分段下载的网络层：`SegmentFetcher` 抽象与基于 reqwest 的实现。

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// 单次请求；超时、非 2xx 均返回错误。实现需可在多个 worker 间共享。
pub trait SegmentFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        // reqwest is built without decompression; ask for identity so the body length
        // matches the content-length recorded in the capture.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl SegmentFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = resp
            .bytes()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    /// 在独立线程的 tokio runtime 上启动本地服务，返回 base url。
    fn spawn_server() -> String {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let app = Router::new()
                    .route("/v/720/0.bin", get(|| async { vec![7u8; 1000] }))
                    .route(
                        "/v/720/1.bin",
                        get(|| async { (StatusCode::NOT_FOUND, "gone") }),
                    )
                    .route(
                        "/v/720/2.bin",
                        get(|| async {
                            tokio::time::sleep(Duration::from_secs(5)).await;
                            "late"
                        }),
                    );
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });
        let addr = rx.recv().unwrap();
        format!("http://{addr}")
    }

    #[test]
    fn http_fetcher_handles_success_status_and_timeout() {
        let base = spawn_server();
        let fetcher = HttpFetcher::new(Duration::from_millis(500)).unwrap();

        let body = fetcher.fetch(&format!("{base}/v/720/0.bin")).unwrap();
        assert_eq!(body.len(), 1000);
        assert!(body.iter().all(|&b| b == 7));

        assert_eq!(
            fetcher.fetch(&format!("{base}/v/720/1.bin")),
            Err(FetchError::Status(404))
        );

        assert!(matches!(
            fetcher.fetch(&format!("{base}/v/720/2.bin")),
            Err(FetchError::Transport(_))
        ));
    }

    #[test]
    fn connection_refused_is_transport_error() {
        let fetcher = HttpFetcher::new(Duration::from_millis(500)).unwrap();
        // 端口 9 (discard) 在测试环境里通常无人监听
        let err = fetcher.fetch("http://127.0.0.1:9/0.bin").unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }
}
