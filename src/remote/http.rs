use super::{Collection, RemoteError, RemoteStore};
use async_trait::async_trait;
use reqwest::{Method, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// JSON-over-HTTP binding of [`RemoteStore`].
///
/// Collections live at `{base}/{collection}/`, single records at
/// `{base}/{collection}/{id}`.
pub struct HttpStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport {
                url: base_url.clone(),
                message: format!("client setup failed: {e}"),
            })?;
        Ok(Self { base_url, client })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}/", self.base_url, collection)
    }

    fn record_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Response, RemoteError> {
        debug!(%method, url, "Sending request");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(|e| RemoteError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(RemoteError::Status {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp)
    }

    async fn json_body(collection: Collection, resp: Response) -> Result<Value, RemoteError> {
        resp.json::<Value>().await.map_err(|e| RemoteError::Decode {
            collection,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    #[instrument(name = "http_list", skip(self))]
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, RemoteError> {
        let url = self.collection_url(collection);
        let resp = self.send(Method::GET, &url, None).await?;
        match Self::json_body(collection, resp).await? {
            Value::Array(items) => Ok(items),
            other => Err(RemoteError::Decode {
                collection,
                message: format!("expected a JSON array, got {other}"),
            }),
        }
    }

    #[instrument(name = "http_create", skip(self, record))]
    async fn create(&self, collection: Collection, record: Value) -> Result<Value, RemoteError> {
        let url = self.collection_url(collection);
        let resp = self.send(Method::POST, &url, Some(&record)).await?;
        Self::json_body(collection, resp).await
    }

    #[instrument(name = "http_update", skip(self, record))]
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<Value, RemoteError> {
        let url = self.record_url(collection, id);
        let resp = self.send(Method::PUT, &url, Some(&record)).await?;
        Self::json_body(collection, resp).await
    }

    #[instrument(name = "http_delete", skip(self))]
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteError> {
        let url = self.record_url(collection, id);
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Answers a single request with a canned response and hands back the
    /// raw request it received.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                 content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn store(base_url: &str) -> HttpStore {
        HttpStore::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn builds_collection_and_record_urls() {
        let store = HttpStore::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.collection_url(Collection::Products),
            "http://localhost:8000/products/"
        );
        assert_eq!(
            store.record_url(Collection::Orders, "17"),
            "http://localhost:8000/orders/17"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let store = HttpStore::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = store.list(Collection::Products).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn non_success_status_carries_code_and_url() {
        let (base, server) = serve_once("404 Not Found", "{}").await;
        let err = store(&base).list(Collection::Products).await.unwrap_err();
        assert_eq!(
            err,
            RemoteError::Status {
                status: 404,
                url: format!("{base}/products/"),
            }
        );
        assert!(server.await.unwrap().starts_with("GET /products/ "));
    }

    #[tokio::test]
    async fn failed_delete_is_a_status_error() {
        let (base, server) = serve_once("500 Internal Server Error", "").await;
        let err = store(&base).delete(Collection::Orders, "9").await.unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 500, .. }), "{err:?}");
        assert!(server.await.unwrap().starts_with("DELETE /orders/9 "));
    }

    #[tokio::test]
    async fn create_posts_record_and_returns_body() {
        let (base, server) = serve_once("201 Created", r#"{"id": 5, "name": "Lamp"}"#).await;
        let record = serde_json::json!({"id": "1", "name": "Lamp"});
        let created = store(&base)
            .create(Collection::Products, record)
            .await
            .unwrap();
        assert_eq!(created["id"], 5);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /products/ "));
        assert!(request.ends_with(r#"{"id":"1","name":"Lamp"}"#), "{request}");
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let (base, server) = serve_once("200 OK", "not json").await;
        let err = store(&base)
            .create(Collection::Orders, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(
            matches!(err, RemoteError::Decode { collection: Collection::Orders, .. }),
            "{err:?}"
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn list_requires_an_array() {
        let (base, server) = serve_once("200 OK", r#"{"items": []}"#).await;
        let err = store(&base).list(Collection::Products).await.unwrap_err();
        match err {
            RemoteError::Decode { collection, message } => {
                assert_eq!(collection, Collection::Products);
                assert!(message.contains("expected a JSON array"), "{message}");
            }
            other => panic!("Unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }
}
