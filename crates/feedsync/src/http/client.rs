//! Query façade over a shared transport and auth provider
//!
//! Every query follows the same steps: attach a token if the query needs
//! one, build the request URL, hand it to the transport. Whatever fails
//! along the way comes back as a [`QueryError`].

use std::sync::Arc;

use super::content::{read_to_bytes, read_to_text};
use super::query::{Query, request_url};
use super::transport::{ContentStream, Transport};
use crate::auth::AuthProvider;
use crate::error::{QueryError, QueryResult};

/// A resolved request, ready for the transport
struct PreparedRequest {
    url: String,
    params: String,
}

/// Authenticated HTTP queries against the remote service
///
/// Cloning is cheap; clones share the same transport and auth provider.
#[derive(Clone)]
pub struct QueryClient {
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
}

impl QueryClient {
    pub fn new(transport: Arc<dyn Transport>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { transport, auth }
    }

    /// GET a query and read the whole response body
    pub fn get_bytes(&self, query: &dyn Query) -> QueryResult<Vec<u8>> {
        let request = self.prepare(query)?;
        log::debug!("GET {} (bytes)", request.url);
        self.transport
            .get_bytes(&request.url)
            .map_err(|source| QueryError::Transport {
                url: request.url,
                source,
            })
    }

    /// POST a query and read the whole response body
    pub fn post_bytes(&self, query: &dyn Query) -> QueryResult<Vec<u8>> {
        let request = self.prepare(query)?;
        log::debug!("POST {} (bytes)", request.url);
        self.transport
            .post_bytes(&request.url, &request.params)
            .map_err(|source| QueryError::Transport {
                url: request.url,
                source,
            })
    }

    /// GET a query and return the open response body
    ///
    /// The caller owns the stream; [`read_to_text`] and [`read_to_bytes`]
    /// close it once drained.
    pub fn get_stream(&self, query: &dyn Query) -> QueryResult<Box<dyn ContentStream>> {
        let request = self.prepare(query)?;
        log::debug!("GET {}", request.url);
        self.transport
            .get(&request.url)
            .map_err(|source| QueryError::Transport {
                url: request.url,
                source,
            })
    }

    /// POST a query and return the open response body
    pub fn post_stream(&self, query: &dyn Query) -> QueryResult<Box<dyn ContentStream>> {
        let request = self.prepare(query)?;
        log::debug!("POST {}", request.url);
        self.transport
            .post(&request.url, &request.params)
            .map_err(|source| QueryError::Transport {
                url: request.url,
                source,
            })
    }

    /// GET a query and decode the response body as UTF-8
    pub fn get_text(&self, query: &dyn Query) -> QueryResult<String> {
        read_to_text(self.get_stream(query)?)
    }

    /// POST a query and decode the response body as UTF-8
    pub fn post_text(&self, query: &dyn Query) -> QueryResult<String> {
        read_to_text(self.post_stream(query)?)
    }

    /// GET a query through the stream path and collect the raw body
    ///
    /// Unlike [`get_bytes`](Self::get_bytes) this always reads in
    /// [`CONTENT_BUFFER_SIZE`](super::CONTENT_BUFFER_SIZE) chunks, whatever
    /// the transport does for its own byte variant.
    pub fn get_buffered(&self, query: &dyn Query) -> QueryResult<Vec<u8>> {
        read_to_bytes(self.get_stream(query)?)
    }

    fn prepare(&self, query: &dyn Query) -> QueryResult<PreparedRequest> {
        if query.requires_auth() {
            let token = self.auth.blocking_token().map_err(QueryError::Auth)?;
            self.transport.set_auth(&token);
        }

        let address = query.address().map_err(QueryError::Address)?;
        let params = query.params();

        Ok(PreparedRequest {
            url: request_url(&address, &params),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::http::QueryDescriptor;
    use anyhow::{Result, anyhow};
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Auth(String),
        Get(String),
        Post(String, String),
    }

    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<Call>>,
        body: Vec<u8>,
        fail: bool,
    }

    impl RecordingTransport {
        fn with_body(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn respond(&self) -> Result<Box<dyn ContentStream>> {
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            Ok(Box::new(Cursor::new(self.body.clone())))
        }
    }

    impl Transport for RecordingTransport {
        fn set_auth(&self, token: &str) {
            self.calls.lock().unwrap().push(Call::Auth(token.to_string()));
        }

        fn get(&self, url: &str) -> Result<Box<dyn ContentStream>> {
            self.calls.lock().unwrap().push(Call::Get(url.to_string()));
            self.respond()
        }

        fn post(&self, url: &str, body: &str) -> Result<Box<dyn ContentStream>> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Post(url.to_string(), body.to_string()));
            self.respond()
        }
    }

    struct FailingAuth;

    impl AuthProvider for FailingAuth {
        fn blocking_token(&self) -> Result<String> {
            Err(anyhow!("account removed"))
        }
    }

    fn client(transport: Arc<RecordingTransport>) -> QueryClient {
        QueryClient::new(transport, Arc::new(StaticToken::new("secret")))
    }

    #[test]
    fn test_get_without_params_has_no_separator() {
        let transport = Arc::new(RecordingTransport::with_body(b"ok"));
        let query = QueryDescriptor::builder("https://reader.example.com/api/0/token").build();

        let bytes = client(transport.clone()).get_bytes(&query).unwrap();
        assert_eq!(bytes, b"ok");
        assert_eq!(
            transport.calls(),
            vec![Call::Get("https://reader.example.com/api/0/token".to_string())]
        );
    }

    #[test]
    fn test_authenticated_get_sets_token_first() {
        let transport = Arc::new(RecordingTransport::with_body(b"{}"));
        let query = QueryDescriptor::builder("https://reader.example.com/api/0/unread-count")
            .param("output", "json")
            .auth(true)
            .build();

        let text = client(transport.clone()).get_text(&query).unwrap();
        assert_eq!(text, "{}");
        assert_eq!(
            transport.calls(),
            vec![
                Call::Auth("secret".to_string()),
                Call::Get("https://reader.example.com/api/0/unread-count?output=json".to_string()),
            ]
        );
    }

    #[test]
    fn test_post_sends_params_as_body() {
        let transport = Arc::new(RecordingTransport::with_body(b"OK"));
        let query = QueryDescriptor::builder("https://reader.example.com/api/0/mark-all-as-read")
            .param("s", "feed/1")
            .param("T", "tok")
            .build();

        let text = client(transport.clone()).post_text(&query).unwrap();
        assert_eq!(text, "OK");
        assert_eq!(
            transport.calls(),
            vec![Call::Post(
                "https://reader.example.com/api/0/mark-all-as-read?s=feed%2F1&T=tok".to_string(),
                "s=feed%2F1&T=tok".to_string(),
            )]
        );
    }

    #[test]
    fn test_post_bytes_and_stream() {
        let transport = Arc::new(RecordingTransport::with_body(b"raw"));
        let query = QueryDescriptor::builder("https://reader.example.com/api/0/edit-tag").build();
        let client = client(transport.clone());

        assert_eq!(client.post_bytes(&query).unwrap(), b"raw");
        let stream = client.post_stream(&query).unwrap();
        assert_eq!(read_to_bytes(stream).unwrap(), b"raw");
        assert_eq!(client.get_buffered(&query).unwrap(), b"raw");
        assert_eq!(transport.calls().len(), 3);
    }

    #[test]
    fn test_auth_failure_is_wrapped() {
        let transport = Arc::new(RecordingTransport::with_body(b""));
        let client = QueryClient::new(transport.clone(), Arc::new(FailingAuth));
        let query = QueryDescriptor::builder("https://reader.example.com/api/0/tag/list")
            .auth(true)
            .build();

        let err = client.get_text(&query).unwrap_err();
        assert!(matches!(err, QueryError::Auth(_)));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_unauthenticated_query_skips_auth_provider() {
        let transport = Arc::new(RecordingTransport::with_body(b"public"));
        let client = QueryClient::new(transport.clone(), Arc::new(FailingAuth));
        let query = QueryDescriptor::builder("https://reader.example.com/public").build();

        assert_eq!(client.get_text(&query).unwrap(), "public");
    }

    #[test]
    fn test_transport_failure_is_wrapped_with_url() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..Default::default()
        });
        let query = QueryDescriptor::builder("https://reader.example.com/api/0/stream/items/ids")
            .param("n", 600)
            .build();

        for result in [
            client(transport.clone()).get_bytes(&query).map(|_| ()),
            client(transport.clone()).post_text(&query).map(|_| ()),
        ] {
            match result.unwrap_err() {
                QueryError::Transport { url, source } => {
                    assert_eq!(url, "https://reader.example.com/api/0/stream/items/ids?n=600");
                    assert!(source.to_string().contains("connection refused"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_bad_address_is_wrapped() {
        let transport = Arc::new(RecordingTransport::with_body(b""));
        let query = QueryDescriptor::builder("::nope::").build();

        let err = client(transport.clone()).get_stream(&query).err().unwrap();
        assert!(matches!(err, QueryError::Address(_)));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        let transport = Arc::new(RecordingTransport::with_body(&[0xff, 0xfe, 0xfd]));
        let query = QueryDescriptor::builder("https://reader.example.com/api/0/stream").build();

        let err = client(transport).get_text(&query).unwrap_err();
        assert!(matches!(err, QueryError::Decode(_)));
    }
}
