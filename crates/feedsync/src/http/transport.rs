//! HTTP transport abstraction and the ureq-backed implementation
//!
//! Uses synchronous HTTP (ureq) to be executor-agnostic. One transport is
//! meant to be shared by every syncer in the process.

use anyhow::{Context, Result};
use std::io::{self, Cursor, Read};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use super::content::read_to_bytes;
use crate::config::ReaderSettings;

/// A response body the caller reads and then closes
///
/// Dropping a stream releases it; `close` exists so implementations can
/// report a failure while doing so.
pub trait ContentStream: Read + Send {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: ContentStream + ?Sized> ContentStream for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl ContentStream for Cursor<Vec<u8>> {}

/// Performs raw GET/POST requests
pub trait Transport: Send + Sync {
    /// Set the token attached to subsequent requests
    fn set_auth(&self, token: &str);

    /// GET `url` and return the open response body
    fn get(&self, url: &str) -> Result<Box<dyn ContentStream>>;

    /// POST `body` as a form to `url` and return the open response body
    fn post(&self, url: &str, body: &str) -> Result<Box<dyn ContentStream>>;

    /// GET `url` and read the whole response body
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        Ok(read_to_bytes(self.get(url)?)?)
    }

    /// POST `body` to `url` and read the whole response body
    fn post_bytes(&self, url: &str, body: &str) -> Result<Vec<u8>> {
        Ok(read_to_bytes(self.post(url, body)?)?)
    }
}

/// Response body handed out by [`UreqTransport`]
struct UreqStream(ureq::BodyReader<'static>);

impl Read for UreqStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl ContentStream for UreqStream {}

/// Blocking transport on top of a shared `ureq::Agent`
pub struct UreqTransport {
    agent: ureq::Agent,
    auth_scheme: String,
    auth: RwLock<Option<String>>,
}

impl UreqTransport {
    const FORM_CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded";

    /// Create a transport with a global per-request timeout
    ///
    /// # Arguments
    /// * `timeout` - Upper bound for one whole request/response exchange
    /// * `auth_scheme` - Prefix placed before the token in the Authorization header
    pub fn new(timeout: Duration, auth_scheme: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self::with_agent(agent, auth_scheme)
    }

    /// Create a transport around an existing agent, e.g. one shared with
    /// other clients in the process
    pub fn with_agent(agent: ureq::Agent, auth_scheme: impl Into<String>) -> Self {
        Self {
            agent,
            auth_scheme: auth_scheme.into(),
            auth: RwLock::new(None),
        }
    }

    /// Create a transport from reader settings
    pub fn from_settings(settings: &ReaderSettings) -> Self {
        Self::new(settings.timeout(), settings.auth_scheme.clone())
    }

    /// The Authorization header value currently attached to requests
    pub fn auth_header(&self) -> Option<String> {
        self.auth
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| format!("{}{}", self.auth_scheme, token))
    }
}

impl Transport for UreqTransport {
    fn set_auth(&self, token: &str) {
        *self.auth.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    }

    fn get(&self, url: &str) -> Result<Box<dyn ContentStream>> {
        let mut request = self.agent.get(url);
        if let Some(header) = self.auth_header() {
            request = request.header("Authorization", &header);
        }

        let response = request
            .call()
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        Ok(Box::new(UreqStream(response.into_body().into_reader())))
    }

    fn post(&self, url: &str, body: &str) -> Result<Box<dyn ContentStream>> {
        let mut request = self
            .agent
            .post(url)
            .header("Content-Type", Self::FORM_CONTENT_TYPE);
        if let Some(header) = self.auth_header() {
            request = request.header("Authorization", &header);
        }

        let response = request
            .send(body)
            .with_context(|| format!("Failed to send POST request to {}", url))?;

        Ok(Box::new(UreqStream(response.into_body().into_reader())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTransport(Vec<u8>);

    impl Transport for FixedTransport {
        fn set_auth(&self, _token: &str) {}

        fn get(&self, _url: &str) -> Result<Box<dyn ContentStream>> {
            Ok(Box::new(Cursor::new(self.0.clone())))
        }

        fn post(&self, _url: &str, body: &str) -> Result<Box<dyn ContentStream>> {
            Ok(Box::new(Cursor::new(body.as_bytes().to_vec())))
        }
    }

    #[test]
    fn test_default_byte_variants_read_whole_body() {
        let transport = FixedTransport(b"{\"max\":1000}".to_vec());
        assert_eq!(transport.get_bytes("http://x").unwrap(), b"{\"max\":1000}");
        assert_eq!(transport.post_bytes("http://x", "a=1&b=2").unwrap(), b"a=1&b=2");
    }

    #[test]
    fn test_auth_header_uses_scheme() {
        let transport = UreqTransport::new(Duration::from_secs(5), "GoogleLogin auth=");
        assert_eq!(transport.auth_header(), None);

        transport.set_auth("abc123");
        assert_eq!(
            transport.auth_header().as_deref(),
            Some("GoogleLogin auth=abc123")
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = ReaderSettings {
            auth_scheme: "Bearer ".to_string(),
            ..ReaderSettings::default()
        };
        let transport = UreqTransport::from_settings(&settings);
        transport.set_auth("tok");
        assert_eq!(transport.auth_header().as_deref(), Some("Bearer tok"));
    }
}
