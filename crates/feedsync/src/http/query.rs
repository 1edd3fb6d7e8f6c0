//! Query descriptions consumed by the query façade

use anyhow::{Context, Result};
use url::Url;

/// Separator placed between an address and its parameter string
pub const PARAM_SEPARATOR: char = '?';

/// One logical request against the remote service
pub trait Query {
    /// Base address of the request, without parameters
    fn address(&self) -> Result<String>;

    /// URL-encoded parameter string, empty if there are none
    fn params(&self) -> String;

    /// Whether an auth token must be attached before sending
    fn requires_auth(&self) -> bool;
}

/// Join an address and a parameter string
///
/// The separator is only added for a non-empty parameter string.
pub fn request_url(address: &str, params: &str) -> String {
    if params.is_empty() {
        address.to_string()
    } else {
        format!("{}{}{}", address, PARAM_SEPARATOR, params)
    }
}

/// Immutable query built from an address and key/value parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDescriptor {
    address: String,
    params: Vec<(String, String)>,
    requires_auth: bool,
    https: bool,
}

impl QueryDescriptor {
    /// Create a builder for a query against `address`
    pub fn builder(address: impl Into<String>) -> QueryDescriptorBuilder {
        QueryDescriptorBuilder {
            address: address.into(),
            params: Vec::new(),
            requires_auth: false,
            https: false,
        }
    }

    /// Raw key/value parameters, before encoding
    pub fn param_pairs(&self) -> &[(String, String)] {
        &self.params
    }
}

impl Query for QueryDescriptor {
    fn address(&self) -> Result<String> {
        let mut url = Url::parse(&self.address)
            .with_context(|| format!("Invalid query address: {}", self.address))?;

        if url.query().is_some() {
            anyhow::bail!("Query address must not carry parameters: {}", self.address);
        }

        if self.https && url.scheme() == "http" {
            url.set_scheme("https")
                .map_err(|()| anyhow::anyhow!("Cannot upgrade {} to https", self.address))?;
        }

        Ok(url.into())
    }

    fn params(&self) -> String {
        self.params
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    fn requires_auth(&self) -> bool {
        self.requires_auth
    }
}

/// Builder for [`QueryDescriptor`]
#[derive(Debug, Clone)]
pub struct QueryDescriptorBuilder {
    address: String,
    params: Vec<(String, String)>,
    requires_auth: bool,
    https: bool,
}

impl QueryDescriptorBuilder {
    /// Append a parameter; repeated keys are kept in order
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Require an auth token for this query
    pub fn auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    /// Upgrade plain http addresses to https
    pub fn https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    pub fn build(self) -> QueryDescriptor {
        QueryDescriptor {
            address: self.address,
            params: self.params,
            requires_auth: self.requires_auth,
            https: self.https,
        }
    }
}
