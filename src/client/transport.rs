use std::time::Duration;

use crate::config::ClientConfig;
use crate::errors::{Error, Result};

/// Raw answer from the server, before any status handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends a form-encoded POST and returns the full response.
///
/// Failing to connect or to read the body must be reported as
/// [`Error::Transport`]; non-200 statuses are returned as-is.
pub trait Transport: Send + Sync {
    fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<Response>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        let client = builder.build().map_err(Error::transport)?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn post_form(&self, endpoint: &str, form: &[(&str, &str)]) -> Result<Response> {
        let response = self.client.post(endpoint)
            .form(form)
            .send()
            .map_err(Error::transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(Error::transport)?;
        Ok(Response {
            status,
            body: body.to_vec(),
        })
    }
}
