pub mod permits;
pub mod transport;

use log::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::data::QueryResult;
use crate::decode::{decode_as, Format};
use crate::errors::{Error, Result};

use self::permits::PermitPool;
use self::transport::{HttpTransport, Transport};

/// Overpass API client.
///
/// At most `max_parallel` requests are in flight at once across all threads
/// sharing the client; further callers block until a request finishes.
pub struct Client<T = HttpTransport> {
    endpoint: String,
    transport: T,
    permits: PermitPool,
}

impl Client<HttpTransport> {
    /// Client for the public overpass-api.de endpoint, one request at a time.
    pub fn new() -> Result<Self> {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::from_config(config)?;
        Client::with_settings(config.endpoint.as_str(), config.max_parallel, transport)
    }
}

impl<T: Transport> Client<T> {
    pub fn with_settings(endpoint: impl Into<String>, max_parallel: usize, transport: T) -> Result<Self> {
        if max_parallel == 0 {
            return Err(Error::Config("max_parallel must be at least 1".to_string()));
        }
        Ok(Client {
            endpoint: endpoint.into(),
            transport,
            permits: PermitPool::new(max_parallel),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn permits(&self) -> &PermitPool {
        &self.permits
    }

    /// Runs `query` and links the response.
    ///
    /// Use `[out:json]` in the query to get the JSON encoding; anything else
    /// is decoded as XML.
    pub fn query(&self, query: &str) -> Result<QueryResult> {
        let format = Format::sniff(query);
        let body = self.post(query)?;
        match decode_as(&body, format) {
            Ok(result) => {
                info!(format = format.as_str(), count = result.count; "Decoded response");
                Ok(result)
            },
            Err(err) => {
                error!(format = format.as_str(), err = err.to_string().as_str(); "Decoding failed with error");
                Err(err)
            },
        }
    }

    /// Sends `query` and returns the raw body of a 200 response.
    pub fn post(&self, query: &str) -> Result<Vec<u8>> {
        let _permit = self.permits.acquire();
        debug!(endpoint = self.endpoint.as_str(), bytes = query.len(); "Sending query");

        let response = match self.transport.post_form(&self.endpoint, &[("data", query)]) {
            Ok(response) => response,
            Err(err) => {
                error!(endpoint = self.endpoint.as_str(), err = err.to_string().as_str(); "Request failed with error");
                return Err(err);
            },
        };

        if response.status != 200 {
            warn!(endpoint = self.endpoint.as_str(), status = response.status; "Server rejected query");
            return Err(Error::Server {
                status: response.status,
                body: response.body,
            });
        }

        debug!(status = response.status, bytes = response.body.len(); "Received response");
        Ok(response.body)
    }
}
