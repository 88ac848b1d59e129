mod diff;
pub mod json;
mod materialize;
mod xml;

use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::QueryResult;
use crate::errors::Result;

use self::xml::XmlDocument;

// Matches an output directive such as `[out:json]` anywhere in the query.
static OUTPUT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*out\s*:\s*(?<format>[A-Za-z]+)").expect("output directive pattern is valid")
});

/// Wire encoding of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    /// Picks the decoder from the query's `[out:...]` directive.
    ///
    /// This is a plain text match, not a query-language parser: `json`
    /// selects JSON, while any other value or no directive at all selects
    /// XML, which is also what the server answers with by default.
    pub fn sniff(query: &str) -> Format {
        let requested = OUTPUT_DIRECTIVE.captures(query)
            .and_then(|captures| captures.name("format"))
            .map(|format| format.as_str());
        match requested {
            Some(format) if format.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Xml,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes a response body without touching the network, using the format
/// requested by `query`.
pub fn decode(body: &[u8], query: &str) -> Result<QueryResult> {
    decode_as(body, Format::sniff(query))
}

/// Decodes a response body in an explicitly chosen format.
///
/// XML bodies containing `action` elements are decoded as diffs.
pub fn decode_as(body: &[u8], format: Format) -> Result<QueryResult> {
    debug!(format = format.as_str(), bytes = body.len(); "Decoding response");
    match format {
        Format::Json => json::decode_json(body),
        Format::Xml => {
            let document = XmlDocument::parse(body)?;
            if document.actions.is_empty() {
                Ok(xml::materialize_snapshot(document))
            } else {
                Ok(diff::materialize_diff(document))
            }
        },
    }
}
