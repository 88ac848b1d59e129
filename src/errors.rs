use std::{fmt, io, num::{ParseFloatError, ParseIntError}, str::Utf8Error};
use quick_xml::events::attributes::AttrError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum Error {
    /// The request could not be sent or its body could not be read.
    Transport(BoxError),
    /// The server answered with something other than 200.
    Server {
        status: u16,
        body: Vec<u8>,
    },
    /// The response body is not a well-formed Overpass document.
    Decode {
        message: String,
        source: Option<BoxError>,
    },
    Config(String),
    Io(io::Error),
}

impl Error {
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(err.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
            source: None,
        }
    }

    fn wrap_decode<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Decode {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Error::Server { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "http error: {}", err),
            Error::Server { status, .. } => write!(f, "overpass engine error: status {}", status),
            Error::Decode { message, .. } => write!(f, "overpass engine error: {}", message),
            Error::Config(message) => write!(f, "invalid client configuration: {}", message),
            Error::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err.as_ref()),
            Error::Decode { source: Some(err), .. } => Some(err.as_ref()),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        Error::wrap_decode(value)
    }
}

impl From<AttrError> for Error {
    fn from(value: AttrError) -> Self {
        Error::wrap_decode(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::wrap_decode(value)
    }
}

impl From<chrono::ParseError> for Error {
    fn from(value: chrono::ParseError) -> Self {
        Error::wrap_decode(value)
    }
}

impl From<ParseFloatError> for Error {
    fn from(value: ParseFloatError) -> Self {
        Error::wrap_decode(value)
    }
}

impl From<ParseIntError> for Error {
    fn from(value: ParseIntError) -> Self {
        Error::wrap_decode(value)
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::wrap_decode(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
