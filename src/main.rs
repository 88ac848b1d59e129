use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use overpass::{decode_as, Client, ClientConfig, Format, QueryResult, Result};

#[derive(Parser)]
#[command(
    name = "overpass",
    version,
    about = "Run Overpass API queries and link the returned map data"
)]
struct Cli {
    /// Minimum level of emitted log records.
    #[arg(long, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a query to the configured endpoint.
    Query {
        /// File holding the Overpass QL query.
        query_path: PathBuf,
        /// JSON client configuration.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Decode a saved response without touching the network.
    Decode {
        /// Response body, optionally xz-compressed.
        response_path: PathBuf,
        /// Wire format; defaults to the query's directive or the file extension.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Query that produced the response, used to pick the format.
        #[arg(long)]
        query: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Json,
    Xml,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Format::Json,
            FormatArg::Xml => Format::Xml,
        }
    }
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stderr()))
        .init();
}

fn read_response(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut body = Vec::new();
    if path.extension().is_some_and(|ext| ext == "xz") {
        xz::bufread::XzDecoder::new(BufReader::new(file)).read_to_end(&mut body)?;
    } else {
        BufReader::new(file).read_to_end(&mut body)?;
    }
    Ok(body)
}

fn format_from_extension(path: &Path) -> Format {
    let name = path.to_string_lossy();
    let name = name.strip_suffix(".xz").unwrap_or(&name);
    if name.ends_with(".json") {
        Format::Json
    } else {
        Format::Xml
    }
}

fn log_summary(result: &QueryResult) {
    let timestamp = result.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default();
    info!(
        count = result.count,
        nodes = result.nodes().len(),
        ways = result.ways().len(),
        relations = result.relations().len(),
        diff = result.is_diff(),
        timestamp = timestamp.as_str();
        "Linked response"
    );
    if let Some(remark) = &result.remark {
        info!(remark = remark.as_str(); "Server remark");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let result = match cli.command {
        Command::Query { query_path, config } => {
            let config = match config {
                Some(path) => ClientConfig::load(&path)?,
                None => ClientConfig::default(),
            };
            let query = fs::read_to_string(&query_path)?;
            Client::from_config(&config)?.query(&query)?
        },
        Command::Decode { response_path, format, query } => {
            let format = match (format, query) {
                (Some(format), _) => format.into(),
                (None, Some(query_path)) => Format::sniff(&fs::read_to_string(&query_path)?),
                (None, None) => format_from_extension(&response_path),
            };
            let body = read_response(&response_path)?;
            decode_as(&body, format)?
        },
    };

    log_summary(&result);
    Ok(())
}
