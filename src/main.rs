//! castframe - CASTV2 stream inspection tool
//!
//! De-frames a captured byte stream or a live TCP stream into messages.

use castframe_client::{connect, BlockingReader, ClientError, ConnectionConfig};
use castframe_protocol::{FramerConfig, DEFAULT_CAST_PORT};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Number of payload bytes shown per message in text output.
const PREVIEW_BYTES: usize = 16;

#[derive(Parser)]
#[command(name = "castframe")]
#[command(about = "Split CASTV2 byte streams into length-prefixed messages")]
#[command(version)]
struct Cli {
    /// Path to a YAML framer config (overrides CASTFRAME_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Maximum payload size a frame may declare
    #[arg(long, global = true, env = "CASTFRAME_MAX_FRAME_SIZE")]
    max_frame_size: Option<u32>,

    /// Print one JSON object per message
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// De-frame a captured stream from a file or stdin
    Dump {
        /// Input file ("-" or omitted for stdin)
        input: Option<PathBuf>,

        /// Bytes requested per read
        #[arg(long, default_value_t = 8192)]
        chunk_size: usize,
    },

    /// Connect to a receiver and print messages as they arrive
    Tail {
        /// Receiver address (port defaults to 8009)
        addr: String,

        /// Connection timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut framer_config = FramerConfig::load_from(cli.config.as_deref())?;
    if let Some(max) = cli.max_frame_size {
        framer_config.max_frame_size = max;
    }
    framer_config.validate()?;
    tracing::debug!("Framer config: {:?}", framer_config);

    let printer = Printer { json: cli.json };

    let result = match cli.command {
        Commands::Dump { input, chunk_size } => dump(input, chunk_size, &framer_config, &printer),
        Commands::Tail { addr, timeout } => {
            let addr = parse_addr(&addr)?;
            let config = ConnectionConfig::new(addr)
                .with_connect_timeout(Duration::from_secs(timeout))
                .with_framer(framer_config);
            tail(config, &printer).await
        }
    };

    match result {
        Ok(count) => {
            tracing::info!("{} message(s)", count);
            Ok(())
        }
        Err(e) if e.is_partial_frame() => {
            tracing::warn!("{}", e);
            Ok(())
        }
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

fn parse_addr(addr: &str) -> Result<SocketAddr, Box<dyn std::error::Error>> {
    if let Ok(parsed) = addr.parse() {
        return Ok(parsed);
    }
    let ip: std::net::IpAddr = addr.parse()?;
    Ok(SocketAddr::new(ip, DEFAULT_CAST_PORT))
}

fn dump(
    input: Option<PathBuf>,
    chunk_size: usize,
    framer: &FramerConfig,
    printer: &Printer,
) -> Result<u64, ClientError> {
    let source: Box<dyn Read> = match input {
        Some(ref path) if path.as_os_str() != "-" => {
            tracing::info!("Reading {}", path.display());
            Box::new(std::fs::File::open(path)?)
        }
        _ => Box::new(io::stdin().lock()),
    };

    let mut reader = BlockingReader::with_config(source, framer, chunk_size);
    let mut count = 0;
    while let Some(msg) = reader.next_message()? {
        printer.print(count, &msg)?;
        count += 1;
    }
    Ok(count)
}

async fn tail(config: ConnectionConfig, printer: &Printer) -> Result<u64, ClientError> {
    tracing::info!("Connecting to {}", config.addr);
    let mut reader = connect(&config).await?;
    tracing::info!("Connected");

    let mut count = 0;
    loop {
        tokio::select! {
            next = reader.next_message() => match next? {
                Some(msg) => {
                    printer.print(count, &msg)?;
                    count += 1;
                }
                None => {
                    tracing::info!("Connection closed by peer");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    Ok(count)
}

struct Printer {
    json: bool,
}

impl Printer {
    fn print(&self, index: u64, msg: &[u8]) -> io::Result<()> {
        let preview = &msg[..msg.len().min(PREVIEW_BYTES)];
        let mut out = io::stdout().lock();
        if self.json {
            let line = serde_json::json!({
                "index": index,
                "len": msg.len(),
                "payload": hex::encode(msg),
            });
            writeln!(out, "{}", line)
        } else {
            let ellipsis = if msg.len() > PREVIEW_BYTES { "..." } else { "" };
            writeln!(
                out,
                "#{:<6} {:>8} bytes  {}{}",
                index,
                msg.len(),
                hex::encode(preview),
                ellipsis
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addr() {
        assert_eq!(
            parse_addr("192.168.1.20").unwrap(),
            "192.168.1.20:8009".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_addr("10.0.0.5:9000").unwrap(),
            "10.0.0.5:9000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_addr("not an address").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["castframe", "--json", "dump", "capture.bin"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Dump { chunk_size: 8192, .. }));
    }
}
