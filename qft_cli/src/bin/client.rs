//! Send one file to a qft server.

use clap::Parser;
use qft_core::AppConfig;
use qft_core::transfer::send_file;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "qft-client", version, about = "Send a file over QUIC")]
struct Cli {
    /// File to send
    file_path: PathBuf,

    /// Server address, e.g. 127.0.0.1:4222
    server_addr: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("send file failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match send_file(&cli.file_path, &cli.server_addr, &config.client).await {
        Ok(report) => {
            println!(
                "send file success: {} ({} bytes) to {}",
                report.file_name, report.bytes, report.remote_addr
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("send file failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
