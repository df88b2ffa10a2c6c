// SerialRW - Serial read/write console for Arduino boards
use clap::Parser;
use serialrw::cli::args::{normalize_args, Args};
use serialrw::cli::commands::execute_command;

#[tokio::main]
async fn main() {
    let args = Args::parse_from(normalize_args(std::env::args_os()));

    if let Err(e) = execute_command(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
