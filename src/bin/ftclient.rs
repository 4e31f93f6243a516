//! ftclient - lists or fetches files from an ftserve server.

use clap::Parser;
use log::error;
use std::path::Path;
use std::process;

use ftserve::client::{FileClient, Response};
use ftserve::protocol::Framing;
use ftserve::utils::logging::setup_logging;

#[derive(Parser, Debug)]
#[command(name = "ftclient", version, about = "Lists or fetches files from an ftserve server")]
struct Args {
    /// Server host name or IPv4 address
    server_host: String,

    /// Server control port
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    server_port: u16,

    /// List the server's files
    #[arg(short = 'l', long = "list", conflicts_with = "get", required_unless_present = "get")]
    list: bool,

    /// Fetch FILE into the current directory
    #[arg(short = 'g', long = "get", value_name = "FILE")]
    get: Option<String>,

    /// Local port the server connects back to
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    data_port: u16,

    /// Address to advertise for the data connection
    #[arg(long)]
    data_host: Option<String>,

    /// Data framing; must match the server
    #[arg(long, default_value_t = Framing::Fixed)]
    framing: Framing,
}

#[tokio::main]
async fn main() {
    setup_logging();
    let args = Args::parse();

    let mut client = FileClient::new(args.server_host.clone(), args.server_port)
        .data_port(args.data_port)
        .framing(args.framing);
    if let Some(host) = &args.data_host {
        client = client.data_host(host.clone());
    }

    let result = match &args.get {
        Some(name) => {
            println!("Receiving {} from {}: {}", name, args.server_host, args.data_port);
            client.fetch(name).await
        }
        None => {
            println!(
                "Receiving directory structure from {}: {}",
                args.server_host, args.data_port
            );
            client.list().await
        }
    };

    match result {
        Ok(Response::Listing(names)) => {
            for name in names {
                println!("{}", name);
            }
        }
        Ok(Response::File(content)) => {
            let name = args.get.as_deref().unwrap_or_default();
            let Some(local) = Path::new(name).file_name() else {
                error!("Refusing to save {:?}: no file name component", name);
                process::exit(1);
            };
            if let Err(e) = tokio::fs::write(local, &content).await {
                error!("Failed to save {:?}: {}", local, e);
                process::exit(1);
            }
            println!("File transfer complete.");
        }
        Ok(Response::FileNotFound) => {
            println!("{}: {} says FILE NOT FOUND", args.server_host, args.server_port);
        }
        Ok(Response::CommandError) => {
            eprintln!("Invalid command. Please use -l or -g as a command.");
            process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
