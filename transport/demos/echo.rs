//! Echo service over protocol streams.
//!
//! Starts two in-memory hosts. The first attaches the protocol and serves an
//! echo service on its listener, the second dials it by peer identity, sends a
//! message, and prints the reply.

use clap::Parser;
use log::LevelFilter;
use p2p_grpc_transport::memory::{MemoryNetwork, MemoryStream};
use p2p_grpc_transport::{CancellationToken, GrpcProtocol, StreamConn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Message to echo.
    #[arg(short, long, default_value = "Hello, world")]
    message: String,

    /// Number of clients dialing the echo server one after another.
    #[arg(short, long, default_value = "1")]
    clients: usize,

    /// Log level.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// Answer each line with the server's peer identity and the line itself.
async fn serve_echo(conn: StreamConn<MemoryStream>) -> std::io::Result<()> {
    let server_id = conn.local_addr();
    let (reader, mut writer) = tokio::io::split(conn);
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        log::debug!("Echoing {} bytes", line.len());
        writer
            .write_all(format!("{server_id}: {line}\n").as_bytes())
            .await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} - {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log_level)
        .chain(std::io::stderr())
        .apply()?;

    let network = MemoryNetwork::new();
    let cancel = CancellationToken::new();

    let server = GrpcProtocol::new(cancel.clone(), network.add_host());
    let client = GrpcProtocol::new(cancel.clone(), network.add_host());
    log::info!("Server {server}, client {client}");

    let listener = server.new_listener();
    log::info!("Listening for connections on {}", listener.addr());
    let server_task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok(conn) => {
                    log::info!("Accepted connection from {}", conn.remote_addr());
                    tokio::spawn(async move {
                        if let Err(e) = serve_echo(conn).await {
                            log::error!("Echo connection failed: {e}");
                        }
                    });
                }
                Err(e) => {
                    log::info!("Accept loop finished: {e}");
                    break;
                }
            }
        }
    });

    let target = server.host().id().to_string();
    let dialer = client.dialer();
    for _ in 0..args.clients {
        log::info!("Dialing {target}");
        let conn = dialer.dial(&target).await?;
        let (reader, mut writer) = tokio::io::split(conn);

        writer
            .write_all(format!("{}\n", args.message).as_bytes())
            .await?;
        let mut reply = String::new();
        BufReader::new(reader).read_line(&mut reply).await?;
        println!("{}", reply.trim_end());

        writer.shutdown().await?;
    }

    cancel.cancel();
    server_task.await?;
    Ok(())
}
