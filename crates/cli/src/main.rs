mod config;

use std::io;
use std::path::PathBuf;

use clap::Parser;
use rtsp::Server;

use config::FileConfig;

#[derive(Parser)]
#[command(name = "rtsp-server", about = "RTSP rendezvous server: publish once, read many")]
struct Args {
    /// Path to a YAML config file.
    #[arg(long, short = 'c', default_value = "rtsp.yaml")]
    config: PathBuf,

    /// Override the RTSP TCP bind address (host:port).
    #[arg(long)]
    bind: Option<String>,

    /// Override the UDP RTP listener port.
    #[arg(long)]
    rtp_port: Option<u16>,

    /// Override the UDP RTCP listener port.
    #[arg(long)]
    rtcp_port: Option<u16>,

    /// Override the required `?key=` query parameter for ANNOUNCE.
    #[arg(long)]
    publish_key: Option<String>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let file_config = match FileConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to read config file {}: {e}", args.config.display());
            return;
        }
    };
    let mut config = file_config.into_server_config();

    if let Some(bind) = args.bind {
        config.rtsp_bind = bind;
    }
    if let Some(port) = args.rtp_port {
        config.rtp_port = port;
    }
    if let Some(port) = args.rtcp_port {
        config.rtcp_port = port;
    }
    if let Some(key) = args.publish_key {
        config.publish_key = Some(key);
    }

    let rtsp_bind = config.rtsp_bind.clone();
    let mut server = Server::new(config);

    if let Err(e) = server.start() {
        eprintln!("Failed to start server: {e}");
        return;
    }

    println!("RTSP server on {rtsp_bind} — press Enter to stop");
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();

    server.stop();
}
