use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tello_bridge::{make_shutdown_channel, serve, BridgeOptions, SoftSim};

#[derive(Parser, Debug)]
#[command(
    name = "tello-bridge",
    version,
    about = "Serve the Tello SDK protocol on top of a simulated flight backend"
)]
struct Args {
    /// UDP port listening for SDK commands.
    #[arg(long, default_value_t = 8889, env = "TELLO_BRIDGE_CONTROL_PORT")]
    control_port: u16,

    /// Controller-side UDP port state reports are sent to.
    #[arg(long, default_value_t = 8890, env = "TELLO_BRIDGE_STATE_PORT")]
    state_port: u16,

    /// Controller-side UDP port the video stream is sent to.
    #[arg(long, default_value_t = 11111, env = "TELLO_BRIDGE_VIDEO_PORT")]
    video_port: u16,

    /// Backend world units per metre of commanded distance.
    #[arg(long, default_value_t = 5.0, env = "TELLO_BRIDGE_SIM_SCALE")]
    sim_scale: f32,

    /// Encoder program, fed raw frames on stdin.
    #[arg(long, default_value = "ffmpeg", env = "TELLO_BRIDGE_FFMPEG")]
    ffmpeg: PathBuf,

    /// Log filter when RUST_LOG is not set (e.g. "info", "debug").
    #[arg(long, default_value = "info", env = "TELLO_BRIDGE_LOG")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log);

    info!(version = env!("CARGO_PKG_VERSION"), "starting tello-bridge");

    let options = BridgeOptions {
        control_port: args.control_port,
        state_port: args.state_port,
        video_port: args.video_port,
        sim_scale: args.sim_scale,
        ffmpeg: args.ffmpeg,
        ..BridgeOptions::default()
    };

    let (shutdown_tx, shutdown_rx) = make_shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    serve(SoftSim::new(), options, shutdown_rx).await?;
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
