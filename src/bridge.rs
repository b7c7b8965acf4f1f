use std::future::Future;

use tokio::sync::watch;
use tracing::{error, info};

use crate::backend::Backend;
use crate::errors::Result;
use crate::options::BridgeOptions;
use crate::session::make_session_channel;
use crate::video::{Encoder, FfmpegEncoder};
use crate::{control, telemetry, video};

pub type ShutdownSender = watch::Sender<bool>;
pub type ShutdownReceiver = watch::Receiver<bool>;

/// Makes the channel used to ask every part of the bridge to stop.
pub fn make_shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

/// Runs the whole bridge against `backend` until `shutdown` fires.
///
/// The three SDK channels - command, state, video - run as independent
/// tasks, each on its own clone of the backend. One channel failing is
/// logged and does not bring the others down.
pub async fn run<B: Backend, E: Encoder + 'static>(
    backend: B,
    encoder: E,
    options: BridgeOptions,
    shutdown: ShutdownReceiver,
) -> Result<()> {
    let (session_tx, session_rx) = make_session_channel();

    let command = tokio::spawn(supervised(
        "command",
        control::run(backend.clone(), session_tx, shutdown.clone(), options.clone()),
    ));
    let state = tokio::spawn(supervised(
        "state",
        telemetry::run(
            backend.clone(),
            session_rx.clone(),
            shutdown.clone(),
            options.clone(),
        ),
    ));
    let video = tokio::spawn(supervised(
        "video",
        video::run(backend, encoder, session_rx, shutdown, options),
    ));

    info!("bridge up");
    let _ = tokio::join!(command, state, video);
    info!("bridge down");

    Ok(())
}

/// Runs the bridge with the stock ffmpeg encoder.
pub async fn serve<B: Backend>(
    backend: B,
    options: BridgeOptions,
    shutdown: ShutdownReceiver,
) -> Result<()> {
    let encoder = FfmpegEncoder::new(&options);
    run(backend, encoder, options, shutdown).await
}

async fn supervised(name: &'static str, channel: impl Future<Output = Result<()>>) {
    match channel.await {
        Ok(()) => info!("{name} channel closed"),
        Err(err) => error!("{name} channel failed - {err}"),
    }
}
