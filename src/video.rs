use std::net::IpAddr;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::select;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::bridge::ShutdownReceiver;
use crate::errors::{BridgeError, Result};
use crate::options::BridgeOptions;
use crate::session::{Mode, SessionReceiver};

pub const VIDEO_WIDTH: u32 = 960;
pub const VIDEO_HEIGHT: u32 = 720;

/// Bytes per raw BGR24 frame.
pub const FRAME_BYTES: usize = (VIDEO_WIDTH * VIDEO_HEIGHT * 3) as usize;

pub(crate) const VIDEO_UDP_PORT: u16 = 11111;

pub(crate) const VIDEO_FRAME_RATE: u32 = 15;

/// Where raw frames go once the relay is live.
#[async_trait]
pub trait FrameSink: Send {
    /// Writes one raw frame, flushed so the far side sees it promptly.
    async fn write_frame(&mut self, frame: &[u8]) -> Result<()>;

    /// Closes the sink, letting the far side drain and finish.
    async fn close(&mut self) -> Result<()>;
}

/// Launches the outbound encoder once the controller address is known.
#[async_trait]
pub trait Encoder: Send {
    type Sink: FrameSink + 'static;

    async fn launch(&mut self, controller: IpAddr) -> Result<Self::Sink>;
}

/// ffmpeg as the outbound encoder: raw frames in on stdin, an MPEG-TS
/// stream out over UDP to the controller's video port.
pub struct FfmpegEncoder {
    program: PathBuf,
    video_port: u16,
    frame_rate: u32,
}

impl FfmpegEncoder {
    pub fn new(options: &BridgeOptions) -> Self {
        Self {
            program: options.ffmpeg.clone(),
            video_port: options.video_port,
            frame_rate: options.frame_rate,
        }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    type Sink = FfmpegSink;

    async fn launch(&mut self, controller: IpAddr) -> Result<FfmpegSink> {
        let address = format!("udp://{controller}:{}", self.video_port);
        let geometry = format!("{VIDEO_WIDTH}x{VIDEO_HEIGHT}");
        let frame_rate = self.frame_rate.to_string();

        let mut child = Command::new(&self.program)
            .args([
                "-f",
                "rawvideo",
                "-pixel_format",
                "bgr24",
                "-video_size",
                geometry.as_str(),
                "-framerate",
                frame_rate.as_str(),
                "-i",
                "-",
                "-an",
                "-c:v",
                "libx264",
                "-g",
                frame_rate.as_str(),
                "-preset",
                "ultrafast",
                "-tune",
                "zerolatency",
                "-f",
                "mpegts",
                address.as_str(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| BridgeError::EncoderError {
            msg: "no stdin handle on the encoder process".to_string(),
        })?;

        // keep the encoder's chatter in our log instead of the terminal
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("ffmpeg: {line}");
                }
            });
        }

        info!("encoder started, streaming to {address}");
        Ok(FfmpegSink {
            child,
            stdin: Some(stdin),
        })
    }
}

pub struct FfmpegSink {
    child: Child,
    stdin: Option<ChildStdin>,
}

#[async_trait]
impl FrameSink for FfmpegSink {
    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| BridgeError::EncoderError {
            msg: "encoder stdin already closed".to_string(),
        })?;
        stdin.write_all(frame).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.shutdown().await?;
        }
        // EOF on stdin tells ffmpeg to drain and exit
        self.child.wait().await?;
        Ok(())
    }
}

/// Runs the video channel: wait for a controller, start the encoder at it,
/// then pump frames whenever streaming is switched on.
pub(crate) async fn run<B: Backend, E: Encoder>(
    mut backend: B,
    mut encoder: E,
    mut session: SessionReceiver,
    mut shutdown: ShutdownReceiver,
    options: BridgeOptions,
) -> Result<()> {
    backend.connect().await?;
    backend.enable_control(true).await?;

    // the encoder target is whoever first enters SDK mode
    let entered = select! {
        _ = shutdown.changed() => return Ok(()),
        entered = session.wait_for(|session| session.mode == Mode::Sdk) => match entered {
            Ok(entered) => *entered,
            Err(_) => return Ok(()),
        }
    };
    let Some(controller) = entered.controller else {
        return Err(BridgeError::Generic {
            msg: "SDK mode without a controller address".to_string(),
        });
    };

    let mut sink = encoder.launch(controller).await?;

    let mut ticker = interval(frame_interval(options.frame_rate));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if !session.borrow().video {
            // idle until the stream flag (or anything else) changes
            select! {
                _ = shutdown.changed() => break,
                changed = session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let frame = match backend.frame().await {
            Ok(frame) => frame,
            Err(err) => {
                warn!("frame grab failed - {err}");
                continue;
            }
        };

        if let Err(err) = sink.write_frame(&frame).await {
            warn!("encoder lost a frame - {err}; relaunching");
            if let Err(err) = sink.close().await {
                debug!("closing failed encoder - {err}");
            }
            sink = encoder.launch(controller).await?;
        }
    }

    if let Err(err) = sink.close().await {
        debug!("closing encoder - {err}");
    }
    info!("video channel stopped");
    Ok(())
}

fn frame_interval(rate: u32) -> Duration {
    Duration::from_secs(1) / rate.max(1)
}
