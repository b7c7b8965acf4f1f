use std::path::PathBuf;
use std::time::Duration;

use crate::control::CONTROL_UDP_PORT;
use crate::telemetry::{STATE_REPORT_INTERVAL, STATE_UDP_PORT};
use crate::video::{VIDEO_FRAME_RATE, VIDEO_UDP_PORT};

/// Bridge endpoints and tuning.
///
/// The defaults are the documented Tello SDK ports and rates; clients do
/// not negotiate any of them at run time.
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// UDP port the bridge listens on for SDK commands.
    pub control_port: u16,

    /// Controller-side UDP port state reports are sent to.
    pub state_port: u16,

    /// Controller-side UDP port the encoded video stream is sent to.
    pub video_port: u16,

    /// Backend world units per metre of commanded distance.
    pub sim_scale: f32,

    /// Interval between state reports once a controller is registered.
    pub state_interval: Duration,

    /// Frames per second pulled from the backend and fed to the encoder.
    pub frame_rate: u32,

    /// Encoder program, fed raw frames on stdin.
    pub ffmpeg: PathBuf,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            control_port: CONTROL_UDP_PORT,
            state_port: STATE_UDP_PORT,
            video_port: VIDEO_UDP_PORT,
            sim_scale: 5.0,
            state_interval: STATE_REPORT_INTERVAL,
            frame_rate: VIDEO_FRAME_RATE,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}
