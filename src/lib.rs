//! A bridge that serves the Tello SDK protocol - command, state and video,
//! all over UDP - on top of a flight backend that does not speak it, such
//! as a simulator's motion API. Stock Tello client libraries connect to the
//! bridge and fly the simulated vehicle unmodified.
//!
//! [`serve`] runs the whole bridge; [`Backend`] is the seam a new backend
//! implements; [`SoftSim`] is the built-in backend used by the binary and
//! the tests.

mod backend;
mod bridge;
mod command;
mod control;
mod errors;
mod options;
mod session;
mod sim;
mod telemetry;
mod video;

pub use backend::{Backend, Quaternion, Vec3, VehicleState};
pub use bridge::{make_shutdown_channel, run, serve, ShutdownReceiver, ShutdownSender};
pub use command::Command;
pub use errors::{BridgeError, Result};
pub use options::BridgeOptions;
pub use session::{make_session_channel, Mode, Session, SessionReceiver, SessionSender};
pub use sim::SoftSim;
pub use video::{Encoder, FfmpegEncoder, FrameSink, FRAME_BYTES, VIDEO_HEIGHT, VIDEO_WIDTH};
