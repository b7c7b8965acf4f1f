use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::select;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Vec3};
use crate::bridge::ShutdownReceiver;
use crate::command::Command;
use crate::errors::{BridgeError, Result};
use crate::options::BridgeOptions;
use crate::session::{Mode, SessionSender};

pub(crate) const CONTROL_UDP_PORT: u16 = 8889;

const REPLY_OK: &[u8] = b"ok";
const REPLY_ERROR: &[u8] = b"error";

/// Centimetres to metres.
const CM_TO_M: f32 = 0.01;

/// Top speed handed to absolute moves, in backend units per second.
const MOVE_SPEED: f32 = 1.0;

/// Backend velocity per `rc` channel unit, in m/s.
const RC_VELOCITY_SCALE: f32 = 0.01;

/// Yaw rate per `rc` yaw channel unit, in degrees per second.
const RC_YAW_RATE_SCALE: f32 = 0.1;

/// How long one forwarded `rc` command keeps the vehicle moving.
const RC_DURATION_SECS: f32 = 1.0;

/// Minimum spacing between `rc` commands forwarded to the backend.
const RC_WINDOW: Duration = Duration::from_secs(1);

/// What a well-formed command actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Executed against the backend, or recorded in the session.
    Applied,
    /// Valid for the protocol but meaningless to this backend;
    /// acknowledged and deliberately not acted on.
    Unsupported,
    /// An `rc` command inside the quiet window; acknowledged and dropped.
    Throttled,
}

/// Debounce for the continuous-control path.
///
/// Starts primed, as if a command had just been forwarded, so the first
/// window after startup swallows whatever a controller sends while its
/// sticks settle.
#[derive(Debug)]
pub(crate) struct Throttle {
    window: Duration,
    last: Instant,
}

impl Throttle {
    pub(crate) fn new(window: Duration) -> Self {
        Self { window, last: Instant::now() }
    }

    /// True once strictly more than one window has passed since the last
    /// fire; arms the next window as a side effect.
    pub(crate) fn try_fire(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last) > self.window {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Runs the control channel: one command datagram in, one reply out,
/// strictly in order.
pub(crate) async fn run<B: Backend>(
    mut backend: B,
    session: SessionSender,
    mut shutdown: ShutdownReceiver,
    options: BridgeOptions,
) -> Result<()> {
    backend.connect().await?;
    backend.enable_control(true).await?;
    backend.arm(true).await?;

    let local_address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, options.control_port));
    let socket = UdpSocket::bind(local_address).await?;
    info!("control channel listening at {local_address}");

    let mut throttle = Throttle::new(RC_WINDOW);
    let mut buf = vec![0u8; 1024];

    loop {
        let (n, peer) = select! {
            _ = shutdown.changed() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(err) => {
                    warn!("control receive failed - {err}");
                    continue;
                }
            },
        };

        let reply = match handle_datagram(
            &buf[..n],
            peer,
            &mut backend,
            &session,
            &mut throttle,
            &options,
        )
        .await
        {
            Ok(outcome) => {
                debug!("{peer} -> {outcome:?}");
                REPLY_OK
            }
            Err(err) => {
                debug!("{peer} -> rejected ({err})");
                REPLY_ERROR
            }
        };

        // every sender gets an answer, even for garbage
        if let Err(err) = socket.send_to(reply, peer).await {
            warn!("control reply to {peer} failed - {err}");
        }
    }

    info!("control channel stopped");
    Ok(())
}

/// Decodes and executes one datagram.
async fn handle_datagram<B: Backend>(
    datagram: &[u8],
    peer: SocketAddr,
    backend: &mut B,
    session: &SessionSender,
    throttle: &mut Throttle,
    options: &BridgeOptions,
) -> Result<Outcome> {
    let text = std::str::from_utf8(datagram)?;
    if !text.is_ascii() {
        return Err(BridgeError::ParseError {
            msg: "non-ASCII command".to_string(),
        });
    }

    let line = text.trim();
    debug!("{peer} sent {line:?}");

    let command = Command::parse(line)?;
    apply(command, peer, backend, session, throttle, options).await
}

/// Executes one decoded command against the backend and the session.
async fn apply<B: Backend>(
    command: Command,
    peer: SocketAddr,
    backend: &mut B,
    session: &SessionSender,
    throttle: &mut Throttle,
    options: &BridgeOptions,
) -> Result<Outcome> {
    match command {
        Command::EnterSdkMode => {
            session.send_modify(|session| {
                session.mode = Mode::Sdk;
                session.controller = Some(peer.ip());
            });
            info!("SDK mode entered, controller is {}", peer.ip());
            Ok(Outcome::Applied)
        }

        Command::TakeOff => {
            backend.take_off().await?;
            Ok(Outcome::Applied)
        }

        Command::Land => {
            backend.land().await?;
            Ok(Outcome::Applied)
        }

        Command::StreamOn => {
            session.send_modify(|session| session.video = true);
            info!("video stream on");
            Ok(Outcome::Applied)
        }

        Command::StreamOff => {
            session.send_modify(|session| session.video = false);
            info!("video stream off");
            Ok(Outcome::Applied)
        }

        Command::Up { distance } => offset_move(backend, options, 0.0, 0.0, -distance).await,
        Command::Down { distance } => offset_move(backend, options, 0.0, 0.0, distance).await,
        Command::Left { distance } => offset_move(backend, options, 0.0, -distance, 0.0).await,
        Command::Right { distance } => offset_move(backend, options, 0.0, distance, 0.0).await,
        Command::Forward { distance } => offset_move(backend, options, distance, 0.0, 0.0).await,
        Command::Back { distance } => offset_move(backend, options, -distance, 0.0, 0.0).await,

        Command::TurnClockwise { .. } | Command::TurnCounterClockwise { .. } => {
            // no backend counterpart for pure rotation; acknowledged so
            // stock SDK clients keep working
            Ok(Outcome::Unsupported)
        }

        Command::RemoteControl {
            left_right,
            forwards_backwards,
            up_down,
            yaw,
        } => {
            if !throttle.try_fire() {
                return Ok(Outcome::Throttled);
            }
            let velocity = Vec3::new(
                RC_VELOCITY_SCALE * forwards_backwards,
                RC_VELOCITY_SCALE * left_right,
                RC_VELOCITY_SCALE * up_down,
            );
            backend
                .move_by_velocity(velocity, RC_DURATION_SECS, RC_YAW_RATE_SCALE * yaw)
                .await?;
            Ok(Outcome::Applied)
        }
    }
}

/// Relative move: read the current position, offset it in centimetres
/// scaled to backend units, fly there.
async fn offset_move<B: Backend>(
    backend: &mut B,
    options: &BridgeOptions,
    dx: f32,
    dy: f32,
    dz: f32,
) -> Result<Outcome> {
    let state = backend.state().await?;
    let scale = options.sim_scale * CM_TO_M;
    let target = Vec3::new(
        state.position.x + scale * dx,
        state.position.y + scale * dy,
        state.position.z + scale * dz,
    );
    backend.move_to_position(target, MOVE_SPEED).await?;
    Ok(Outcome::Applied)
}
