use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::select;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::backend::{Backend, VehicleState};
use crate::bridge::ShutdownReceiver;
use crate::errors::Result;
use crate::options::BridgeOptions;
use crate::session::{Mode, SessionReceiver};

pub(crate) const STATE_UDP_PORT: u16 = 8890;

pub(crate) const STATE_REPORT_INTERVAL: Duration = Duration::from_millis(100);

/// Metres (backend units) to the centimetre-ish integers of the state
/// line.
const TO_CENTI: f32 = 100.0;

/// Runs the state channel: one report per interval to the registered
/// controller, nothing at all before one exists.
pub(crate) async fn run<B: Backend>(
    mut backend: B,
    mut session: SessionReceiver,
    mut shutdown: ShutdownReceiver,
    options: BridgeOptions,
) -> Result<()> {
    backend.connect().await?;
    backend.enable_control(true).await?;

    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;

    // idle until a controller enters SDK mode
    select! {
        _ = shutdown.changed() => return Ok(()),
        entered = session.wait_for(|session| session.mode == Mode::Sdk) => {
            if entered.is_err() {
                // command channel gone, nothing will ever change
                return Ok(());
            }
        }
    }

    info!("state reports every {:?}", options.state_interval);

    let mut ticker = interval(options.state_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        // re-read each cycle so a controller change redirects reports
        let Some(controller) = session.borrow().controller else {
            continue;
        };

        match backend.state().await {
            Ok(state) => {
                let report = state_line(&state);
                if let Err(err) = socket
                    .send_to(report.as_bytes(), (controller, options.state_port))
                    .await
                {
                    warn!("state report to {controller} failed - {err}");
                }
            }
            Err(err) => {
                // skip this cycle, the next sample may succeed
                warn!("state sample failed - {err}");
            }
        }
    }

    info!("state channel stopped");
    Ok(())
}

/// Formats one state report line.
///
/// Sixteen `name:value` fields in fixed order, colon-separated end to end.
/// Angles are whole degrees, speeds and height whole centi-units, both
/// truncated toward zero. Accelerations keep two decimals. Fields the
/// backend has no reading for are reported as zero.
pub(crate) fn state_line(state: &VehicleState) -> String {
    let (pitch, roll, yaw) = state.orientation.euler_angles();
    let v = state.velocity;
    let a = state.acceleration;

    format!(
        "pitch:{pitch}:roll:{roll}:yaw:{yaw}:\
         vgx:{vgx}:vgy:{vgy}:vgz:{vgz}:\
         templ:0:temph:0:tof:0:h:{h}:bat:0.00:baro:0:time:0:\
         agx:{agx:.2}:agy:{agy:.2}:agz:{agz:.2}",
        pitch = pitch.to_degrees() as i32,
        roll = roll.to_degrees() as i32,
        yaw = yaw.to_degrees() as i32,
        vgx = (TO_CENTI * v.x) as i32,
        vgy = (TO_CENTI * v.y) as i32,
        vgz = (TO_CENTI * v.z) as i32,
        h = (TO_CENTI * state.position.z) as i32,
        agx = a.x,
        agy = a.y,
        agz = a.z,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f32::consts::FRAC_PI_2;

    use tokio::time::timeout;

    use crate::backend::{Quaternion, Vec3};
    use crate::bridge::make_shutdown_channel;
    use crate::session::make_session_channel;
    use crate::sim::SoftSim;

    fn field<'a>(line: &'a str, name: &str) -> &'a str {
        let tokens: Vec<&str> = line.split(':').collect();
        let at = tokens
            .iter()
            .position(|token| *token == name)
            .unwrap_or_else(|| panic!("no {name} field in {line}"));
        tokens[at + 1]
    }

    #[test]
    fn state_line_is_complete_and_ordered() {
        let state = VehicleState {
            position: Vec3::new(0.0, 0.0, -1.5),
            orientation: Quaternion::default(),
            velocity: Vec3::new(1.234, -0.5, 0.019),
            acceleration: Vec3::new(0.25, -9.81, 0.0),
        };

        assert_eq!(
            state_line(&state),
            "pitch:0:roll:0:yaw:0:vgx:123:vgy:-50:vgz:1:\
             templ:0:temph:0:tof:0:h:-150:bat:0.00:baro:0:time:0:\
             agx:0.25:agy:-9.81:agz:0.00"
        );
    }

    #[test]
    fn state_line_has_sixteen_fields() {
        let line = state_line(&VehicleState::default());
        let tokens: Vec<&str> = line.split(':').collect();
        assert_eq!(tokens.len(), 32);

        let names: Vec<&str> = tokens.iter().step_by(2).copied().collect();
        assert_eq!(
            names,
            [
                "pitch", "roll", "yaw", "vgx", "vgy", "vgz", "templ", "temph", "tof", "h",
                "bat", "baro", "time", "agx", "agy", "agz"
            ]
        );
    }

    #[test]
    fn angles_are_whole_degrees() {
        let half = FRAC_PI_2 / 2.0;
        let state = VehicleState {
            orientation: Quaternion::new(half.cos(), 0.0, 0.0, half.sin()),
            ..VehicleState::default()
        };

        let line = state_line(&state);
        assert!(line.starts_with("pitch:0:roll:0:"), "{line}");

        // whole degrees only - parses as an integer, one ulp of float noise
        // may truncate 90 down to 89
        let yaw = field(&line, "yaw").parse::<i32>().unwrap();
        assert!((89..=90).contains(&yaw), "{line}");
    }

    #[test]
    fn speeds_truncate_toward_zero() {
        let state = VehicleState {
            velocity: Vec3::new(-0.999, 0.999, 0.0),
            ..VehicleState::default()
        };

        let line = state_line(&state);
        assert!(line.contains("vgx:-99:vgy:99:vgz:0:"), "{line}");
    }

    #[tokio::test]
    async fn reports_flow_once_sdk_mode_is_entered() {
        let listener = UdpSocket::bind(("127.0.0.1", 0)).await.unwrap();
        let state_port = listener.local_addr().unwrap().port();

        let options = BridgeOptions {
            state_port,
            state_interval: Duration::from_millis(10),
            ..BridgeOptions::default()
        };

        let (session_tx, session_rx) = make_session_channel();
        let (shutdown_tx, shutdown_rx) = make_shutdown_channel();

        let publisher = tokio::spawn(run(SoftSim::new(), session_rx, shutdown_rx, options));

        // nothing before a controller registers
        let mut buf = [0u8; 2048];
        let silent = timeout(Duration::from_millis(50), listener.recv_from(&mut buf)).await;
        assert!(silent.is_err());

        session_tx.send_modify(|session| {
            session.mode = Mode::Sdk;
            session.controller = Some("127.0.0.1".parse().unwrap());
        });

        let started = tokio::time::Instant::now();
        for _ in 0..3 {
            let (n, _) = timeout(Duration::from_secs(2), listener.recv_from(&mut buf))
                .await
                .expect("no state report arrived")
                .unwrap();
            let line = std::str::from_utf8(&buf[..n]).unwrap();
            assert!(line.starts_with("pitch:"), "{line}");
            assert_eq!(line.split(':').count(), 32);
        }

        // three reports paced at the configured interval, not a burst
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(15), "{elapsed:?}");
        assert!(elapsed <= Duration::from_secs(1), "{elapsed:?}");

        shutdown_tx.send(true).unwrap();
        timeout(Duration::from_secs(2), publisher)
            .await
            .expect("publisher did not stop")
            .unwrap()
            .unwrap();
    }
}
