use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::{Backend, Vec3, VehicleState};
use crate::errors::Result;
use crate::video::{FRAME_BYTES, VIDEO_WIDTH};

/// Altitude reached by an automatic take-off, in backend units.
const TAKE_OFF_ALTITUDE: f32 = 1.5;

/// A minimal in-process flight backend.
///
/// Pure kinematics, applied instantly: take-off jumps to hover height,
/// absolute moves teleport, velocity moves integrate over their whole
/// duration in one step. Good enough to fly the bridge without a simulator
/// attached, and the backend all the tests run against.
#[derive(Clone, Default)]
pub struct SoftSim {
    world: Arc<RwLock<World>>,
}

#[derive(Default)]
struct World {
    connected: bool,
    api_control: bool,
    armed: bool,
    airborne: bool,
    kinematics: VehicleState,
    frames: u64,
}

impl SoftSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the vehicle somewhere specific.
    pub async fn set_position(&self, position: Vec3) {
        self.world.write().await.kinematics.position = position;
    }

    pub async fn is_airborne(&self) -> bool {
        self.world.read().await.airborne
    }

    pub async fn is_armed(&self) -> bool {
        self.world.read().await.armed
    }

    pub async fn is_connected(&self) -> bool {
        self.world.read().await.connected
    }

    pub async fn has_api_control(&self) -> bool {
        self.world.read().await.api_control
    }
}

#[async_trait]
impl Backend for SoftSim {
    async fn connect(&mut self) -> Result<()> {
        self.world.write().await.connected = true;
        Ok(())
    }

    async fn enable_control(&mut self, enable: bool) -> Result<()> {
        self.world.write().await.api_control = enable;
        Ok(())
    }

    async fn arm(&mut self, arm: bool) -> Result<()> {
        self.world.write().await.armed = arm;
        Ok(())
    }

    async fn take_off(&mut self) -> Result<()> {
        let mut world = self.world.write().await;
        if !world.airborne {
            world.kinematics.position.z = -TAKE_OFF_ALTITUDE;
            world.airborne = true;
            debug!("take-off");
        }
        Ok(())
    }

    async fn land(&mut self) -> Result<()> {
        let mut world = self.world.write().await;
        world.kinematics.position.z = 0.0;
        world.kinematics.velocity = Vec3::default();
        world.airborne = false;
        debug!("landed");
        Ok(())
    }

    async fn move_to_position(&mut self, target: Vec3, _max_speed: f32) -> Result<()> {
        self.world.write().await.kinematics.position = target;
        Ok(())
    }

    async fn move_by_velocity(&mut self, velocity: Vec3, duration: f32, _yaw_rate: f32) -> Result<()> {
        let mut world = self.world.write().await;
        world.kinematics.velocity = velocity;
        world.kinematics.position.x += velocity.x * duration;
        world.kinematics.position.y += velocity.y * duration;
        world.kinematics.position.z += velocity.z * duration;
        Ok(())
    }

    async fn state(&mut self) -> Result<VehicleState> {
        Ok(self.world.read().await.kinematics)
    }

    async fn frame(&mut self) -> Result<Vec<u8>> {
        let mut world = self.world.write().await;
        world.frames = world.frames.wrapping_add(1);
        Ok(test_pattern(world.frames))
    }
}

/// A moving vertical stripe over a flat grey field, just enough for a
/// viewer to see motion.
fn test_pattern(sequence: u64) -> Vec<u8> {
    let mut frame = vec![64u8; FRAME_BYTES];
    let row_bytes = VIDEO_WIDTH as usize * 3;
    let stripe = (sequence as usize * 24) % row_bytes;
    let stripe_end = (stripe + 24).min(row_bytes);
    for row in frame.chunks_exact_mut(row_bytes) {
        for byte in &mut row[stripe..stripe_end] {
            *byte = 255;
        }
    }
    frame
}
