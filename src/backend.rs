use async_trait::async_trait;

use crate::errors::Result;

/// A point or vector in the backend's world frame.
///
/// The frame is NED-like: x forward, y right, z down, so altitude gain is
/// negative z.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Orientation as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }
}

impl Quaternion {
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// Euler angles as `(pitch, roll, yaw)` in radians.
    ///
    /// The pitch term is clamped before `asin` so that values driven just
    /// past ±1 by float error stay finite at the vertical.
    pub fn euler_angles(&self) -> (f32, f32, f32) {
        let ysqr = self.y * self.y;

        let t0 = 2.0 * (self.w * self.x + self.y * self.z);
        let t1 = 1.0 - 2.0 * (self.x * self.x + ysqr);
        let roll = t0.atan2(t1);

        let t2 = (2.0 * (self.w * self.y - self.z * self.x)).clamp(-1.0, 1.0);
        let pitch = t2.asin();

        let t3 = 2.0 * (self.w * self.z + self.x * self.y);
        let t4 = 1.0 - 2.0 * (ysqr + self.z * self.z);
        let yaw = t3.atan2(t4);

        (pitch, roll, yaw)
    }
}

/// One kinematic sample of the vehicle.
#[derive(Debug, Default, Clone, Copy)]
pub struct VehicleState {
    /// World position, in backend units.
    pub position: Vec3,
    pub orientation: Quaternion,
    /// World-frame velocity, in backend units per second.
    pub velocity: Vec3,
    /// Linear acceleration, in m/s².
    pub acceleration: Vec3,
}

/// The flight backend the bridge drives.
///
/// Motion calls are best effort and resolve once the backend has accepted
/// the command, not once the vehicle gets there. Clones are independent
/// handles onto the same vehicle; each channel of the bridge keeps its own
/// and runs its own connect handshake.
#[async_trait]
pub trait Backend: Clone + Send + Sync + 'static {
    /// Establishes (or confirms) the connection to the backend.
    async fn connect(&mut self) -> Result<()>;

    /// Grants or revokes remote control of the vehicle.
    async fn enable_control(&mut self, enable: bool) -> Result<()>;

    /// Arms or disarms the vehicle.
    async fn arm(&mut self, arm: bool) -> Result<()>;

    async fn take_off(&mut self) -> Result<()>;

    async fn land(&mut self) -> Result<()>;

    /// Flies to an absolute world position at up to `max_speed` units/s.
    async fn move_to_position(&mut self, target: Vec3, max_speed: f32) -> Result<()>;

    /// Flies at `velocity` for `duration` seconds while yawing at
    /// `yaw_rate` degrees per second.
    async fn move_by_velocity(&mut self, velocity: Vec3, duration: f32, yaw_rate: f32) -> Result<()>;

    /// Samples the current kinematic state.
    async fn state(&mut self) -> Result<VehicleState>;

    /// Grabs one raw BGR24 camera frame at the bridge's fixed geometry.
    async fn frame(&mut self) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f32::consts::FRAC_PI_2;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn identity_quaternion_is_level() {
        let (pitch, roll, yaw) = Quaternion::default().euler_angles();
        assert_close(pitch, 0.0);
        assert_close(roll, 0.0);
        assert_close(yaw, 0.0);
    }

    #[test]
    fn yaw_rotation_round_trips() {
        // 90° about the z axis
        let half = FRAC_PI_2 / 2.0;
        let q = Quaternion::new(half.cos(), 0.0, 0.0, half.sin());
        let (pitch, roll, yaw) = q.euler_angles();
        assert_close(pitch, 0.0);
        assert_close(roll, 0.0);
        assert_close(yaw, FRAC_PI_2);
    }

    #[test]
    fn pitch_rotation_round_trips() {
        let half = 0.5_f32 / 2.0;
        let q = Quaternion::new(half.cos(), 0.0, half.sin(), 0.0);
        let (pitch, roll, yaw) = q.euler_angles();
        assert_close(pitch, 0.5);
        assert_close(roll, 0.0);
        assert_close(yaw, 0.0);
    }

    #[test]
    fn roll_rotation_round_trips() {
        let half = 0.25_f32 / 2.0;
        let q = Quaternion::new(half.cos(), half.sin(), 0.0, 0.0);
        let (pitch, roll, yaw) = q.euler_angles();
        assert_close(pitch, 0.0);
        assert_close(roll, 0.25);
        assert_close(yaw, 0.0);
    }

    #[test]
    fn pitch_stays_finite_at_the_vertical() {
        // straight up: the asin argument sits exactly on 1
        let half = FRAC_PI_2 / 2.0;
        let q = Quaternion::new(half.cos(), 0.0, half.sin(), 0.0);
        let (pitch, _, _) = q.euler_angles();
        assert!(pitch.is_finite());
        assert_close(pitch, FRAC_PI_2);
    }
}
