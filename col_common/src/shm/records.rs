//! Fixed-width wire records.
//!
//! Every record is encoded little-endian with 4-byte fields at fixed
//! offsets. Encoders produce owned byte arrays and decoders take arrays of
//! the exact record size, so neither can fail.

use super::layout::{ACTION_BYTES, CAMERA_HEADER_BYTES, GLOBAL_HEADER_BYTES};

/// Size of the packed hyperparameter payload (21 × 4 bytes).
pub const HYPER_PAYLOAD_BYTES: usize = 84;

/// Number of meaningful bytes at the start of the global header.
pub const GLOBAL_HEADER_USED_BYTES: usize = 32;

#[inline]
fn word<const N: usize>(bytes: &[u8; N], index: usize) -> [u8; 4] {
    let o = index * 4;
    [bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]
}

#[inline]
fn put<const N: usize>(bytes: &mut [u8; N], index: usize, value: [u8; 4]) {
    let o = index * 4;
    bytes[o..o + 4].copy_from_slice(&value);
}

// ─── Handshake state word ───────────────────────────────────────────

/// Value of the state word at the start of the hyperparameter zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum HyperState {
    /// Simulator is waiting for a configuration.
    Ready = 0,
    /// Control process has published a configuration.
    Pending = 1,
    /// Simulator applied the configuration and is running.
    Acknowledged = 2,
}

impl HyperState {
    /// Convert from the raw word. Returns `None` for unknown values.
    #[inline]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Ready),
            1 => Some(Self::Pending),
            2 => Some(Self::Acknowledged),
            _ => None,
        }
    }

    /// Raw word value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

// ─── Global header ──────────────────────────────────────────────────

/// Simulator-written header at offset 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalHeader {
    /// Frame counter.
    pub frame_index: u32,
    /// Number of camera blocks written this frame.
    pub camera_count: u32,
    /// Player position (x, y, z).
    pub position: [f32; 3],
    /// Player orientation (x, y, z).
    pub rotation: [f32; 3],
}

impl GlobalHeader {
    /// Decode from the raw 48-byte zone. Trailing padding is ignored.
    pub fn decode(bytes: &[u8; GLOBAL_HEADER_BYTES]) -> Self {
        let f = |i| f32::from_le_bytes(word(bytes, i));
        Self {
            frame_index: u32::from_le_bytes(word(bytes, 0)),
            camera_count: u32::from_le_bytes(word(bytes, 1)),
            position: [f(2), f(3), f(4)],
            rotation: [f(5), f(6), f(7)],
        }
    }

    /// Encode into a 48-byte zone with zeroed padding (simulator side, tests).
    pub fn encode(&self) -> [u8; GLOBAL_HEADER_BYTES] {
        let mut out = [0u8; GLOBAL_HEADER_BYTES];
        put(&mut out, 0, self.frame_index.to_le_bytes());
        put(&mut out, 1, self.camera_count.to_le_bytes());
        for (i, v) in self.position.iter().chain(self.rotation.iter()).enumerate() {
            put(&mut out, 2 + i, v.to_le_bytes());
        }
        out
    }
}

// ─── Action record ──────────────────────────────────────────────────

/// Control axes of one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionAxes {
    /// Forward/backward axis.
    pub forward: i32,
    /// Turn axis.
    pub turn: i32,
    /// Vertical axis.
    pub vertical: i32,
    /// Gravity toggle/axis.
    pub gravity: i32,
}

/// Action record at offset 48: index followed by four axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionRecord {
    /// Monotonically increasing action index.
    pub index: i32,
    /// Axes of this action.
    pub axes: ActionAxes,
}

impl ActionRecord {
    /// Encode as `<iiiii`.
    pub fn encode(&self) -> [u8; ACTION_BYTES] {
        let mut out = [0u8; ACTION_BYTES];
        put(&mut out, 0, self.index.to_le_bytes());
        out[4..].copy_from_slice(&self.axes.encode());
        out
    }

    /// Decode from `<iiiii`.
    pub fn decode(bytes: &[u8; ACTION_BYTES]) -> Self {
        let i = |n| i32::from_le_bytes(word(bytes, n));
        Self {
            index: i(0),
            axes: ActionAxes {
                forward: i(1),
                turn: i(2),
                vertical: i(3),
                gravity: i(4),
            },
        }
    }
}

impl ActionAxes {
    /// Encode the four axes (record bytes 4..20).
    pub fn encode(&self) -> [u8; ACTION_BYTES - 4] {
        let mut out = [0u8; ACTION_BYTES - 4];
        put(&mut out, 0, self.forward.to_le_bytes());
        put(&mut out, 1, self.turn.to_le_bytes());
        put(&mut out, 2, self.vertical.to_le_bytes());
        put(&mut out, 3, self.gravity.to_le_bytes());
        out
    }
}

// ─── Hyperparameter payload ─────────────────────────────────────────

/// Flat configuration record consumed once by the simulator.
///
/// Field order is the wire order (`<fII5f9I4f`). Toggles are `u32` 0/1
/// because the simulator reads them as integers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HyperParams {
    /// Global simulation speed multiplier.
    pub speed_factor: f32,
    /// Spawn pedestrians (0/1).
    pub spawn_pedestrians: u32,
    /// Spawn cars (0/1).
    pub spawn_cars: u32,
    /// Forward movement speed.
    pub move_speed: f32,
    /// Turn speed.
    pub turn_speed: f32,
    /// Vertical speed.
    pub vertical_speed: f32,
    /// Movement momentum.
    pub momentum: f32,
    /// Fixed physics timestep in seconds.
    pub fixed_delta_time: f32,
    /// Step budget of the session.
    pub n_actions: u32,
    /// RGB camera enabled (0/1).
    pub rgb: u32,
    /// Depth camera enabled (0/1).
    pub depth: u32,
    /// Normals camera enabled (0/1).
    pub normals: u32,
    /// Semantic camera enabled (0/1).
    pub semantic: u32,
    /// Start the streaming server (0/1).
    pub launch_streaming: u32,
    /// Render to screen (0/1).
    pub render: u32,
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Vertical field of view in degrees.
    pub vertical_fov: f32,
    /// Spawn position x.
    pub start_x: f32,
    /// Spawn position y.
    pub start_y: f32,
    /// Spawn position z.
    pub start_z: f32,
}

impl HyperParams {
    /// Pack into the 84-byte payload written after the state word.
    pub fn encode(&self) -> [u8; HYPER_PAYLOAD_BYTES] {
        let words: [[u8; 4]; 21] = [
            self.speed_factor.to_le_bytes(),
            self.spawn_pedestrians.to_le_bytes(),
            self.spawn_cars.to_le_bytes(),
            self.move_speed.to_le_bytes(),
            self.turn_speed.to_le_bytes(),
            self.vertical_speed.to_le_bytes(),
            self.momentum.to_le_bytes(),
            self.fixed_delta_time.to_le_bytes(),
            self.n_actions.to_le_bytes(),
            self.rgb.to_le_bytes(),
            self.depth.to_le_bytes(),
            self.normals.to_le_bytes(),
            self.semantic.to_le_bytes(),
            self.launch_streaming.to_le_bytes(),
            self.render.to_le_bytes(),
            self.image_width.to_le_bytes(),
            self.image_height.to_le_bytes(),
            self.vertical_fov.to_le_bytes(),
            self.start_x.to_le_bytes(),
            self.start_y.to_le_bytes(),
            self.start_z.to_le_bytes(),
        ];
        let mut out = [0u8; HYPER_PAYLOAD_BYTES];
        for (i, w) in words.into_iter().enumerate() {
            put(&mut out, i, w);
        }
        out
    }

    /// Unpack the 84-byte payload.
    pub fn decode(bytes: &[u8; HYPER_PAYLOAD_BYTES]) -> Self {
        let f = |i| f32::from_le_bytes(word(bytes, i));
        let u = |i| u32::from_le_bytes(word(bytes, i));
        Self {
            speed_factor: f(0),
            spawn_pedestrians: u(1),
            spawn_cars: u(2),
            move_speed: f(3),
            turn_speed: f(4),
            vertical_speed: f(5),
            momentum: f(6),
            fixed_delta_time: f(7),
            n_actions: u(8),
            rgb: u(9),
            depth: u(10),
            normals: u(11),
            semantic: u(12),
            launch_streaming: u(13),
            render: u(14),
            image_width: u(15),
            image_height: u(16),
            vertical_fov: f(17),
            start_x: f(18),
            start_y: f(19),
            start_z: f(20),
        }
    }
}

// ─── Camera block header ────────────────────────────────────────────

/// 16-byte header at the start of every camera block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraBlockHeader {
    /// Simulator-side camera identifier.
    pub camera_id: u32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Bytes per pixel.
    pub channels: u32,
}

impl CameraBlockHeader {
    /// Decode `<IIII`.
    pub fn decode(bytes: &[u8; CAMERA_HEADER_BYTES]) -> Self {
        let u = |i| u32::from_le_bytes(word(bytes, i));
        Self {
            camera_id: u(0),
            width: u(1),
            height: u(2),
            channels: u(3),
        }
    }

    /// Encode `<IIII` (simulator side, tests).
    pub fn encode(&self) -> [u8; CAMERA_HEADER_BYTES] {
        let mut out = [0u8; CAMERA_HEADER_BYTES];
        put(&mut out, 0, self.camera_id.to_le_bytes());
        put(&mut out, 1, self.width.to_le_bytes());
        put(&mut out, 2, self.height.to_le_bytes());
        put(&mut out, 3, self.channels.to_le_bytes());
        out
    }

    /// Number of meaningful pixel bytes. `u128` holds the product of any
    /// three `u32` fields.
    pub fn pixel_bytes(&self) -> u128 {
        self.width as u128 * self.height as u128 * self.channels as u128
    }
}
