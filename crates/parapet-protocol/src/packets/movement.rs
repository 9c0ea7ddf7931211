use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::version::ProtocolVersion;
use bytes::{BufMut, BytesMut};

/// Eye height the 1.7 client adds to teleport and movement Y values.
pub const LEGACY_EYE_HEIGHT: f64 = 1.62;

fn write_ground(buf: &mut BytesMut, version: ProtocolVersion, on_ground: bool, horizontal_collision: bool) {
    if version >= ProtocolVersion::V1_21_2 {
        buf.put_u8(on_ground as u8 | (horizontal_collision as u8) << 1);
    } else {
        write_bool(buf, on_ground);
    }
}

/// Returns `(on_ground, horizontal_collision)`.
fn read_ground(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<(bool, bool)> {
    if version >= ProtocolVersion::V1_21_2 {
        let flags = read_u8(buf)?;
        Ok((flags & 0x01 != 0, flags & 0x02 != 0))
    } else {
        Ok((read_bool(buf)?, false))
    }
}

/// Server-issued position. Absolute unless `relative_flags` says otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerPositionSync {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub relative_flags: i32,
    pub teleport_id: i32,
}

impl PacketBody for PlayerPositionSync {
    const KIND: PacketKind = PacketKind::PlayerPositionSync;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if version >= ProtocolVersion::V1_21_2 {
            write_varint(buf, self.teleport_id);
            buf.put_f64(self.x);
            buf.put_f64(self.y);
            buf.put_f64(self.z);
            // Velocity
            buf.put_f64(0.0);
            buf.put_f64(0.0);
            buf.put_f64(0.0);
            buf.put_f32(self.yaw);
            buf.put_f32(self.pitch);
            buf.put_i32(self.relative_flags);
            return Ok(());
        }
        buf.put_f64(self.x);
        if version >= ProtocolVersion::V1_8 {
            buf.put_f64(self.y);
        } else {
            buf.put_f64(self.y + LEGACY_EYE_HEIGHT);
        }
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        buf.put_u8(self.relative_flags as u8);
        if version >= ProtocolVersion::V1_9 {
            write_varint(buf, self.teleport_id);
        }
        if version.in_between(ProtocolVersion::V1_17, ProtocolVersion::V1_19_3) {
            // Dismount vehicle
            write_bool(buf, true);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmTeleportation {
    pub teleport_id: i32,
}

impl PacketBody for ConfirmTeleportation {
    const KIND: PacketKind = PacketKind::ConfirmTeleportation;

    fn encode(&self, buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        write_varint(buf, self.teleport_id);
        Ok(())
    }

    fn decode(buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<Self> {
        Ok(Self {
            teleport_id: read_varint(buf)?,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        1
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(5)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovePlayerPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub on_ground: bool,
    pub horizontal_collision: bool,
}

impl MovePlayerPos {
    pub fn new(x: f64, y: f64, z: f64, on_ground: bool) -> Self {
        Self {
            x,
            y,
            z,
            on_ground,
            horizontal_collision: false,
        }
    }
}

impl PacketBody for MovePlayerPos {
    const KIND: PacketKind = PacketKind::MovePlayerPos;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        if version < ProtocolVersion::V1_8 {
            buf.put_f64(self.y + LEGACY_EYE_HEIGHT);
        }
        buf.put_f64(self.z);
        write_ground(buf, version, self.on_ground, self.horizontal_collision);
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let x = read_f64(buf)?;
        let y = read_f64(buf)?;
        if version < ProtocolVersion::V1_8 {
            // Head Y ("stance")
            read_f64(buf)?;
        }
        let z = read_f64(buf)?;
        let (on_ground, horizontal_collision) = read_ground(buf, version)?;
        Ok(Self {
            x,
            y,
            z,
            on_ground,
            horizontal_collision,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        25
    }

    fn max_len(version: ProtocolVersion) -> Option<usize> {
        Some(if version < ProtocolVersion::V1_8 { 33 } else { 25 })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovePlayerPosRot {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub horizontal_collision: bool,
}

impl MovePlayerPosRot {
    pub fn new(x: f64, y: f64, z: f64, yaw: f32, pitch: f32, on_ground: bool) -> Self {
        Self {
            x,
            y,
            z,
            yaw,
            pitch,
            on_ground,
            horizontal_collision: false,
        }
    }
}

impl PacketBody for MovePlayerPosRot {
    const KIND: PacketKind = PacketKind::MovePlayerPosRot;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        buf.put_f64(self.x);
        buf.put_f64(self.y);
        if version < ProtocolVersion::V1_8 {
            buf.put_f64(self.y + LEGACY_EYE_HEIGHT);
        }
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        write_ground(buf, version, self.on_ground, self.horizontal_collision);
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let x = read_f64(buf)?;
        let y = read_f64(buf)?;
        if version < ProtocolVersion::V1_8 {
            read_f64(buf)?;
        }
        let z = read_f64(buf)?;
        let yaw = read_f32(buf)?;
        let pitch = read_f32(buf)?;
        let (on_ground, horizontal_collision) = read_ground(buf, version)?;
        Ok(Self {
            x,
            y,
            z,
            yaw,
            pitch,
            on_ground,
            horizontal_collision,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        33
    }

    fn max_len(version: ProtocolVersion) -> Option<usize> {
        Some(if version < ProtocolVersion::V1_8 { 41 } else { 33 })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovePlayerRot {
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub horizontal_collision: bool,
}

impl PacketBody for MovePlayerRot {
    const KIND: PacketKind = PacketKind::MovePlayerRot;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);
        write_ground(buf, version, self.on_ground, self.horizontal_collision);
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let yaw = read_f32(buf)?;
        let pitch = read_f32(buf)?;
        let (on_ground, horizontal_collision) = read_ground(buf, version)?;
        Ok(Self {
            yaw,
            pitch,
            on_ground,
            horizontal_collision,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        9
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(9)
    }
}

/// Ground/collision state without position or rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct MovePlayerStatus {
    pub on_ground: bool,
    pub horizontal_collision: bool,
}

impl PacketBody for MovePlayerStatus {
    const KIND: PacketKind = PacketKind::MovePlayerStatus;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        write_ground(buf, version, self.on_ground, self.horizontal_collision);
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let (on_ground, horizontal_collision) = read_ground(buf, version)?;
        Ok(Self {
            on_ground,
            horizontal_collision,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        1
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(1)
    }
}

/// Sent by 1.21.2+ clients at the end of every client tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientTickEnd;

impl PacketBody for ClientTickEnd {
    const KIND: PacketKind = PacketKind::ClientTickEnd;

    fn encode(&self, _buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        Ok(())
    }

    fn decode(_buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<Self> {
        Ok(Self)
    }

    fn max_len(_version: ProtocolVersion) -> Option<usize> {
        Some(0)
    }
}
