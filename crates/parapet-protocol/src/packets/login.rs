use super::{PacketBody, PacketKind};
use crate::codec::*;
use crate::component::{write_component, write_json_component};
use crate::version::ProtocolVersion;
use bytes::{BufMut, BytesMut};
use parapet_types::TextComponent;
use uuid::Uuid;

/// Chat-signing key data sent by 1.19-1.19.2 clients at login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSignature {
    pub expiry: i64,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginStart {
    pub username: String,
    pub uuid: Option<Uuid>,
    pub signature: Option<LoginSignature>,
}

impl LoginStart {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            uuid: None,
            signature: None,
        }
    }
}

impl PacketBody for LoginStart {
    const KIND: PacketKind = PacketKind::LoginStart;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        write_string(buf, &self.username);
        if version.in_between(ProtocolVersion::V1_19, ProtocolVersion::V1_19_1) {
            write_bool(buf, self.signature.is_some());
            if let Some(sig) = &self.signature {
                buf.put_i64(sig.expiry);
                write_byte_array(buf, &sig.public_key);
                write_byte_array(buf, &sig.signature);
            }
        }
        if version >= ProtocolVersion::V1_20_2 {
            write_uuid(buf, &self.uuid.unwrap_or_else(Uuid::nil));
        } else if version >= ProtocolVersion::V1_19_1 {
            write_bool(buf, self.uuid.is_some());
            if let Some(uuid) = &self.uuid {
                write_uuid(buf, uuid);
            }
        }
        Ok(())
    }

    fn decode(buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<Self> {
        let username = read_string(buf, 16)?;
        let mut signature = None;
        if version.in_between(ProtocolVersion::V1_19, ProtocolVersion::V1_19_1) && read_bool(buf)? {
            signature = Some(LoginSignature {
                expiry: read_i64(buf)?,
                public_key: read_byte_array(buf, 512)?,
                signature: read_byte_array(buf, 4096)?,
            });
        }
        let uuid = if version >= ProtocolVersion::V1_20_2 {
            Some(read_uuid(buf)?)
        } else if version >= ProtocolVersion::V1_19_1 && read_bool(buf)? {
            Some(read_uuid(buf)?)
        } else {
            None
        };
        Ok(Self {
            username,
            uuid,
            signature,
        })
    }

    fn min_len(_version: ProtocolVersion) -> usize {
        2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginAcknowledged;

impl PacketBody for LoginAcknowledged {
    const KIND: PacketKind = PacketKind::LoginAcknowledged;

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

#[derive(Debug, Clone, PartialEq)]
pub struct LoginSuccess {
    pub uuid: Uuid,
    pub username: String,
}

impl PacketBody for LoginSuccess {
    const KIND: PacketKind = PacketKind::LoginSuccess;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if version >= ProtocolVersion::V1_16 {
            write_uuid(buf, &self.uuid);
        } else if version >= ProtocolVersion::V1_7_6 {
            write_string(buf, &self.uuid.hyphenated().to_string());
        } else {
            write_string(buf, &self.uuid.simple().to_string());
        }
        write_string(buf, &self.username);
        if version >= ProtocolVersion::V1_19 {
            // No profile properties
            write_varint(buf, 0);
        }
        if version.in_between(ProtocolVersion::V1_20_5, ProtocolVersion::V1_21) {
            // Strict error handling
            write_bool(buf, true);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetCompression {
    pub threshold: i32,
}

impl PacketBody for SetCompression {
    const KIND: PacketKind = PacketKind::SetCompression;

    fn encode(&self, buf: &mut BytesMut, _version: ProtocolVersion) -> CodecResult<()> {
        write_varint(buf, self.threshold);
        Ok(())
    }
}

/// Kicks the client with a reason. During login the reason is always JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Disconnect {
    pub reason: TextComponent,
    pub during_login: bool,
}

impl Disconnect {
    pub fn new(reason: TextComponent, during_login: bool) -> Self {
        Self {
            reason,
            during_login,
        }
    }
}

impl PacketBody for Disconnect {
    const KIND: PacketKind = PacketKind::Disconnect;

    fn encode(&self, buf: &mut BytesMut, version: ProtocolVersion) -> CodecResult<()> {
        if self.during_login {
            write_json_component(buf, &self.reason);
        } else {
            write_component(buf, &self.reason, version);
        }
        Ok(())
    }
}
