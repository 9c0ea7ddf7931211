use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("VarInt too big")]
    VarIntTooBig,
    #[error("Not enough data")]
    NotEnoughData,
    #[error("String too long: {0} > {1}")]
    StringTooLong(usize, usize),
    #[error("String is not valid UTF-8")]
    InvalidString,
    #[error("Negative length: {0}")]
    NegativeLength(i32),
    #[error("Array too long: {0} > {1}")]
    ArrayTooLong(usize, usize),
    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),
    #[error("Decoding {0} is not supported")]
    DecodeUnsupported(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Read a VarInt from the buffer.
pub fn read_varint(buf: &mut BytesMut) -> CodecResult<i32> {
    let mut result: i32 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::NotEnoughData);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarInt to the buffer.
pub fn write_varint(buf: &mut BytesMut, mut value: i32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u32) >> 7) as i32;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Calculate the byte length of a VarInt.
pub fn varint_len(value: i32) -> usize {
    let mut val = value as u32;
    let mut len = 0;
    loop {
        len += 1;
        val >>= 7;
        if val == 0 {
            break;
        }
    }
    len
}

/// Read a VarLong from the buffer.
pub fn read_varlong(buf: &mut BytesMut) -> CodecResult<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    loop {
        if !buf.has_remaining() {
            return Err(CodecError::NotEnoughData);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7F) as i64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 70 {
            return Err(CodecError::VarIntTooBig);
        }
    }
}

/// Write a VarLong to the buffer.
pub fn write_varlong(buf: &mut BytesMut, mut value: i64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value = ((value as u64) >> 7) as i64;
        if value != 0 {
            byte |= 0x80;
        }
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Read a VarInt length prefix and reject negative values.
pub fn read_length(buf: &mut BytesMut) -> CodecResult<usize> {
    let len = read_varint(buf)?;
    if len < 0 {
        return Err(CodecError::NegativeLength(len));
    }
    Ok(len as usize)
}

/// Read a protocol string (varint-prefixed UTF-8) of at most `max_len` characters.
pub fn read_string(buf: &mut BytesMut, max_len: usize) -> CodecResult<String> {
    let len = read_length(buf)?;
    if len > max_len * 4 {
        return Err(CodecError::StringTooLong(len, max_len));
    }
    if buf.remaining() < len {
        return Err(CodecError::NotEnoughData);
    }
    let bytes = buf.split_to(len);
    let s = String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidString)?;
    let chars = s.chars().count();
    if chars > max_len {
        return Err(CodecError::StringTooLong(chars, max_len));
    }
    Ok(s)
}

/// Write a protocol string.
pub fn write_string(buf: &mut BytesMut, s: &str) {
    write_varint(buf, s.len() as i32);
    buf.put_slice(s.as_bytes());
}

/// Read a UUID (128 bits, big endian).
pub fn read_uuid(buf: &mut BytesMut) -> CodecResult<Uuid> {
    if buf.remaining() < 16 {
        return Err(CodecError::NotEnoughData);
    }
    let mut bytes = [0u8; 16];
    buf.copy_to_slice(&mut bytes);
    Ok(Uuid::from_bytes(bytes))
}

/// Write a UUID.
pub fn write_uuid(buf: &mut BytesMut, uuid: &Uuid) {
    buf.put_slice(uuid.as_bytes());
}

/// Read a byte array with varint length prefix.
pub fn read_byte_array(buf: &mut BytesMut, max_len: usize) -> CodecResult<Vec<u8>> {
    let len = read_length(buf)?;
    if len > max_len {
        return Err(CodecError::ArrayTooLong(len, max_len));
    }
    read_bytes(buf, len)
}

/// Write a byte array with varint length prefix.
pub fn write_byte_array(buf: &mut BytesMut, data: &[u8]) {
    write_varint(buf, data.len() as i32);
    buf.put_slice(data);
}

/// Read exactly `len` raw bytes.
pub fn read_bytes(buf: &mut BytesMut, len: usize) -> CodecResult<Vec<u8>> {
    if buf.remaining() < len {
        return Err(CodecError::NotEnoughData);
    }
    Ok(buf.split_to(len).to_vec())
}

/// Skip exactly `len` bytes.
pub fn skip_bytes(buf: &mut BytesMut, len: usize) -> CodecResult<()> {
    if buf.remaining() < len {
        return Err(CodecError::NotEnoughData);
    }
    buf.advance(len);
    Ok(())
}

// === Fixed-width readers ===

macro_rules! checked_get {
    ($($name:ident => $ty:ty, $get:ident, $size:expr;)*) => {
        $(
            pub fn $name(buf: &mut BytesMut) -> CodecResult<$ty> {
                if buf.remaining() < $size {
                    return Err(CodecError::NotEnoughData);
                }
                Ok(buf.$get())
            }
        )*
    };
}

checked_get! {
    read_u8 => u8, get_u8, 1;
    read_i8 => i8, get_i8, 1;
    read_u16 => u16, get_u16, 2;
    read_i16 => i16, get_i16, 2;
    read_i32 => i32, get_i32, 4;
    read_i64 => i64, get_i64, 8;
    read_f32 => f32, get_f32, 4;
    read_f64 => f64, get_f64, 8;
}

/// Read a boolean. Only 0 and 1 are accepted.
pub fn read_bool(buf: &mut BytesMut) -> CodecResult<bool> {
    match read_u8(buf)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(CodecError::InvalidValue("boolean")),
    }
}

pub fn write_bool(buf: &mut BytesMut, value: bool) {
    buf.put_u8(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_roundtrip() {
        let test_cases = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (255, vec![0xFF, 0x01]),
            (25565, vec![0xDD, 0xC7, 0x01]),
            (2097151, vec![0xFF, 0xFF, 0x7F]),
            (-1, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
            (i32::MAX, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            (i32::MIN, vec![0x80, 0x80, 0x80, 0x80, 0x08]),
        ];

        for (value, expected_bytes) in test_cases {
            let mut buf = BytesMut::new();
            write_varint(&mut buf, value);
            assert_eq!(
                buf.to_vec(),
                expected_bytes,
                "write_varint({}) failed",
                value
            );

            let mut buf = BytesMut::from(&expected_bytes[..]);
            let result = read_varint(&mut buf).unwrap();
            assert_eq!(result, value, "read_varint for {} failed", value);
        }
    }

    #[test]
    fn test_varint_too_big() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01][..]);
        assert!(matches!(read_varint(&mut buf), Err(CodecError::VarIntTooBig)));
    }

    #[test]
    fn test_varint_len() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(25565), 3);
        assert_eq!(varint_len(-1), 5);
    }

    #[test]
    fn test_varlong_roundtrip() {
        for value in [0i64, 1, -1, i64::MAX, i64::MIN, 1 << 40] {
            let mut buf = BytesMut::new();
            write_varlong(&mut buf, value);
            assert_eq!(read_varlong(&mut buf).unwrap(), value);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_string_roundtrip() {
        let test_str = "Hello, Minecraft!";
        let mut buf = BytesMut::new();
        write_string(&mut buf, test_str);
        let result = read_string(&mut buf, 32767).unwrap();
        assert_eq!(result, test_str);
    }

    #[test]
    fn test_string_char_limit() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "seventeen_chars__");
        assert!(matches!(
            read_string(&mut buf, 16),
            Err(CodecError::StringTooLong(17, 16))
        ));
    }

    #[test]
    fn test_string_invalid_utf8() {
        let mut buf = BytesMut::from(&[0x02, 0xC3, 0x28][..]);
        assert!(matches!(read_string(&mut buf, 16), Err(CodecError::InvalidString)));
    }

    #[test]
    fn test_negative_length() {
        let mut buf = BytesMut::new();
        write_varint(&mut buf, -5);
        assert!(matches!(
            read_byte_array(&mut buf, 10),
            Err(CodecError::NegativeLength(-5))
        ));
    }

    #[test]
    fn test_uuid_roundtrip() {
        let uuid = Uuid::new_v4();
        let mut buf = BytesMut::new();
        write_uuid(&mut buf, &uuid);
        let result = read_uuid(&mut buf).unwrap();
        assert_eq!(result, uuid);
    }

    #[test]
    fn test_checked_readers() {
        let mut buf = BytesMut::from(&[0x00, 0x01][..]);
        assert_eq!(read_i16(&mut buf).unwrap(), 1);
        assert!(matches!(read_i32(&mut buf), Err(CodecError::NotEnoughData)));
        let mut buf = BytesMut::from(&[0x02][..]);
        assert!(matches!(read_bool(&mut buf), Err(CodecError::InvalidValue(_))));
    }
}
