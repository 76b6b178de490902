//! Small length-prefixed encoding helpers shared by [`crate::value`] and
//! [`crate::event`]. Every variable-length field is `u32` little-endian length
//! followed by the raw bytes, so nested, self-delimiting decoding is possible
//! without an outer envelope length.

use crate::error::{Error, Result};

pub fn write_varbytes(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

pub fn read_varbytes<'a>(buf: &'a [u8], cursor: &mut usize) -> Result<&'a [u8]> {
    let len = read_u32(buf, cursor)? as usize;
    if buf.len() < *cursor + len {
        return Err(Error::Truncated("varbytes"));
    }
    let slice = &buf[*cursor..*cursor + len];
    *cursor += len;
    Ok(slice)
}

pub fn write_varstring(out: &mut Vec<u8>, s: &str) {
    write_varbytes(out, s.as_bytes());
}

pub fn read_varstring(buf: &[u8], cursor: &mut usize) -> Result<String> {
    let bytes = read_varbytes(buf, cursor)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| Error::MalformedEvent("invalid utf8".into()))
}

pub fn read_u8(buf: &[u8], cursor: &mut usize) -> Result<u8> {
    if buf.len() < *cursor + 1 {
        return Err(Error::Truncated("u8"));
    }
    let v = buf[*cursor];
    *cursor += 1;
    Ok(v)
}

pub fn read_u32(buf: &[u8], cursor: &mut usize) -> Result<u32> {
    if buf.len() < *cursor + 4 {
        return Err(Error::Truncated("u32"));
    }
    let v = u32::from_le_bytes(buf[*cursor..*cursor + 4].try_into().unwrap());
    *cursor += 4;
    Ok(v)
}
