use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::errors::Result;

#[inline(always)]
pub fn read_byte<R: Read>(r: &mut R) -> Result<u8> {
    Ok(r.read_u8()?)
}

#[inline(always)]
pub fn read_bool<R: Read>(r: &mut R) -> Result<bool> {
    Ok(read_byte(r)? != 0)
}

/// Four bytes, big-endian, two's complement.
#[inline(always)]
pub fn read_int<R: Read>(r: &mut R) -> Result<i32> {
    Ok(r.read_i32::<BigEndian>()?)
}

/// Hadoop `WritableUtils` variable-length integer.
///
/// A first byte in `[-112, 127]` is the value itself. Otherwise the
/// first byte encodes sign and byte count and the remaining 1-8 bytes
/// carry the magnitude most-significant-first; negative values are
/// stored as the complement of the accumulated magnitude.
pub fn read_vlong<R: Read>(r: &mut R) -> Result<i64> {
    let first = read_byte(r)? as i8;
    let len = vint_size(first);
    if len == 1 {
        return Ok(first as i64);
    }
    let mut bytes = [0u8; 8];
    r.read_exact(&mut bytes[..len - 1])?;
    let mut acc: i64 = 0;
    for b in &bytes[..len - 1] {
        acc = (acc << 8) | (*b as i64);
    }
    Ok(if is_negative_vint(first) { !acc } else { acc })
}

/// A VInt is a VLong constrained to the `i32` range.
pub fn read_vint<R: Read>(r: &mut R) -> Result<i32> {
    let v = read_vlong(r)?;
    i32::try_from(v).map_err(|_| format_err!("vint {} overflows i32", v))
}

/// Decodes one VLong from `buf` at `pos`, returning the value and the
/// number of bytes consumed. Used for the in-memory RLE key buffers.
pub fn decode_vlong_at(buf: &[u8], pos: usize) -> Result<(i64, usize)> {
    let first = *buf
        .get(pos)
        .ok_or_else(|| format_err!("vint at offset {} runs past end of buffer", pos))? as i8;
    let len = vint_size(first);
    if len == 1 {
        return Ok((first as i64, 1));
    }
    let bytes = buf
        .get(pos + 1..pos + len)
        .ok_or_else(|| format_err!("vint at offset {} runs past end of buffer", pos))?;
    let mut acc: i64 = 0;
    for b in bytes {
        acc = (acc << 8) | (*b as i64);
    }
    Ok((if is_negative_vint(first) { !acc } else { acc }, len))
}

/// VInt length `l` followed by `l` UTF-8 bytes; no validation beyond
/// the length.
pub fn read_text<R: Read>(r: &mut R) -> Result<String> {
    let len = read_vint(r)?;
    if len < 0 {
        return Err(format_err!("negative text length {}", len));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads exactly `n` bytes into `buf`, reusing its capacity.
pub fn read_bytes_into<R: Read>(r: &mut R, n: usize, buf: &mut Vec<u8>) -> Result<()> {
    buf.resize(n, 0);
    r.read_exact(buf.as_mut_slice())?;
    Ok(())
}

pub fn skip<R: Read + Seek>(r: &mut R, n: u64) -> Result<()> {
    r.seek(SeekFrom::Current(n as i64))?;
    Ok(())
}

fn vint_size(first: i8) -> usize {
    if first >= -112 {
        1
    } else if first < -120 {
        (-119 - first as i32) as usize
    } else {
        (-111 - first as i32) as usize
    }
}

fn is_negative_vint(first: i8) -> bool {
    first < -120 || (-112..0).contains(&first)
}
