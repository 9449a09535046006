use std::io::{Read, Seek};
use std::sync::Arc;

use crate::codec::Codec;
use crate::errors::{Result, ResultExt};
use crate::read::read_basic::{decode_vlong_at, read_bytes_into, read_int, read_vlong, skip};
use crate::{SyncHash, SYNC_HASH_SIZE, SYNC_MARKER};

/// Per-column state inside one row group: the RLE key buffer, the raw
/// value buffer, and the cursors the field advance walks.
#[derive(Debug, Default)]
struct ColumnBuffer {
    projected: bool,
    /// Serialized (on-disk) length of the value buffer.
    buf_len: usize,
    /// Uncompressed length of the value buffer.
    uncompressed_buf_len: usize,
    key_buf: Vec<u8>,
    value_buf: Vec<u8>,
    key_pos: usize,
    value_pos: usize,
    field_len: usize,
    field_rep: usize,
}

impl ColumnBuffer {
    fn clear(&mut self) {
        self.buf_len = 0;
        self.uncompressed_buf_len = 0;
        self.key_buf.clear();
        self.value_buf.clear();
        self.key_pos = 0;
        self.value_pos = 0;
        self.field_len = 0;
        self.field_rep = 0;
    }

    // Advances to the next field: either burn one pending repetition
    // or decode the next VLong from the key buffer. A non-negative
    // VLong is a new field length; a negative one is the complement of
    // the number of additional repetitions of the current length, of
    // which this advance consumes the first.
    fn next_field(&mut self) -> Result<()> {
        if self.field_rep > 0 {
            self.field_rep -= 1;
        } else {
            let at_start = self.key_pos == 0;
            let (v, consumed) = decode_vlong_at(&self.key_buf, self.key_pos)?;
            self.key_pos += consumed;
            if v >= 0 {
                self.field_len = usize::try_from(v)
                    .map_err(|_| format_err!("field length {} overflows", v))?;
            } else {
                if at_start {
                    return Err(format_err!("run length with no preceding field length"));
                }
                let additional = (!v) as usize;
                if additional == 0 {
                    return Err(format_err!("empty run in field lengths"));
                }
                self.field_rep = additional - 1;
            }
        }
        self.value_pos += self.field_len;
        if self.value_pos > self.value_buf.len() {
            return Err(format_err!(
                "field lengths overrun the column buffer ({} > {})",
                self.value_pos,
                self.value_buf.len()
            ));
        }
        Ok(())
    }
}

/// One decoded row group: a slab of rows split column-wise, iterated
/// strictly forward.
///
/// The decoder owns no I/O source; [`RowGroup::read_next`] borrows any
/// `Read + Seek` for the duration of the fill. Field accessors return
/// borrows into the value buffers, invalidated by the next
/// `read_next`/`reset`.
pub struct RowGroup {
    sync_hash: SyncHash,
    codec: Option<Arc<dyn Codec>>,
    columns: Vec<ColumnBuffer>,
    num_rows: usize,
    row_pos: usize,
    record_length: usize,
    key_length: usize,
    compressed_key_length: usize,
    scratch: Vec<u8>,
}

impl RowGroup {
    /// Column `i` is decoded iff `column_read_mask[i]`; the mask length
    /// fixes the column count.
    pub fn new(column_read_mask: Vec<bool>) -> Self {
        let columns = column_read_mask
            .iter()
            .map(|projected| ColumnBuffer {
                projected: *projected,
                ..ColumnBuffer::default()
            })
            .collect();
        Self {
            sync_hash: [0; SYNC_HASH_SIZE],
            codec: None,
            columns,
            num_rows: 0,
            row_pos: 0,
            record_length: 0,
            key_length: 0,
            compressed_key_length: 0,
            scratch: vec![],
        }
    }

    /// Rebinds the group to a file's sync hash and codec and drops all
    /// decoded state, keeping buffer capacity.
    pub fn reset(
        &mut self,
        sync_hash: SyncHash,
        num_cols: usize,
        codec: Option<Arc<dyn Codec>>,
    ) -> Result<()> {
        if num_cols != self.columns.len() {
            return Err(format_err!(
                "row group shaped for {} columns, file has {}",
                self.columns.len(),
                num_cols
            ));
        }
        self.sync_hash = sync_hash;
        self.codec = codec;
        self.num_rows = 0;
        self.row_pos = 0;
        self.record_length = 0;
        self.key_length = 0;
        self.compressed_key_length = 0;
        for col in &mut self.columns {
            col.clear();
        }
        Ok(())
    }

    /// Fills the group from the next on-disk row group. On failure the
    /// group is left invalid and must be `reset` before reuse.
    pub fn read_next<R: Read + Seek>(&mut self, stream: &mut R) -> Result<()> {
        self.num_rows = 0;
        self.row_pos = 0;
        for col in &mut self.columns {
            col.clear();
        }
        self.read_header(stream)
            .context("reading row group header")?;
        self.read_key_buffers(stream)
            .context("reading row group key buffers")?;
        self.read_value_buffers(stream)
            .context("reading row group column buffers")?;
        Ok(())
    }

    fn read_header<R: Read>(&mut self, stream: &mut R) -> Result<()> {
        let mut first = read_int(stream)?;
        if first == SYNC_MARKER {
            self.check_sync(stream)?;
            first = read_int(stream)?;
        }
        self.record_length = non_negative(first as i64, "record length")?;
        self.key_length = non_negative(read_int(stream)? as i64, "key length")?;
        self.compressed_key_length =
            non_negative(read_int(stream)? as i64, "compressed key length")?;
        self.num_rows = non_negative(read_vlong(stream)?, "row count")?;
        Ok(())
    }

    fn check_sync<R: Read>(&mut self, stream: &mut R) -> Result<()> {
        let mut hash = [0u8; SYNC_HASH_SIZE];
        stream.read_exact(&mut hash)?;
        if hash != self.sync_hash {
            return Err(format_err!(
                "sync mismatch, expected {} got {}",
                hex(&self.sync_hash),
                hex(&hash)
            ));
        }
        Ok(())
    }

    fn read_key_buffers<R: Read + Seek>(&mut self, stream: &mut R) -> Result<()> {
        let codec = self.codec.clone();
        let mut scratch = std::mem::take(&mut self.scratch);
        for col in &mut self.columns {
            col.buf_len = non_negative(read_vlong(stream)?, "column buffer length")?;
            col.uncompressed_buf_len =
                non_negative(read_vlong(stream)?, "column uncompressed length")?;
            let key_buf_len = non_negative(read_vlong(stream)?, "key buffer length")?;
            if !col.projected {
                skip(stream, key_buf_len as u64)?;
                continue;
            }
            match &codec {
                Some(codec) => {
                    read_bytes_into(stream, key_buf_len, &mut scratch)?;
                    // Key buffers carry no uncompressed-length tag.
                    col.key_buf = codec.decompress(&scratch, 0)?;
                }
                None => read_bytes_into(stream, key_buf_len, &mut col.key_buf)?,
            }
        }
        self.scratch = scratch;
        Ok(())
    }

    fn read_value_buffers<R: Read + Seek>(&mut self, stream: &mut R) -> Result<()> {
        let codec = self.codec.clone();
        let mut scratch = std::mem::take(&mut self.scratch);
        for col in &mut self.columns {
            if !col.projected {
                skip(stream, col.buf_len as u64)?;
                continue;
            }
            match &codec {
                Some(codec) => {
                    read_bytes_into(stream, col.buf_len, &mut scratch)?;
                    let decoded = codec.decompress(&scratch, col.uncompressed_buf_len)?;
                    if decoded.len() != col.uncompressed_buf_len {
                        return Err(codec_err!(
                            "codec {} produced {} bytes, expected {}",
                            codec.name(),
                            decoded.len(),
                            col.uncompressed_buf_len
                        ));
                    }
                    col.value_buf = decoded;
                }
                None => read_bytes_into(stream, col.buf_len, &mut col.value_buf)?,
            }
        }
        self.scratch = scratch;
        Ok(())
    }

    /// Advances every projected column to the next row. Returns false
    /// once the group is exhausted.
    pub fn next_row(&mut self) -> Result<bool> {
        if self.row_pos >= self.num_rows {
            return Ok(false);
        }
        for col in &mut self.columns {
            if col.projected {
                col.next_field()?;
            }
        }
        self.row_pos += 1;
        Ok(true)
    }

    /// Length in bytes of the current field of a projected column.
    pub fn field_len(&self, col: usize) -> usize {
        self.columns[col].field_len
    }

    /// The current field bytes of a projected column; valid until the
    /// next `next_row`/`read_next`/`reset`.
    pub fn field(&self, col: usize) -> &[u8] {
        let col = &self.columns[col];
        &col.value_buf[col.value_pos - col.field_len..col.value_pos]
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn row_idx(&self) -> usize {
        self.row_pos
    }

    pub fn num_rows_remaining(&self) -> usize {
        self.num_rows - self.row_pos
    }

    pub fn record_length(&self) -> usize {
        self.record_length
    }

    pub fn key_length(&self) -> usize {
        self.key_length
    }

    pub fn compressed_key_length(&self) -> usize {
        self.compressed_key_length
    }
}

fn non_negative(v: i64, what: &str) -> Result<usize> {
    usize::try_from(v).map_err(|_| format_err!("negative {} {}", what, v))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
