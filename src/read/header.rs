use std::collections::HashMap;
use std::io::Read;

use crate::errors::Result;
use crate::read::read_basic::{read_bool, read_int, read_text};
use crate::{
    SyncHash, COLUMN_NUMBER_KEY, KEY_CLASS_NAME, SYNC_HASH_SIZE, VALUE_CLASS_NAME, VERSION_HEADER,
};

/// Everything a file header declares about the row groups that follow.
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub is_compressed: bool,
    pub codec_name: Option<String>,
    pub metadata: HashMap<String, String>,
    pub num_cols: usize,
    pub sync: SyncHash,
}

impl FileHeader {
    /// Parses the strict header sequence: version bytes, key/value
    /// class names, compression flags, optional codec class name,
    /// metadata map, sync hash.
    pub fn read<R: Read>(stream: &mut R) -> Result<FileHeader> {
        let mut version = [0u8; 4];
        stream.read_exact(&mut version)?;
        if version != VERSION_HEADER {
            return Err(format_err!("bad version header {:02x?}", version));
        }

        let key_class = read_text(stream)?;
        if key_class != KEY_CLASS_NAME {
            return Err(format_err!("unexpected key class name {:?}", key_class));
        }
        let value_class = read_text(stream)?;
        if value_class != VALUE_CLASS_NAME {
            return Err(format_err!("unexpected value class name {:?}", value_class));
        }

        let is_compressed = read_bool(stream)?;
        // Always false; the flag survives from the SequenceFile layout
        // RCFile borrowed its header from.
        if read_bool(stream)? {
            return Err(format_err!("block compression unsupported"));
        }

        let codec_name = if is_compressed {
            Some(read_text(stream)?)
        } else {
            None
        };

        let pairs = read_int(stream)?;
        if pairs < 0 {
            return Err(format_err!("negative metadata entry count {}", pairs));
        }
        // The count is untrusted; entries insert as they decode.
        let mut metadata = HashMap::new();
        for _ in 0..pairs {
            let key = read_text(stream)?;
            let value = read_text(stream)?;
            metadata.insert(key, value);
        }

        let num_cols = match metadata.get(COLUMN_NUMBER_KEY) {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format_err!("invalid {} value {:?}", COLUMN_NUMBER_KEY, value))?,
            None => {
                return Err(format_err!(
                    "missing mandatory metadata key {}",
                    COLUMN_NUMBER_KEY
                ))
            }
        };

        let mut sync = [0u8; SYNC_HASH_SIZE];
        stream.read_exact(&mut sync)?;

        Ok(FileHeader {
            is_compressed,
            codec_name,
            metadata,
            num_cols,
            sync,
        })
    }
}
