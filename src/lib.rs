#[macro_use]
mod errors;

pub mod codec;
pub mod read;
pub mod storage;

pub use errors::{Error, Result, ResultExt};

use std::collections::HashMap;

// RCFile inherited its version header from SequenceFile; the trailing
// byte is the SequenceFile format version, not an RCFile one.
pub const VERSION_HEADER: [u8; 4] = [b'S', b'E', b'Q', 6];

pub const KEY_CLASS_NAME: &str = "org.apache.hadoop.hive.ql.io.RCFile$KeyBuffer";
pub const VALUE_CLASS_NAME: &str = "org.apache.hadoop.hive.ql.io.RCFile$ValueBuffer";

/// Mandatory header-metadata key holding the column count.
pub const COLUMN_NUMBER_KEY: &str = "hive.io.rcfile.column.number";

pub const SYNC_HASH_SIZE: usize = 16;
pub(crate) const SYNC_MARKER: i32 = -1;

/// The 16 random bytes a writer picks per file and repeats at row-group
/// boundaries.
pub type SyncHash = [u8; SYNC_HASH_SIZE];

/// Facts extracted from a file header, exposed once the reader has a
/// file open. `metadata` retains every header key, including the ones
/// the reader itself does not consume.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub num_cols: usize,
    pub is_compressed: bool,
    pub codec_name: Option<String>,
    pub metadata: HashMap<String, String>,
}
