use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};

use crate::errors::Result;

/// Storage transport the reader pulls file bytes through.
///
/// A handle is any `Read + Seek`; position and seeking come from
/// `Seek`, closing from `Drop`. `size` has a seek-to-end default so
/// backends only override it when they can answer cheaper.
pub trait Storage {
    type Handle: Read + Seek;

    fn open(&self, path: &str) -> Result<Self::Handle>;

    fn size(&self, handle: &mut Self::Handle) -> Result<u64> {
        let pos = handle.stream_position()?;
        let end = handle.seek(SeekFrom::End(0))?;
        handle.seek(SeekFrom::Start(pos))?;
        Ok(end)
    }
}

/// Local filesystem storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl Storage for LocalFs {
    type Handle = BufReader<File>;

    fn open(&self, path: &str) -> Result<Self::Handle> {
        Ok(BufReader::new(File::open(path)?))
    }

    fn size(&self, handle: &mut Self::Handle) -> Result<u64> {
        Ok(handle.get_ref().metadata()?.len())
    }
}

/// In-memory storage over named byte images. The row-group decoder is
/// testable against any `Read + Seek`; this backend lets the driver be
/// exercised the same way.
#[derive(Debug, Default, Clone)]
pub struct MemStorage {
    files: HashMap<String, Vec<u8>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }
}

impl Storage for MemStorage {
    type Handle = Cursor<Vec<u8>>;

    fn open(&self, path: &str) -> Result<Self::Handle> {
        let bytes = self.files.get(path).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no such file: {path}"))
        })?;
        Ok(Cursor::new(bytes.clone()))
    }
}
