use std::io::Seek;
use std::sync::Arc;

use log::{debug, trace};

use crate::codec::{Codec, CodecRegistry};
use crate::errors::{Result, ResultExt};
use crate::read::header::FileHeader;
use crate::read::row_group::RowGroup;
use crate::storage::Storage;
use crate::{FileInfo, SYNC_HASH_SIZE};

struct OpenFile<H> {
    handle: H,
    len: u64,
    header: FileHeader,
    codec: Option<Arc<dyn Codec>>,
}

/// Streams row groups out of an ordered list of RCFiles.
///
/// Files are consumed strictly in order; when one is exhausted the
/// next is opened and its header parsed. Once every path is drained,
/// [`Reader::read_next_row_group`] keeps succeeding with an empty
/// group (`num_rows == 0`).
pub struct Reader<S: Storage> {
    storage: S,
    paths: Vec<String>,
    column_read_mask: Vec<bool>,
    registry: CodecRegistry,
    cur_file: Option<OpenFile<S::Handle>>,
    cur_file_idx: Option<usize>,
    row_group_idx: usize,
    done: bool,
}

impl<S: Storage> Reader<S> {
    /// Column `i` of every file is decoded iff `column_read_mask[i]`;
    /// files must declare exactly `column_read_mask.len()` columns.
    pub fn new(storage: S, paths: Vec<String>, column_read_mask: Vec<bool>) -> Self {
        Self::with_registry(storage, paths, column_read_mask, CodecRegistry::default())
    }

    pub fn with_registry(
        storage: S,
        paths: Vec<String>,
        column_read_mask: Vec<bool>,
        registry: CodecRegistry,
    ) -> Self {
        Self {
            storage,
            paths,
            column_read_mask,
            registry,
            cur_file: None,
            cur_file_idx: None,
            row_group_idx: 0,
            done: false,
        }
    }

    /// An empty decoder shaped for this reader's mask, for use with
    /// [`Reader::read_next_row_group`].
    pub fn new_row_group(&self) -> RowGroup {
        RowGroup::new(self.column_read_mask.clone())
    }

    /// Fills `row_group` with the next row group, rolling over to the
    /// next file when the current one is exhausted. End of input is
    /// not an error: the group comes back with `num_rows == 0`.
    pub fn read_next_row_group(&mut self, row_group: &mut RowGroup) -> Result<()> {
        loop {
            if self.done {
                row_group.reset([0; SYNC_HASH_SIZE], self.num_cols(), None)?;
                return Ok(());
            }
            let Some(file) = self.cur_file.as_mut() else {
                self.open_next_file()?;
                continue;
            };
            let pos = file.handle.stream_position()?;
            if pos >= file.len {
                self.cur_file = None;
                continue;
            }
            row_group.reset(file.header.sync, file.header.num_cols, file.codec.clone())?;
            row_group
                .read_next(&mut file.handle)
                .with_context(|| {
                    format!(
                        "decoding row group {} in file {}",
                        self.row_group_idx,
                        self.paths[self.cur_file_idx.unwrap_or(0)]
                    )
                })?;
            trace!(
                "decoded row group {} ({} rows)",
                self.row_group_idx,
                row_group.num_rows()
            );
            self.row_group_idx += 1;
            return Ok(());
        }
    }

    /// Index of the file currently being read; `None` until the first
    /// file is opened.
    pub fn file_idx(&self) -> Option<usize> {
        self.cur_file_idx
    }

    /// Index of the next row group within the current file.
    pub fn row_group_idx(&self) -> usize {
        self.row_group_idx
    }

    pub fn num_cols(&self) -> usize {
        self.column_read_mask.len()
    }

    /// Header facts of the currently open file.
    pub fn file_info(&self) -> Option<FileInfo> {
        let idx = self.cur_file_idx?;
        let file = self.cur_file.as_ref()?;
        Some(FileInfo {
            path: self.paths[idx].clone(),
            num_cols: file.header.num_cols,
            is_compressed: file.header.is_compressed,
            codec_name: file.header.codec_name.clone(),
            metadata: file.header.metadata.clone(),
        })
    }

    fn open_next_file(&mut self) -> Result<()> {
        let idx = match self.cur_file_idx {
            None => 0,
            Some(i) => i + 1,
        };
        if idx >= self.paths.len() {
            self.done = true;
            return Ok(());
        }
        let path = &self.paths[idx];
        let mut handle = self
            .storage
            .open(path)
            .with_context(|| format!("opening file {path}"))?;
        let len = self.storage.size(&mut handle)?;
        let header =
            FileHeader::read(&mut handle).with_context(|| format!("in file {path}"))?;
        if header.num_cols != self.num_cols() {
            return Err(format_err!(
                "file {} declares {} columns, reader is shaped for {}",
                path,
                header.num_cols,
                self.num_cols()
            ));
        }
        let codec = match &header.codec_name {
            Some(name) => Some(
                self.registry
                    .resolve(name)
                    .with_context(|| format!("in file {path}"))?,
            ),
            None => None,
        };
        debug!(
            "opened rcfile {path}: {} cols, {len} bytes, codec {:?}",
            header.num_cols, header.codec_name
        );
        self.cur_file = Some(OpenFile {
            handle,
            len,
            header,
            codec,
        });
        self.cur_file_idx = Some(idx);
        self.row_group_idx = 0;
        Ok(())
    }
}
