//! Builds RCFile byte images for tests. The encoding here is written
//! against the format grammar, independent of the crate's decoder.

use rcfile::{SyncHash, COLUMN_NUMBER_KEY, KEY_CLASS_NAME, VALUE_CLASS_NAME, VERSION_HEADER};

type CompressFn = Box<dyn Fn(&[u8]) -> Vec<u8>>;

pub fn put_int(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

// WritableUtils.writeVLong.
pub fn put_vlong(buf: &mut Vec<u8>, mut v: i64) {
    if (-112..=127).contains(&v) {
        buf.push(v as u8);
        return;
    }
    let mut len: i32 = -112;
    if v < 0 {
        v = !v;
        len = -120;
    }
    let mut tmp = v;
    while tmp != 0 {
        tmp >>= 8;
        len -= 1;
    }
    buf.push(len as u8);
    let n = if len < -120 { -(len + 120) } else { -(len + 112) };
    for idx in (1..=n).rev() {
        buf.push((v >> ((idx - 1) * 8)) as u8);
    }
}

pub fn put_text(buf: &mut Vec<u8>, s: &str) {
    put_vlong(buf, s.len() as i64);
    buf.extend_from_slice(s.as_bytes());
}

/// One column's fields, row-major.
pub fn col(fields: &[&str]) -> Vec<Vec<u8>> {
    fields.iter().map(|f| f.as_bytes().to_vec()).collect()
}

pub struct RcFileBuilder {
    num_cols: usize,
    sync: SyncHash,
    codec: Option<(String, CompressFn)>,
    extra_metadata: Vec<(String, String)>,
    omit_column_count: bool,
    groups: Vec<(bool, Vec<Vec<Vec<u8>>>)>,
}

impl RcFileBuilder {
    pub fn new(num_cols: usize, sync: SyncHash) -> Self {
        Self {
            num_cols,
            sync,
            codec: None,
            extra_metadata: vec![],
            omit_column_count: false,
            groups: vec![],
        }
    }

    pub fn codec(mut self, class_name: &str, f: impl Fn(&[u8]) -> Vec<u8> + 'static) -> Self {
        self.codec = Some((class_name.to_owned(), Box::new(f)));
        self
    }

    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.extra_metadata.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn omit_column_count(mut self) -> Self {
        self.omit_column_count = true;
        self
    }

    /// Appends a row group; `with_sync` prefixes it with the sync
    /// sentinel and hash. `cols[c]` lists column `c`'s fields in row
    /// order.
    pub fn row_group(mut self, with_sync: bool, cols: Vec<Vec<Vec<u8>>>) -> Self {
        assert_eq!(cols.len(), self.num_cols);
        if let Some(first) = cols.first() {
            assert!(cols.iter().all(|c| c.len() == first.len()));
        }
        self.groups.push((with_sync, cols));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(&VERSION_HEADER);
        put_text(&mut bytes, KEY_CLASS_NAME);
        put_text(&mut bytes, VALUE_CLASS_NAME);
        bytes.push(self.codec.is_some() as u8);
        bytes.push(0);
        if let Some((name, _)) = &self.codec {
            put_text(&mut bytes, name);
        }

        let mut metadata: Vec<(String, String)> = vec![];
        if !self.omit_column_count {
            metadata.push((COLUMN_NUMBER_KEY.to_owned(), self.num_cols.to_string()));
        }
        metadata.extend(self.extra_metadata.iter().cloned());
        put_int(&mut bytes, metadata.len() as i32);
        for (key, value) in &metadata {
            put_text(&mut bytes, key);
            put_text(&mut bytes, value);
        }
        bytes.extend_from_slice(&self.sync);

        for (with_sync, cols) in &self.groups {
            self.append_group(&mut bytes, *with_sync, cols);
        }
        bytes
    }

    fn append_group(&self, bytes: &mut Vec<u8>, with_sync: bool, cols: &[Vec<Vec<u8>>]) {
        let num_rows = cols.first().map(|c| c.len()).unwrap_or(0);

        let mut rows_vint = vec![];
        put_vlong(&mut rows_vint, num_rows as i64);

        let mut key_section = vec![];
        let mut value_section = vec![];
        for fields in cols {
            let raw_values: Vec<u8> = fields.iter().flatten().copied().collect();
            let mut key_buf = vec![];
            encode_lengths(fields, &mut key_buf);

            let (value_disk, key_disk) = match &self.codec {
                Some((_, f)) => (f(&raw_values), f(&key_buf)),
                None => (raw_values.clone(), key_buf.clone()),
            };
            put_vlong(&mut key_section, value_disk.len() as i64);
            put_vlong(&mut key_section, raw_values.len() as i64);
            put_vlong(&mut key_section, key_disk.len() as i64);
            key_section.extend_from_slice(&key_disk);
            value_section.extend_from_slice(&value_disk);
        }

        let key_length = rows_vint.len() + key_section.len();
        let record_length = key_length + value_section.len();

        if with_sync {
            put_int(bytes, -1);
            bytes.extend_from_slice(&self.sync);
        }
        put_int(bytes, record_length as i32);
        put_int(bytes, key_length as i32);
        put_int(bytes, key_length as i32);
        bytes.extend_from_slice(&rows_vint);
        bytes.extend_from_slice(&key_section);
        bytes.extend_from_slice(&value_section);
    }
}

// Runs of equal lengths collapse to the length followed by the
// complement of the repetition count.
fn encode_lengths(fields: &[Vec<u8>], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < fields.len() {
        let len = fields[i].len();
        let mut run = 1;
        while i + run < fields.len() && fields[i + run].len() == len {
            run += 1;
        }
        put_vlong(out, len as i64);
        if run > 1 {
            put_vlong(out, !(run as i64 - 1));
        }
        i += run;
    }
}

/// Byte offset of the `n`th occurrence of `needle` (0-based).
pub fn find_nth(haystack: &[u8], needle: &[u8], n: usize) -> usize {
    let mut seen = 0;
    for i in 0..=haystack.len() - needle.len() {
        if &haystack[i..i + needle.len()] == needle {
            if seen == n {
                return i;
            }
            seen += 1;
        }
    }
    panic!("needle not found {} times", n + 1);
}
