//! Optional durability for per-partition partial sums.
//!
//! A checkpoint store is a key-value store keyed by the term range of a partition, so a run
//! with a different partitioning simply misses. It sits entirely outside the numeric core: a
//! run gives the same digits whether its partial results come from a store or are computed
//! fresh. Stored entries are untrusted. An entry whose recorded range differs from the range
//! it was stored under, or whose checksum does not match, is corrupt and fails the run.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use num_bigint::BigInt;
use num_traits::Num;
use parking_lot::Mutex;

use crate::error::PiError;
use crate::partition::Partition;
use crate::series::{SplitResult, TermRange};

/// Storage for partition triples, shared by all workers of a run.
pub trait CheckpointStore: Send + Sync {
    /// Returns the stored triple for `partition`, if any.
    fn load(&self, partition: &Partition) -> Result<Option<SplitResult>, PiError>;

    /// Records the triple computed for `partition`.
    fn store(&self, partition: &Partition, result: &SplitResult) -> Result<(), PiError>;
}

fn ensure_same_range(partition: &Partition, stored: TermRange) -> Result<(), PiError> {
    if stored == partition.range() {
        Ok(())
    } else {
        Err(PiError::checkpoint(
            Some(partition.index()),
            format!(
                "stored range {stored} does not match partition range {}",
                partition.range()
            ),
        ))
    }
}

/// In-memory store, mostly useful for tests and for resuming within one process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<TermRange, (TermRange, SplitResult)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Inserts an entry under `key` verbatim, whatever range it claims to cover.
    pub fn insert_raw(&self, key: TermRange, recorded: TermRange, result: SplitResult) {
        self.entries.lock().insert(key, (recorded, result));
    }
}

impl CheckpointStore for MemoryStore {
    fn load(&self, partition: &Partition) -> Result<Option<SplitResult>, PiError> {
        let entries = self.entries.lock();
        match entries.get(&partition.range()) {
            None => Ok(None),
            Some((range, result)) => {
                ensure_same_range(partition, *range)?;
                Ok(Some(result.clone()))
            }
        }
    }

    fn store(&self, partition: &Partition, result: &SplitResult) -> Result<(), PiError> {
        self.entries
            .lock()
            .insert(partition.range(), (partition.range(), result.clone()));
        Ok(())
    }
}

/// Directory of checkpoint files, one per partition range, named
/// `partition-<start>-<end>.chk`.
///
/// File format (text, one field per line):
///
/// ```text
/// range <start> <end>
/// p <hex>
/// q <hex>
/// t <hex>
/// crc <crc32 of the lines above, 8 hex digits>
/// ```
///
/// Files are written to a temporary name and renamed into place.
#[derive(Clone, Debug)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Opens (creating if needed) the checkpoint directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PiError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|err| {
            PiError::checkpoint(None, format!("cannot create {}: {err}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, range: TermRange) -> PathBuf {
        self.dir
            .join(format!("partition-{}-{}.chk", range.start(), range.end()))
    }
}

impl CheckpointStore for DirStore {
    fn load(&self, partition: &Partition) -> Result<Option<SplitResult>, PiError> {
        let path = self.path_for(partition.range());
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(PiError::checkpoint(
                    Some(partition.index()),
                    format!("cannot read {}: {err}", path.display()),
                ));
            }
        };
        let (range, result) = decode_entry(&text)
            .map_err(|reason| PiError::checkpoint(Some(partition.index()), reason))?;
        ensure_same_range(partition, range)?;
        Ok(Some(result))
    }

    fn store(&self, partition: &Partition, result: &SplitResult) -> Result<(), PiError> {
        let path = self.path_for(partition.range());
        let staging = path.with_extension("chk.tmp");
        let text = encode_entry(partition.range(), result);
        fs::write(&staging, text)
            .and_then(|()| fs::rename(&staging, &path))
            .map_err(|err| {
                PiError::checkpoint(
                    Some(partition.index()),
                    format!("cannot write {}: {err}", path.display()),
                )
            })
    }
}

fn encode_entry(range: TermRange, result: &SplitResult) -> String {
    let body = format!(
        "range {} {}\np {:x}\nq {:x}\nt {:x}\n",
        range.start(),
        range.end(),
        result.p(),
        result.q(),
        result.t()
    );
    let crc = crc32fast::hash(body.as_bytes());
    format!("{body}crc {crc:08x}\n")
}

fn decode_entry(text: &str) -> Result<(TermRange, SplitResult), String> {
    let crc_at = text
        .rfind("\ncrc ")
        .ok_or_else(|| "missing crc line".to_string())?;
    let (body, crc_line) = text.split_at(crc_at + 1);
    let recorded_hex = field(crc_line.lines().next(), "crc")?;
    let recorded = u32::from_str_radix(recorded_hex.trim(), 16)
        .map_err(|err| format!("bad crc value: {err}"))?;
    if crc_line.lines().skip(1).any(|line| !line.trim().is_empty()) {
        return Err("trailing data after crc".to_string());
    }
    let actual = crc32fast::hash(body.as_bytes());
    if actual != recorded {
        return Err(format!(
            "checksum mismatch: recorded {recorded:08x}, contents hash to {actual:08x}"
        ));
    }

    let mut lines = body.lines();
    let range_line = field(lines.next(), "range")?;
    let (start, end) = range_line
        .split_once(' ')
        .ok_or_else(|| format!("malformed range line {range_line:?}"))?;
    let start = start
        .parse::<u64>()
        .map_err(|err| format!("bad range start: {err}"))?;
    let end = end.parse::<u64>().map_err(|err| format!("bad range end: {err}"))?;
    let range = TermRange::new(start, end).map_err(|err| err.to_string())?;

    let p = hex_field(lines.next(), "p")?;
    let q = hex_field(lines.next(), "q")?;
    let t = hex_field(lines.next(), "t")?;
    if lines.any(|line| !line.trim().is_empty()) {
        return Err("trailing data after t".to_string());
    }
    Ok((range, SplitResult::new(p, q, t)))
}

fn field<'a>(line: Option<&'a str>, name: &str) -> Result<&'a str, String> {
    let line = line.ok_or_else(|| format!("missing {name} line"))?;
    line.strip_prefix(name)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| format!("expected {name} line, found {line:?}"))
}

fn hex_field(line: Option<&str>, name: &str) -> Result<BigInt, String> {
    let value = field(line, name)?;
    BigInt::from_str_radix(value.trim(), 16).map_err(|err| format!("bad {name} value: {err}"))
}
