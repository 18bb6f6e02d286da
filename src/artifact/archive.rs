// src/artifact/archive.rs

//! Container expansion.
//!
//! A group of artifacts that must be applied together can be shipped as one
//! zip file. Delivered as loose files, transport timing could split the group
//! across several drain cycles and therefore several transactions; a single
//! container is always observed as one change.

use std::io::{Cursor, Read};
use std::path::{Path, MAIN_SEPARATOR};

use chrono::NaiveDate;
use tracing::debug;
use zip::{DateTime, ZipArchive};

use crate::errors::{HotswapError, Result};
use crate::fs::FileSystem;

/// Upper bound on the buffer reserved up front for one member.
const MAX_PREALLOC: u64 = 1 << 20;

/// One qualifying entry of a container.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    /// `<container>!/<entry name>`; for diagnostics only, not a real path.
    pub synthetic_path: String,
    pub last_modified_ms: u64,
    pub bytes: Vec<u8>,
}

/// Lazy iterator over the members of a container whose names end with the
/// artifact suffix. Directory entries are skipped.
pub struct ArchiveMembers {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    prefix: String,
    member_suffix: String,
    fallback_ms: u64,
    next: usize,
}

impl std::fmt::Debug for ArchiveMembers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveMembers")
            .field("prefix", &self.prefix)
            .field("entries", &self.archive.len())
            .field("next", &self.next)
            .finish()
    }
}

/// Open `container` and prepare to walk its members.
///
/// Entries without a stored timestamp inherit the container's own
/// modification time.
pub fn expand(fs: &dyn FileSystem, container: &Path, member_suffix: &str) -> Result<ArchiveMembers> {
    let bytes = fs.read(container)?;
    let fallback_ms = fs.modified_ms(container).unwrap_or(0);
    let container_str = container.display().to_string();

    let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| HotswapError::ParseError {
        path: container_str.clone(),
        reason: e.to_string(),
    })?;
    debug!(container = %container_str, entries = archive.len(), "expanding container");

    Ok(ArchiveMembers {
        archive,
        prefix: format!("{container_str}!{MAIN_SEPARATOR}"),
        member_suffix: member_suffix.to_string(),
        fallback_ms,
        next: 0,
    })
}

impl Iterator for ArchiveMembers {
    type Item = Result<ArchiveMember>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.archive.len() {
            let index = self.next;
            self.next += 1;

            let mut entry = match self.archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(HotswapError::ParseError {
                        path: format!("{}#{index}", self.prefix),
                        reason: e.to_string(),
                    }));
                }
            };

            if entry.is_dir() || !entry.name().ends_with(&self.member_suffix) {
                continue;
            }

            let synthetic_path = format!("{}{}", self.prefix, entry.name());
            let last_modified_ms = entry
                .last_modified()
                .and_then(zip_time_to_unix_ms)
                .unwrap_or(self.fallback_ms);

            // Declared size is header data; cap the reservation.
            let mut bytes = Vec::with_capacity(entry.size().min(MAX_PREALLOC) as usize);
            if let Err(e) = entry.read_to_end(&mut bytes) {
                return Some(Err(HotswapError::ParseError {
                    path: synthetic_path,
                    reason: e.to_string(),
                }));
            }

            return Some(Ok(ArchiveMember {
                synthetic_path,
                last_modified_ms,
                bytes,
            }));
        }
        None
    }
}

/// Zip timestamps carry no zone; they are read as UTC. Impossible dates
/// (month 0, February 30th) yield `None`.
fn zip_time_to_unix_ms(dt: DateTime) -> Option<u64> {
    let millis = NaiveDate::from_ymd_opt(dt.year().into(), dt.month().into(), dt.day().into())?
        .and_hms_opt(dt.hour().into(), dt.minute().into(), dt.second().into())?
        .and_utc()
        .timestamp_millis();
    u64::try_from(millis).ok()
}
