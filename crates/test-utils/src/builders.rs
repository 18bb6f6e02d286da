#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::time::Duration;

use hotswap::config::MonitorSettings;
use zip::write::SimpleFileOptions;
use zip::{DateTime, ZipWriter};

/// Smallest class file `ClassFileDecoder` accepts, naming `binary_name`
/// (dotted, e.g. `com.example.Foo`).
pub fn class_file(binary_name: &str) -> Vec<u8> {
    class_file_variant(binary_name, 0)
}

/// Same logical name as [`class_file`] but with distinct content per
/// `variant`, carried as an extra constant pool string.
pub fn class_file_variant(binary_name: &str, variant: u32) -> Vec<u8> {
    let internal = binary_name.replace('.', "/");
    let marker = format!("v{variant}");

    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes()); // minor
    out.extend_from_slice(&52u16.to_be_bytes()); // major
    out.extend_from_slice(&4u16.to_be_bytes()); // constant pool count

    // #1 Utf8 internal name
    out.push(1);
    out.extend_from_slice(&(internal.len() as u16).to_be_bytes());
    out.extend_from_slice(internal.as_bytes());
    // #2 Class -> #1
    out.push(7);
    out.extend_from_slice(&1u16.to_be_bytes());
    // #3 Utf8 marker
    out.push(1);
    out.extend_from_slice(&(marker.len() as u16).to_be_bytes());
    out.extend_from_slice(marker.as_bytes());

    out.extend_from_slice(&0x0021u16.to_be_bytes()); // public super
    out.extend_from_slice(&2u16.to_be_bytes()); // this_class
    out.extend_from_slice(&0u16.to_be_bytes()); // super_class
    out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    out.extend_from_slice(&0u16.to_be_bytes()); // fields
    out.extend_from_slice(&0u16.to_be_bytes()); // methods
    out.extend_from_slice(&0u16.to_be_bytes()); // attributes
    out
}

/// Bytes that fail class file decoding.
pub fn malformed_class_file() -> Vec<u8> {
    b"definitely not a class file".to_vec()
}

/// One member of a zip built by [`zip_bytes`].
pub struct ZipMember {
    pub name: String,
    pub bytes: Vec<u8>,
    /// `(year, month, day, hour, minute, second)`; use even seconds, zip
    /// timestamps have two-second resolution.
    pub modified: (u16, u8, u8, u8, u8, u8),
    pub is_dir: bool,
}

impl ZipMember {
    pub fn file(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            bytes,
            modified: (2024, 1, 2, 3, 4, 6),
            is_dir: false,
        }
    }

    pub fn dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bytes: Vec::new(),
            modified: (2024, 1, 2, 3, 4, 6),
            is_dir: true,
        }
    }

    pub fn modified(mut self, ymdhms: (u16, u8, u8, u8, u8, u8)) -> Self {
        self.modified = ymdhms;
        self
    }
}

/// Build an in-memory zip archive.
pub fn zip_bytes(members: &[ZipMember]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for member in members {
        let (y, mo, d, h, mi, s) = member.modified;
        let stamp = DateTime::from_date_and_time(y, mo, d, h, mi, s).expect("valid zip timestamp");
        let options = SimpleFileOptions::default().last_modified_time(stamp);
        if member.is_dir {
            writer
                .add_directory(member.name.as_str(), options)
                .expect("add zip directory");
        } else {
            writer
                .start_file(member.name.as_str(), options)
                .expect("start zip member");
            writer.write_all(&member.bytes).expect("write zip member");
        }
    }
    writer.finish().expect("finish zip").into_inner()
}

/// Builder for `MonitorSettings` to simplify test setup.
///
/// Defaults suit tests: no drain window, no listener grace, two workers.
pub struct SettingsBuilder {
    settings: MonitorSettings,
}

impl SettingsBuilder {
    pub fn new(artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            settings: MonitorSettings {
                artifact_root: artifact_root.into(),
                drain_window: Duration::ZERO,
                listener_grace: Duration::ZERO,
                max_workers: 2,
                ..MonitorSettings::default()
            },
        }
    }

    pub fn listener_grace(mut self, grace: Duration) -> Self {
        self.settings.listener_grace = grace;
        self
    }

    pub fn drain_window(mut self, window: Duration) -> Self {
        self.settings.drain_window = window;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.settings.max_workers = workers;
        self
    }

    pub fn build(self) -> MonitorSettings {
        self.settings
    }
}
