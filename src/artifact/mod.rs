// src/artifact/mod.rs

//! Artifact identity and memory.
//!
//! - [`decode`]: logical names read from artifact bytes.
//! - [`hash`]: content hashes and name digests.
//! - [`cache`]: the fingerprint cache of committed artifacts.
//! - [`archive`]: expansion of container files into member artifacts.

pub mod archive;
pub mod cache;
pub mod decode;
pub mod hash;

pub use archive::{expand, ArchiveMember, ArchiveMembers};
pub use cache::FingerprintCache;
pub use decode::{ArtifactDecoder, ClassFileDecoder, DecodeError};
pub use hash::content_hash;
