// src/artifact/decode.rs

//! Logical-name extraction.
//!
//! An artifact's identity comes from its own bytes, never from the file it
//! was delivered in. [`ArtifactDecoder`] is the seam; [`ClassFileDecoder`]
//! is the default and reads the binary name out of a JVM class file.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {0}")]
    Truncated(usize),

    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at entry {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("constant pool entry {index} is not a {expected}")]
    BadReference { index: u16, expected: &'static str },

    #[error("name is not valid UTF-8")]
    InvalidUtf8,

    #[error("empty logical name")]
    EmptyName,
}

/// Extracts the logical name of an artifact from its content.
pub trait ArtifactDecoder: Send + Sync {
    fn logical_name(&self, bytes: &[u8]) -> Result<String, DecodeError>;
}

impl<F> ArtifactDecoder for F
where
    F: Fn(&[u8]) -> Result<String, DecodeError> + Send + Sync,
{
    fn logical_name(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        self(bytes)
    }
}

const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Reads `this_class` from a class file and returns it in dotted form
/// (`com/example/Foo` becomes `com.example.Foo`).
///
/// Only the header, constant pool and `this_class` index are read; the rest
/// of the file is not validated here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFileDecoder;

enum Constant<'a> {
    Utf8(&'a [u8]),
    Class(u16),
    Other,
    // Second slot of a long/double.
    Unusable,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::Truncated(self.pos))?;
        let slice = self.bytes.get(self.pos..end).ok_or(DecodeError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl ArtifactDecoder for ClassFileDecoder {
    fn logical_name(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        let mut r = Reader { bytes, pos: 0 };

        let magic = r.u32()?;
        if magic != CLASS_MAGIC {
            return Err(DecodeError::BadMagic(magic));
        }
        let _minor = r.u16()?;
        let _major = r.u16()?;

        let count = r.u16()?;
        // Index 0 is unused by the format.
        let mut pool: Vec<Constant<'_>> = Vec::with_capacity(count as usize);
        pool.push(Constant::Unusable);

        let mut index: u16 = 1;
        while index < count {
            let tag = r.u8()?;
            let constant = match tag {
                1 => {
                    let len = r.u16()? as usize;
                    Constant::Utf8(r.take(len)?)
                }
                7 => Constant::Class(r.u16()?),
                // int, float, field/method/interface refs, name-and-type, dynamic, invokedynamic
                3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                    r.take(4)?;
                    Constant::Other
                }
                // long, double: occupy two slots
                5 | 6 => {
                    r.take(8)?;
                    pool.push(Constant::Other);
                    index += 1;
                    Constant::Unusable
                }
                // string, method type, module, package
                8 | 16 | 19 | 20 => {
                    r.take(2)?;
                    Constant::Other
                }
                15 => {
                    r.take(3)?;
                    Constant::Other
                }
                other => return Err(DecodeError::UnknownTag { tag: other, index }),
            };
            pool.push(constant);
            index += 1;
        }

        let _access_flags = r.u16()?;
        let this_class = r.u16()?;

        let name_index = match pool.get(this_class as usize) {
            Some(Constant::Class(name_index)) => *name_index,
            _ => {
                return Err(DecodeError::BadReference {
                    index: this_class,
                    expected: "class",
                });
            }
        };
        let raw = match pool.get(name_index as usize) {
            Some(Constant::Utf8(raw)) => *raw,
            _ => {
                return Err(DecodeError::BadReference {
                    index: name_index,
                    expected: "utf8 string",
                });
            }
        };

        let internal = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
        if internal.is_empty() {
            return Err(DecodeError::EmptyName);
        }
        Ok(internal.replace('/', "."))
    }
}
