use crate::compression::Compression;
use crate::reader::ByteReader;
use crate::record::{decode_record, Record};
use crate::schema::TableRegistry;
use crate::slxi::{read_slxi, SlxiFeature};
use crate::{Error, ErrorKind};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

/// A 4-character chunk identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkTag([u8; 4]);

impl ChunkTag {
    /// The extension negotiation chunk
    pub const SLXI: ChunkTag = ChunkTag(*b"SLXI");

    /// Chunks known to carry garbage after the last schema field
    const TRAILING_JUNK: [ChunkTag; 2] = [ChunkTag(*b"GSDT"), ChunkTag(*b"AIPL")];

    #[inline]
    pub const fn new(tag: [u8; 4]) -> ChunkTag {
        ChunkTag(tag)
    }

    #[inline]
    pub const fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    pub(crate) fn allows_trailing_junk(&self) -> bool {
        Self::TRAILING_JUNK.contains(self)
    }
}

impl From<[u8; 4]> for ChunkTag {
    fn from(tag: [u8; 4]) -> Self {
        ChunkTag(tag)
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChunkTag({})", self)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ChunkTag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// How far a chunk could be decoded
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ChunkState {
    /// The chunk carried a table header and its records were decoded
    Decoded(TableRegistry),

    /// The SLXI extension chunk was understood and its features decoded
    Extensions,

    /// Present but opaque: no embedded schema, or an SLXI layout this
    /// decoder refuses to guess at
    Unsupported,
}

/// A decoded savegame: version, per-chunk schemas, and all decoded records.
///
/// Populated by a single strictly sequential pass over the uncompressed
/// chunk stream. Any structural inconsistency aborts the decode; chunks
/// decoded before the failure remain visible on the partially filled value,
/// which helps diagnose where a file went bad.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Savegame {
    version: u16,
    chunks: BTreeMap<ChunkTag, ChunkState>,
    items: BTreeMap<ChunkTag, BTreeMap<u32, Record>>,
    extensions: Vec<SlxiFeature>,
}

impl Savegame {
    pub fn new() -> Savegame {
        Savegame::default()
    }

    /// Decodes a whole savegame from a reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Savegame, Error> {
        let mut savegame = Savegame::new();
        savegame.read(reader)?;
        Ok(savegame)
    }

    /// Decodes a whole savegame from a byte slice
    pub fn from_slice(data: &[u8]) -> Result<Savegame, Error> {
        Savegame::from_reader(data)
    }

    /// The savegame format version from the outer header
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Decode status per chunk tag encountered in the file
    pub fn chunks(&self) -> &BTreeMap<ChunkTag, ChunkState> {
        &self.chunks
    }

    /// All decoded records, keyed by chunk tag and record index
    pub fn items(&self) -> &BTreeMap<ChunkTag, BTreeMap<u32, Record>> {
        &self.items
    }

    /// The records of one chunk, if any were decoded
    pub fn chunk_items(&self, tag: ChunkTag) -> Option<&BTreeMap<u32, Record>> {
        self.items.get(&tag)
    }

    /// Features announced by the SLXI extension chunk, in ordinal order
    pub fn extensions(&self) -> &[SlxiFeature] {
        &self.extensions
    }

    /// Decodes a savegame into `self`.
    ///
    /// On failure everything decoded before the bad byte is left in place.
    pub fn read<R: Read>(&mut self, mut reader: R) -> Result<(), Error> {
        let mut header = [0u8; 8];
        reader.read_exact(&mut header)?;
        let magic = [header[0], header[1], header[2], header[3]];
        self.version = u16::from_be_bytes([header[4], header[5]]);

        let codec = Compression::lookup(magic)
            .ok_or_else(|| Error::new(ErrorKind::UnknownCompression { magic }))?;
        let data = codec.decompress(reader)?;
        self.read_chunks(&data)
    }

    fn read_chunks(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut reader = ByteReader::new(data);
        loop {
            let remaining = reader.remaining();
            if remaining.is_empty() {
                break;
            }
            if remaining.len() < 4 {
                return Err(Error::new(ErrorKind::MalformedTag {
                    offset: reader.position(),
                }));
            }
            let tag_bytes = reader.read_array::<4>()?;
            if tag_bytes == [0; 4] {
                break;
            }
            let tag = ChunkTag::new(tag_bytes);

            let header = reader.u8()?;
            let kind = header & 0x0F;
            match kind {
                0 => {
                    let size = usize::from(header >> 4) << 24 | reader.u24()? as usize;
                    let payload = reader.read(size)?;
                    if tag == ChunkTag::SLXI {
                        match read_slxi(payload)? {
                            Some(features) => {
                                self.extensions = features;
                                self.chunks.insert(tag, ChunkState::Extensions);
                            }
                            None => {
                                self.chunks.insert(tag, ChunkState::Unsupported);
                            }
                        }
                    } else {
                        // A blob chunk carries no schema; its bytes are
                        // consumed but stay opaque.
                        self.chunks.insert(tag, ChunkState::Unsupported);
                    }
                }
                1..=4 => self.read_collection(tag, kind, &mut reader)?,
                _ => return Err(Error::new(ErrorKind::UnknownChunkType { tag, header })),
            }
        }

        if !reader.is_empty() {
            return Err(Error::new(ErrorKind::TrailingFileData {
                offset: reader.position(),
            }));
        }
        Ok(())
    }

    /// Decodes one collection chunk: an optional embedded table header for
    /// types 3/4, then the record loop. Types 2/4 carry an explicit gamma
    /// index per record; types 1/3 count up from zero.
    fn read_collection(
        &mut self,
        tag: ChunkTag,
        kind: u8,
        reader: &mut ByteReader,
    ) -> Result<(), Error> {
        let registry = if kind >= 3 {
            let (declared, _) = reader.gamma()?;
            let (registry, consumed) = TableRegistry::from_reader(reader, tag)?;
            // Declared sizes are stored offset by one; zero is a sentinel.
            if consumed + 1 != declared as usize {
                return Err(Error::new(ErrorKind::SchemaSizeMismatch {
                    tag,
                    declared: (declared as usize).saturating_sub(1),
                    actual: consumed,
                }));
            }
            Some(registry)
        } else {
            None
        };

        let sparse = kind == 2 || kind == 4;
        let mut next_index = 0u32;
        loop {
            let (size, _) = reader.gamma()?;
            if size == 0 {
                break;
            }
            let mut size = size as usize - 1;

            let index = if sparse {
                let (index, index_size) = reader.gamma()?;
                size = size.checked_sub(index_size).ok_or_else(|| {
                    Error::new(ErrorKind::Eof {
                        offset: reader.position(),
                    })
                })?;
                index
            } else {
                let index = next_index;
                next_index += 1;
                index
            };

            if size != 0 {
                let payload = reader.read(size)?;
                match &registry {
                    Some(registry) => {
                        let mut record_reader = ByteReader::new(payload);
                        let record =
                            decode_record(&mut record_reader, registry, TableRegistry::ROOT)?;
                        if !record_reader.is_empty() && !tag.allows_trailing_junk() {
                            return Err(Error::new(ErrorKind::TrailingRecordData {
                                tag,
                                remaining: record_reader.remaining().len(),
                            }));
                        }
                        self.items.entry(tag).or_default().insert(index, record);
                    }
                    None => {
                        self.chunks.insert(tag, ChunkState::Unsupported);
                    }
                }
            }
        }

        if let Some(registry) = registry {
            self.chunks.insert(tag, ChunkState::Decoded(registry));
        }
        Ok(())
    }
}
