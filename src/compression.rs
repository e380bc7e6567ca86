use std::io::{self, BufReader, Read};

/// The codec registry for savegame payloads.
///
/// The first four bytes of a savegame name the codec that compressed the
/// chunk stream. [`Compression::lookup`] maps that magic to a decompressor;
/// an unrecognized magic is a fatal `UnknownCompression` error at the call
/// site, never a silent fallback.
///
/// The legacy LZO magic (`OTTD`) is deliberately absent from the registry
/// and is reported as unknown compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// `OTTN`: uncompressed chunk stream
    None,

    /// `OTTZ`: zlib compressed chunk stream
    Zlib,

    /// `OTTX`: xz compressed chunk stream
    Lzma,
}

impl Compression {
    /// Looks up the decompressor for a 4-byte codec magic
    pub fn lookup(magic: [u8; 4]) -> Option<Compression> {
        match &magic {
            b"OTTN" => Some(Compression::None),
            b"OTTZ" => Some(Compression::Zlib),
            b"OTTX" => Some(Compression::Lzma),
            _ => None,
        }
    }

    /// The codec magic written at the start of a savegame
    pub fn magic(&self) -> [u8; 4] {
        match self {
            Compression::None => *b"OTTN",
            Compression::Zlib => *b"OTTZ",
            Compression::Lzma => *b"OTTX",
        }
    }

    /// Inflates the rest of `reader` into an owned buffer.
    ///
    /// The whole stream is inflated up front: chunk boundaries depend on
    /// cumulative cursor position, so decoding is one strictly sequential
    /// pass over the uncompressed bytes.
    pub(crate) fn decompress<R: Read>(self, mut reader: R) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        match self {
            Compression::None => {
                reader.read_to_end(&mut out)?;
            }
            Compression::Zlib => {
                flate2::read::ZlibDecoder::new(reader).read_to_end(&mut out)?;
            }
            Compression::Lzma => {
                let mut input = BufReader::new(reader);
                lzma_rs::xz_decompress(&mut input, &mut out)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{:?}", e)))?;
            }
        }
        Ok(out)
    }
}
