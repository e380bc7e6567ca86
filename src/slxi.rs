use crate::reader::ByteReader;
use crate::{ChunkTag, Error};

/// The one feature name whose extra data payload is known to be UTF-8 text
const VERSION_LABEL: &str = "version_label";

/// Per-feature capability bits carried in the SLXI extension chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlxiFlags(u32);

impl SlxiFlags {
    const IGNORABLE_UNKNOWN: u32 = 0x1;
    const IGNORABLE_VERSION: u32 = 0x2;
    const EXTRA_DATA: u32 = 0x4;
    const CHUNK_ID_LIST: u32 = 0x8;

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// A loader that does not know this feature may still load the save
    pub fn ignorable_if_unknown(&self) -> bool {
        self.0 & Self::IGNORABLE_UNKNOWN != 0
    }

    /// A loader with a different feature version may still load the save
    pub fn ignorable_version_mismatch(&self) -> bool {
        self.0 & Self::IGNORABLE_VERSION != 0
    }

    /// The feature carries an opaque extra data blob
    pub fn has_extra_data(&self) -> bool {
        self.0 & Self::EXTRA_DATA != 0
    }

    /// The feature carries a list of chunk tags it applies to
    pub fn has_chunk_id_list(&self) -> bool {
        self.0 & Self::CHUNK_ID_LIST != 0
    }

    /// Names of the set capability bits
    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.ignorable_if_unknown() {
            names.push("ignorable-if-unknown");
        }
        if self.ignorable_version_mismatch() {
            names.push("ignorable-version-mismatch");
        }
        if self.has_extra_data() {
            names.push("has-extra-data");
        }
        if self.has_chunk_id_list() {
            names.push("has-chunk-id-list");
        }
        names
    }
}

/// Extra data attached to an SLXI feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlxiExtraData {
    /// UTF-8 text, used by the well-known `version_label` feature
    Text(String),

    /// An opaque byte blob whose layout is owned by the feature
    Raw(Vec<u8>),
}

/// One optional feature descriptor from the SLXI extension chunk
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SlxiFeature {
    pub name: String,
    pub version: u16,
    pub flags: SlxiFlags,
    pub extra_data: Option<SlxiExtraData>,
    pub chunks: Vec<ChunkTag>,
}

/// Decodes the SLXI extension chunk payload.
///
/// The chunk's own format is versioned and flag-gated: a nonzero chunk
/// version or flags word means a layout this decoder does not know, so the
/// whole chunk is refused (`None`) rather than guessed at. A zero/zero
/// header yields the full feature list in ordinal order.
pub(crate) fn read_slxi(payload: &[u8]) -> Result<Option<Vec<SlxiFeature>>, Error> {
    let mut reader = ByteReader::new(payload);

    let chunk_version = reader.u32()?;
    if chunk_version > 0 {
        return Ok(None);
    }
    let chunk_flags = reader.u32()?;
    if chunk_flags != 0 {
        return Ok(None);
    }

    let item_count = reader.u32()?;
    let mut features = Vec::new();
    for _ in 0..item_count {
        let flags = SlxiFlags(reader.u32()?);
        let version = reader.u16()?;
        let name = reader.string()?;

        let extra_data = if flags.has_extra_data() {
            let size = reader.u32()? as usize;
            let bytes = reader.read(size)?;
            if name == VERSION_LABEL {
                Some(SlxiExtraData::Text(
                    String::from_utf8_lossy(bytes).into_owned(),
                ))
            } else {
                Some(SlxiExtraData::Raw(bytes.to_vec()))
            }
        } else {
            None
        };

        let chunks = if flags.has_chunk_id_list() {
            let count = reader.u32()?;
            let mut chunks = Vec::new();
            for _ in 0..count {
                chunks.push(ChunkTag::new(reader.read_array::<4>()?));
            }
            chunks
        } else {
            Vec::new()
        };

        features.push(SlxiFeature {
            name,
            version,
            flags,
            extra_data,
            chunks,
        });
    }

    // Trailing bytes after the feature list are tolerated: later format
    // revisions append here.
    Ok(Some(features))
}

#[cfg(feature = "serde")]
impl serde::Serialize for SlxiFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.names())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SlxiExtraData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            SlxiExtraData::Text(text) => serializer.serialize_str(text),
            SlxiExtraData::Raw(bytes) => serializer.collect_seq(bytes.iter()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(flags: u32, version: u16, name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&flags.to_be_bytes());
        out.extend_from_slice(&version.to_be_bytes());
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
        out
    }

    #[test]
    fn test_nonzero_version_refused() {
        let mut payload = vec![0x00, 0x00, 0x00, 0x01];
        payload.extend_from_slice(&[0xFF; 32]);
        assert_eq!(read_slxi(&payload).unwrap(), None);
    }

    #[test]
    fn test_nonzero_flags_refused() {
        let payload = [0, 0, 0, 0, 0, 0, 0, 1];
        assert_eq!(read_slxi(&payload).unwrap(), None);
    }

    #[test]
    fn test_empty_feature_list() {
        let payload = [0u8; 12];
        assert_eq!(read_slxi(&payload).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_feature_flags_and_lists() {
        let mut payload = vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2];
        payload.extend(feature(0x3, 7, "town_cargo"));
        let mut second = feature(0x8, 1, "linkgraph");
        second.extend_from_slice(&1u32.to_be_bytes());
        second.extend_from_slice(b"LGRP");
        payload.extend(second);

        let features = read_slxi(&payload).unwrap().unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(features[0].name, "town_cargo");
        assert_eq!(features[0].version, 7);
        assert_eq!(
            features[0].flags.names(),
            vec!["ignorable-if-unknown", "ignorable-version-mismatch"]
        );
        assert_eq!(features[0].extra_data, None);
        assert!(features[0].chunks.is_empty());

        assert_eq!(features[1].name, "linkgraph");
        assert_eq!(features[1].chunks, vec![ChunkTag::new(*b"LGRP")]);
    }

    #[test]
    fn test_version_label_extra_data_is_text() {
        let mut payload = vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let mut item = feature(0x4, 1, VERSION_LABEL);
        item.extend_from_slice(&5u32.to_be_bytes());
        item.extend_from_slice(b"jgrpp");
        payload.extend(item);

        let features = read_slxi(&payload).unwrap().unwrap();
        assert_eq!(
            features[0].extra_data,
            Some(SlxiExtraData::Text("jgrpp".to_string()))
        );
    }

    #[test]
    fn test_other_extra_data_stays_raw() {
        let mut payload = vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let mut item = feature(0x4, 1, "plans");
        item.extend_from_slice(&2u32.to_be_bytes());
        item.extend_from_slice(&[0xAB, 0xCD]);
        payload.extend(item);

        let features = read_slxi(&payload).unwrap().unwrap();
        assert_eq!(
            features[0].extra_data,
            Some(SlxiExtraData::Raw(vec![0xAB, 0xCD]))
        );
    }

    #[test]
    fn test_truncated_item_fails() {
        // item count says one feature, but the payload ends early
        let payload = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0];
        assert!(read_slxi(&payload).is_err());
    }
}
