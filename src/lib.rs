/*!

A low level, self-contained decoder for [OpenTTD](https://www.openttd.org/)
savegames.

An OpenTTD save is a compressed container holding a sequence of tagged
chunks. Chunks written in the modern table format embed their own record
schema in the stream, so the file is self-describing: this crate
reconstructs each chunk's nested field layout from the bytes alone and then
decodes every record against it. No game data tables are required.

## Features

- ✔ Self-describing: table chunks decode into named, structured values
- ✔ Strict: byte-exact consumption checks catch malformed files early
- ✔ Defensive: unknown chunk layouts are reported as opaque, never guessed
- ✔ Decode-only: no game-rule validation, no re-encoding

## Quick Start

```rust
use ottdsave::{ChunkTag, Savegame, Value};

let mut data = b"OTTN\x00\x2c\x00\x00".to_vec();  // uncompressed, version 44
data.extend_from_slice(b"PLYR");
data.extend_from_slice(&[0x03, 0x07]);            // table chunk, header size
data.extend_from_slice(&[0x02, 0x03]);            // u8 field, name length 3
data.extend_from_slice(b"age");
data.push(0x00);                                  // end of table
data.extend_from_slice(&[0x02, 0x2A]);            // one record: age = 42
data.push(0x00);                                  // end of records
data.extend_from_slice(&[0x00; 4]);               // end of file

let save = Savegame::from_slice(&data).unwrap();
assert_eq!(save.version(), 44);

let players = save.chunk_items(ChunkTag::new(*b"PLYR")).unwrap();
assert_eq!(players[&0].get("age"), Some(&Value::Uint(42)));
```

## Unsupported chunks

Not every chunk can be decoded: old-style chunks carry no embedded schema,
and the SLXI extension chunk refuses layouts newer than it understands.
These are not errors — they surface as [`ChunkState::Unsupported`] so a
consumer can tell opaque data from decoded data. Structural inconsistencies
(truncated tags, schema size mismatches, junk bytes) are hard errors that
abort the whole decode: chunk boundaries are only trustworthy if every
prior byte was interpreted exactly as intended.

## Compression

The first four bytes of a save name its codec: `OTTN` (none), `OTTZ`
(zlib), and `OTTX` (xz) are supported. The legacy LZO format (`OTTD`) is
reported as unknown compression.

*/

mod compression;
mod errors;
mod reader;
mod record;
mod savegame;
mod schema;
mod slxi;

pub use self::compression::Compression;
pub use self::errors::{Error, ErrorKind};
pub use self::reader::ByteReader;
pub use self::record::{Record, Value};
pub use self::savegame::{ChunkState, ChunkTag, Savegame};
pub use self::schema::{FieldDescriptor, FieldType, Table, TableId, TableRegistry};
pub use self::slxi::{SlxiExtraData, SlxiFeature, SlxiFlags};
