use crate::reader::ByteReader;
use crate::{ChunkTag, Error, ErrorKind};

/// Bit of the raw type byte marking a field as a variable length list
const FIELD_IS_LIST: u8 = 0x10;

/// The scalar or composite kind of a table field.
///
/// The low nibble of a table's type byte selects the kind; nibble 0 is the
/// table terminator and never a field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    StringId,
    String,
    Struct,
}

impl FieldType {
    pub(crate) fn from_nibble(nibble: u8) -> Option<FieldType> {
        match nibble {
            1 => Some(FieldType::I8),
            2 => Some(FieldType::U8),
            3 => Some(FieldType::I16),
            4 => Some(FieldType::U16),
            5 => Some(FieldType::I32),
            6 => Some(FieldType::U32),
            7 => Some(FieldType::I64),
            8 => Some(FieldType::U64),
            9 => Some(FieldType::StringId),
            10 => Some(FieldType::String),
            11 => Some(FieldType::Struct),
            _ => None,
        }
    }
}

/// Index of a [`Table`] within its chunk's [`TableRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TableId(usize);

/// A single field of a table: kind, list modifier, and name.
///
/// Field order within a table is decode order for records of that table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldDescriptor {
    pub kind: FieldType,
    pub is_list: bool,
    pub name: String,
    nested: Option<TableId>,
}

impl FieldDescriptor {
    /// The table holding this field's sub-schema, for `Struct` fields
    pub fn nested(&self) -> Option<TableId> {
        self.nested
    }

    /// Like [`FieldDescriptor::nested`], for callers that already know the
    /// field is a struct.
    pub(crate) fn nested_table(&self) -> TableId {
        // Every struct field is linked while the registry is built, so this
        // cannot fail for a field taken out of a TableRegistry.
        self.nested.expect("struct field without a sub-table")
    }
}

/// An ordered field list decoded from a chunk's embedded table header
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Table {
    fields: Vec<FieldDescriptor>,
}

impl Table {
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// The schema of one chunk: a tree of tables addressed by [`TableId`].
///
/// Index 0 is the root table. `Struct` fields link to the table holding
/// their sub-schema. Links always point at a table parsed later from the
/// stream, so the tree is cycle free by construction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TableRegistry {
    tables: Vec<Table>,
}

impl TableRegistry {
    pub const ROOT: TableId = TableId(0);

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn root(&self) -> &Table {
        &self.tables[0]
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parses a chunk's full table header.
    ///
    /// Reads the root table, then walks its struct fields depth-first in
    /// declaration order, parsing each sub-table from the stream as it is
    /// encountered. The walk uses an explicit work stack so hostile nesting
    /// depth cannot exhaust the call stack.
    ///
    /// Returns the registry together with the total bytes consumed across
    /// the whole tree, which the caller must cross-check against the size
    /// declared in the chunk header.
    pub(crate) fn from_reader(
        reader: &mut ByteReader,
        tag: ChunkTag,
    ) -> Result<(TableRegistry, usize), Error> {
        let (root, mut size) = read_table(reader, tag)?;
        let mut tables = vec![root];

        // (table, index of the first field not yet scanned for sub-tables)
        let mut stack = vec![(0usize, 0usize)];
        while let Some((table, field)) = stack.pop() {
            let next_struct = tables[table]
                .fields
                .iter()
                .enumerate()
                .skip(field)
                .find(|(_, f)| f.kind == FieldType::Struct)
                .map(|(i, _)| i);

            if let Some(i) = next_struct {
                let (sub, sub_size) = read_table(reader, tag)?;
                size += sub_size;
                let id = tables.len();
                tables.push(sub);
                tables[table].fields[i].nested = Some(TableId(id));
                stack.push((table, i + 1));
                stack.push((id, 0));
            }
        }

        Ok((TableRegistry { tables }, size))
    }
}

/// Reads a single table: type byte, gamma length prefixed field name,
/// repeated until a zero type byte. Returns the field list and the number
/// of bytes consumed, including the terminator.
fn read_table(reader: &mut ByteReader, tag: ChunkTag) -> Result<(Table, usize), Error> {
    let mut fields = Vec::new();
    let mut size = 0;
    loop {
        let raw = reader.u8()?;
        size += 1;

        if raw == 0 {
            break;
        }

        let (key_length, gamma_size) = reader.gamma()?;
        let name = String::from_utf8_lossy(reader.read(key_length as usize)?).into_owned();
        let kind = FieldType::from_nibble(raw & 0x0F)
            .ok_or_else(|| Error::new(ErrorKind::UnrecognizedFieldKind { tag, raw }))?;

        fields.push(FieldDescriptor {
            kind,
            is_list: raw & FIELD_IS_LIST != 0,
            name,
            nested: None,
        });

        size += key_length as usize + gamma_size;
    }

    Ok((Table { fields }, size))
}
