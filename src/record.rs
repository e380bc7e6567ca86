use crate::reader::ByteReader;
use crate::schema::{FieldType, TableId, TableRegistry};
use crate::Error;

/// A single decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Any signed fixed-width integer field
    Int(i64),

    /// Any unsigned fixed-width integer or string-id field
    Uint(u64),

    /// A gamma length prefixed string field
    String(String),

    /// A variable length list field, one element per encoded item
    List(Vec<Value>),

    /// A nested record decoded through a struct field's sub-table
    Struct(Record),
}

/// A decoded record: field names mapped to values, in the order the fields
/// appear in the table that produced it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Returns the value of the named field
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Iterates fields in table declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, name: String, value: Value) {
        self.fields.push((name, value));
    }
}

/// One in-progress record on the decode stack. `list` is set while the
/// current field is a struct list with elements still to decode.
struct Frame {
    table: TableId,
    field: usize,
    out: Record,
    list: Option<(usize, Vec<Value>)>,
}

impl Frame {
    fn new(table: TableId) -> Frame {
        Frame {
            table,
            field: 0,
            out: Record::default(),
            list: None,
        }
    }
}

/// Decodes one record against the table at `root`.
///
/// Fields are consumed strictly left to right; struct fields descend into
/// their sub-table via an explicit frame stack, so nesting depth is bounded
/// by the registry size rather than the call stack. The caller is
/// responsible for checking that the reader's span was fully consumed.
pub(crate) fn decode_record(
    reader: &mut ByteReader,
    registry: &TableRegistry,
    root: TableId,
) -> Result<Record, Error> {
    let mut stack = vec![Frame::new(root)];

    loop {
        let top = stack.len() - 1;
        let fields = registry.table(stack[top].table).fields();

        if stack[top].field == fields.len() {
            // Table exhausted: hand the finished record to the parent frame.
            // The indexing above guarantees the stack is non-empty.
            let done = stack.pop().expect("frame stack is non-empty");
            if stack.is_empty() {
                return Ok(done.out);
            }
            let parent = &mut stack[top - 1];
            let descriptor = &registry.table(parent.table).fields()[parent.field];
            match parent.list.take() {
                Some((remaining, mut items)) => {
                    items.push(Value::Struct(done.out));
                    if remaining == 0 {
                        parent.out.push(descriptor.name.clone(), Value::List(items));
                        parent.field += 1;
                    } else {
                        parent.list = Some((remaining, items));
                    }
                }
                None => {
                    parent.out.push(descriptor.name.clone(), Value::Struct(done.out));
                    parent.field += 1;
                }
            }
            continue;
        }

        if stack[top].list.is_some() {
            // Struct list in progress: decode the next element.
            let nested = {
                let frame = &mut stack[top];
                let (remaining, _) = frame.list.as_mut().expect("list checked above");
                *remaining -= 1;
                registry.table(frame.table).fields()[frame.field].nested_table()
            };
            stack.push(Frame::new(nested));
            continue;
        }

        let descriptor = &fields[stack[top].field];
        if descriptor.is_list && descriptor.kind != FieldType::String {
            let (count, _) = reader.gamma()?;
            if descriptor.kind == FieldType::Struct {
                let frame = &mut stack[top];
                if count == 0 {
                    frame.out.push(descriptor.name.clone(), Value::List(Vec::new()));
                    frame.field += 1;
                } else {
                    frame.list = Some((count as usize, Vec::new()));
                }
            } else {
                let mut items = Vec::new();
                for _ in 0..count {
                    items.push(decode_scalar(reader, descriptor.kind)?);
                }
                let frame = &mut stack[top];
                frame.out.push(descriptor.name.clone(), Value::List(items));
                frame.field += 1;
            }
        } else if descriptor.kind == FieldType::Struct {
            stack.push(Frame::new(descriptor.nested_table()));
        } else {
            let value = decode_scalar(reader, descriptor.kind)?;
            let frame = &mut stack[top];
            frame.out.push(descriptor.name.clone(), value);
            frame.field += 1;
        }
    }
}

fn decode_scalar(reader: &mut ByteReader, kind: FieldType) -> Result<Value, Error> {
    match kind {
        FieldType::I8 => Ok(Value::Int(i64::from(reader.u8()? as i8))),
        FieldType::U8 => Ok(Value::Uint(u64::from(reader.u8()?))),
        FieldType::I16 => Ok(Value::Int(i64::from(reader.u16()? as i16))),
        FieldType::U16 => Ok(Value::Uint(u64::from(reader.u16()?))),
        FieldType::I32 => Ok(Value::Int(i64::from(reader.u32()? as i32))),
        FieldType::U32 => Ok(Value::Uint(u64::from(reader.u32()?))),
        FieldType::I64 => Ok(Value::Int(reader.u64()? as i64)),
        FieldType::U64 => Ok(Value::Uint(reader.u64()?)),
        FieldType::StringId => Ok(Value::Uint(u64::from(reader.u16()?))),
        FieldType::String => Ok(Value::String(reader.string()?)),
        // Struct fields descend through the frame stack in decode_record
        FieldType::Struct => unreachable!("struct fields have no scalar form"),
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Int(x) => serializer.serialize_i64(*x),
            Value::Uint(x) => serializer.serialize_u64(*x),
            Value::String(x) => serializer.serialize_str(x),
            Value::List(x) => serializer.collect_seq(x.iter()),
            Value::Struct(x) => x.serialize(serializer),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.fields.iter().map(|(key, value)| (key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChunkTag;

    fn field(type_byte: u8, name: &str) -> Vec<u8> {
        let mut out = vec![type_byte, name.len() as u8];
        out.extend_from_slice(name.as_bytes());
        out
    }

    fn registry_from(data: &[u8]) -> TableRegistry {
        let mut reader = ByteReader::new(data);
        let (registry, _) = TableRegistry::from_reader(&mut reader, ChunkTag::new(*b"TEST")).unwrap();
        registry
    }

    fn decode(data: &[u8], registry: &TableRegistry) -> (Record, usize) {
        let mut reader = ByteReader::new(data);
        let record = decode_record(&mut reader, registry, TableRegistry::ROOT).unwrap();
        (record, reader.position())
    }

    #[test]
    fn test_scalar_fields_in_order() {
        let mut schema = field(0x01, "delta");
        schema.extend(field(0x04, "hp"));
        schema.extend(field(0x0A, "name"));
        schema.push(0);
        let registry = registry_from(&schema);

        let mut data = vec![0xFF]; // delta: i8 -1
        data.extend_from_slice(&[0x01, 0x00]); // hp: u16 256
        data.push(3);
        data.extend_from_slice(b"abc");

        let (record, consumed) = decode(&data, &registry);
        assert_eq!(consumed, data.len());
        assert_eq!(record.len(), 3);

        let fields: Vec<_> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(fields, vec!["delta", "hp", "name"]);
        assert_eq!(record.get("delta"), Some(&Value::Int(-1)));
        assert_eq!(record.get("hp"), Some(&Value::Uint(256)));
        assert_eq!(record.get("name"), Some(&Value::String("abc".to_string())));
    }

    #[test]
    fn test_list_field_length_law() {
        let mut schema = field(0x14, "levels"); // u16 list
        schema.push(0);
        let registry = registry_from(&schema);

        let data = [0x03, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03];
        let (record, consumed) = decode(&data, &registry);
        assert_eq!(consumed, data.len());
        assert_eq!(
            record.get("levels"),
            Some(&Value::List(vec![
                Value::Uint(1),
                Value::Uint(2),
                Value::Uint(3)
            ]))
        );
    }

    #[test]
    fn test_empty_list() {
        let mut schema = field(0x16, "xs"); // u32 list
        schema.push(0);
        let registry = registry_from(&schema);

        let (record, consumed) = decode(&[0x00], &registry);
        assert_eq!(consumed, 1);
        assert_eq!(record.get("xs"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn test_nested_struct() {
        let mut schema = field(0x02, "age");
        schema.extend(field(0x0B, "stats"));
        schema.push(0);
        schema.extend(field(0x04, "hp")); // stats
        schema.push(0);
        let registry = registry_from(&schema);

        let data = [0x2A, 0x01, 0x00];
        let (record, consumed) = decode(&data, &registry);
        assert_eq!(consumed, data.len());

        let Some(Value::Struct(stats)) = record.get("stats") else {
            panic!("expected struct value");
        };
        assert_eq!(stats.get("hp"), Some(&Value::Uint(256)));
    }

    #[test]
    fn test_struct_list() {
        let mut schema = field(0x1B, "orders"); // struct list
        schema.push(0);
        schema.extend(field(0x02, "kind")); // orders
        schema.push(0);
        let registry = registry_from(&schema);

        let data = [0x02, 0x07, 0x09];
        let (record, consumed) = decode(&data, &registry);
        assert_eq!(consumed, data.len());

        let Some(Value::List(orders)) = record.get("orders") else {
            panic!("expected list value");
        };
        assert_eq!(orders.len(), 2);
        let Value::Struct(first) = &orders[0] else {
            panic!("expected struct element");
        };
        assert_eq!(first.get("kind"), Some(&Value::Uint(7)));
        let Value::Struct(second) = &orders[1] else {
            panic!("expected struct element");
        };
        assert_eq!(second.get("kind"), Some(&Value::Uint(9)));
    }

    #[test]
    fn test_string_with_list_bit_stays_string() {
        // The list modifier on a string field is a no-op: a string already
        // carries its own length.
        let mut schema = field(0x1A, "name");
        schema.push(0);
        let registry = registry_from(&schema);

        let mut data = vec![0x02];
        data.extend_from_slice(b"ok");
        let (record, consumed) = decode(&data, &registry);
        assert_eq!(consumed, data.len());
        assert_eq!(record.get("name"), Some(&Value::String("ok".to_string())));
    }

    #[test]
    fn test_truncated_record() {
        let mut schema = field(0x06, "id"); // u32
        schema.push(0);
        let registry = registry_from(&schema);

        let mut reader = ByteReader::new(&[0x01, 0x02]);
        let err = decode_record(&mut reader, &registry, TableRegistry::ROOT).unwrap_err();
        assert!(matches!(err.kind(), crate::ErrorKind::Eof { .. }));
    }
}
