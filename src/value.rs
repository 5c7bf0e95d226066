//! Runtime values for encoding/decoding (codec representation).

/// A single scalar of one of the wire base types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Octet(u8),
    Short(u16),
    Long(u32),
    LongLong(u64),
    Bit(bool),
    ShortStr(Vec<u8>),
    LongStr(Vec<u8>),
    Timestamp(u64),
    Table(FieldTable),
}

impl Value {
    pub fn shortstr(s: impl AsRef<[u8]>) -> Self {
        Value::ShortStr(s.as_ref().to_vec())
    }

    pub fn longstr(s: impl AsRef<[u8]>) -> Self {
        Value::LongStr(s.as_ref().to_vec())
    }

    /// Name of the wire type this value belongs to.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Octet(_) => "octet",
            Value::Short(_) => "short",
            Value::Long(_) => "long",
            Value::LongLong(_) => "longlong",
            Value::Bit(_) => "bit",
            Value::ShortStr(_) => "shortstr",
            Value::LongStr(_) => "longstr",
            Value::Timestamp(_) => "timestamp",
            Value::Table(_) => "table",
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Octet(x) => Some(*x as u64),
            Value::Short(x) => Some(*x as u64),
            Value::Long(x) => Some(*x as u64),
            Value::LongLong(x) | Value::Timestamp(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bit(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ShortStr(b) | Value::LongStr(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&FieldTable> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Typed value inside a field table or field array.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// Scale (decimal places) and unscaled value.
    Decimal(u8, u32),
    LongStr(Vec<u8>),
    Array(Vec<FieldValue>),
    Timestamp(u64),
    Table(FieldTable),
    Bytes(Vec<u8>),
    Void,
}

impl FieldValue {
    /// One-byte type tag used on the wire and in text dumps.
    pub fn tag(&self) -> u8 {
        match self {
            FieldValue::Bool(_) => b't',
            FieldValue::I8(_) => b'b',
            FieldValue::U8(_) => b'B',
            FieldValue::I16(_) => b's',
            FieldValue::U16(_) => b'u',
            FieldValue::I32(_) => b'I',
            FieldValue::U32(_) => b'i',
            FieldValue::I64(_) => b'l',
            FieldValue::F32(_) => b'f',
            FieldValue::F64(_) => b'd',
            FieldValue::Decimal(..) => b'D',
            FieldValue::LongStr(_) => b'S',
            FieldValue::Array(_) => b'A',
            FieldValue::Timestamp(_) => b'T',
            FieldValue::Table(_) => b'F',
            FieldValue::Bytes(_) => b'x',
            FieldValue::Void => b'V',
        }
    }
}

/// Ordered name/value pairs. Order is kept so tables round-trip exactly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldTable {
    pub entries: Vec<(Vec<u8>, FieldValue)>,
}

impl FieldTable {
    pub fn new() -> Self {
        FieldTable::default()
    }

    pub fn insert(&mut self, name: impl AsRef<[u8]>, value: FieldValue) {
        let name = name.as_ref();
        match self.entries.iter_mut().find(|(k, _)| k.as_slice() == name) {
            Some((_, v)) => *v = value,
            None => self.entries.push((name.to_vec(), value)),
        }
    }

    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&FieldValue> {
        let name = name.as_ref();
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A decoded or to-be-encoded method: dispatch key plus accessible arguments
/// in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub class_index: u16,
    pub method_index: u16,
    pub args: Vec<Value>,
}

impl Method {
    pub fn new(class_index: u16, method_index: u16, args: Vec<Value>) -> Self {
        Method { class_index, method_index, args }
    }

    pub fn index(&self) -> (u16, u16) {
        (self.class_index, self.method_index)
    }
}

/// Content properties of one class: one optional slot per accessible field,
/// in declared order. Bit-typed properties are `Some(Value::Bit(true))` when
/// set and `None` when clear; that is the only form decode and reverse parse
/// produce, and encoding rejects `Some(Value::Bit(false))`.
#[derive(Debug, Clone, PartialEq)]
pub struct Properties {
    pub class_index: u16,
    pub fields: Vec<Option<Value>>,
}

impl Properties {
    pub fn new(class_index: u16, fields: Vec<Option<Value>>) -> Self {
        Properties { class_index, fields }
    }

    /// All properties absent.
    pub fn empty(class_index: u16, len: usize) -> Self {
        Properties { class_index, fields: vec![None; len] }
    }
}
