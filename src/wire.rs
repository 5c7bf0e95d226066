//! Scalar codecs, one family per resolved base type.
//!
//! Each [`WireType`] provides the four primitives the synthesized codecs are
//! sequenced from: `read`, `write`, `to_sexp` and `from_sexp`, plus the fixed
//! placeholder written for reserved fields. All integers are big-endian.

use crate::codec::CodecError;
use crate::sexp::Sexp;
use crate::value::{FieldTable, FieldValue, Value};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use std::str::FromStr;

/// Deepest nesting of tables and arrays accepted from the wire or from text.
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Octet,
    Short,
    Long,
    LongLong,
    Bit,
    ShortStr,
    LongStr,
    Timestamp,
    Table,
}

impl WireType {
    pub const ALL: [WireType; 9] = [
        WireType::Octet,
        WireType::Short,
        WireType::Long,
        WireType::LongLong,
        WireType::Bit,
        WireType::ShortStr,
        WireType::LongStr,
        WireType::Timestamp,
        WireType::Table,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        WireType::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            WireType::Octet => "octet",
            WireType::Short => "short",
            WireType::Long => "long",
            WireType::LongLong => "longlong",
            WireType::Bit => "bit",
            WireType::ShortStr => "shortstr",
            WireType::LongStr => "longstr",
            WireType::Timestamp => "timestamp",
            WireType::Table => "table",
        }
    }

    /// Value written in place of a reserved field.
    pub fn reserved_value(self) -> Value {
        match self {
            WireType::Octet => Value::Octet(0),
            WireType::Short => Value::Short(0),
            WireType::Long => Value::Long(0),
            WireType::LongLong => Value::LongLong(0),
            WireType::Bit => Value::Bit(false),
            WireType::ShortStr => Value::ShortStr(Vec::new()),
            WireType::LongStr => Value::LongStr(Vec::new()),
            WireType::Timestamp => Value::Timestamp(0),
            WireType::Table => Value::Table(FieldTable::new()),
        }
    }

    pub fn read<R: Read>(self, r: &mut R) -> Result<Value, CodecError> {
        Ok(match self {
            WireType::Octet => Value::Octet(r.read_u8()?),
            WireType::Short => Value::Short(r.read_u16::<BigEndian>()?),
            WireType::Long => Value::Long(r.read_u32::<BigEndian>()?),
            WireType::LongLong => Value::LongLong(r.read_u64::<BigEndian>()?),
            WireType::Bit => Value::Bit(r.read_u8()? != 0),
            WireType::ShortStr => {
                let len = r.read_u8()? as u64;
                Value::ShortStr(read_exact_len(r, len)?)
            }
            WireType::LongStr => {
                let len = r.read_u32::<BigEndian>()? as u64;
                Value::LongStr(read_exact_len(r, len)?)
            }
            WireType::Timestamp => Value::Timestamp(r.read_u64::<BigEndian>()?),
            WireType::Table => Value::Table(read_table(r, 0)?),
        })
    }

    pub fn write<W: Write>(self, w: &mut W, v: &Value) -> Result<(), CodecError> {
        match (self, v) {
            (WireType::Octet, Value::Octet(x)) => w.write_u8(*x)?,
            (WireType::Short, Value::Short(x)) => w.write_u16::<BigEndian>(*x)?,
            (WireType::Long, Value::Long(x)) => w.write_u32::<BigEndian>(*x)?,
            (WireType::LongLong, Value::LongLong(x)) => w.write_u64::<BigEndian>(*x)?,
            (WireType::Bit, Value::Bit(b)) => w.write_u8(u8::from(*b))?,
            (WireType::ShortStr, Value::ShortStr(s)) => write_shortstr(w, s)?,
            (WireType::LongStr, Value::LongStr(s)) => write_longstr(w, s)?,
            (WireType::Timestamp, Value::Timestamp(x)) => w.write_u64::<BigEndian>(*x)?,
            (WireType::Table, Value::Table(t)) => write_table(w, t)?,
            _ => return Err(self.mismatch(v)),
        }
        Ok(())
    }

    /// Textual projection of one value of this type.
    pub fn to_sexp(self, v: &Value) -> Result<Sexp, CodecError> {
        Ok(match (self, v) {
            (WireType::Octet, Value::Octet(x)) => Sexp::str(x.to_string()),
            (WireType::Short, Value::Short(x)) => Sexp::str(x.to_string()),
            (WireType::Long, Value::Long(x)) => Sexp::str(x.to_string()),
            (WireType::LongLong, Value::LongLong(x)) => Sexp::str(x.to_string()),
            (WireType::Timestamp, Value::Timestamp(x)) => Sexp::str(x.to_string()),
            (WireType::Bit, Value::Bit(b)) => Sexp::str(if *b { "true" } else { "false" }),
            (WireType::ShortStr, Value::ShortStr(s)) | (WireType::LongStr, Value::LongStr(s)) => Sexp::Str(s.clone()),
            (WireType::Table, Value::Table(t)) => table_to_sexp(t),
            _ => return Err(CodecError::Internal(self.mismatch(v).to_string())),
        })
    }

    /// Inverse of [`WireType::to_sexp`].
    pub fn from_sexp(self, s: &Sexp) -> Result<Value, CodecError> {
        Ok(match self {
            WireType::Octet => Value::Octet(number(s, "octet")?),
            WireType::Short => Value::Short(number(s, "short")?),
            WireType::Long => Value::Long(number(s, "long")?),
            WireType::LongLong => Value::LongLong(number(s, "longlong")?),
            WireType::Timestamp => Value::Timestamp(number(s, "timestamp")?),
            WireType::Bit => Value::Bit(number(s, "bit")?),
            WireType::ShortStr => Value::ShortStr(bytes(s, "shortstr")?.to_vec()),
            WireType::LongStr => Value::LongStr(bytes(s, "longstr")?.to_vec()),
            WireType::Table => Value::Table(table_of_sexp(s, 0)?),
        })
    }

    fn mismatch(self, v: &Value) -> CodecError {
        CodecError::Validation(format!("expected {}, found {}", self.name(), v.type_name()))
    }
}

fn read_exact_len<R: Read + ?Sized>(r: &mut R, len: u64) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    Read::take(r, len).read_to_end(&mut buf)?;
    if buf.len() as u64 != len {
        return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

fn write_shortstr<W: Write>(w: &mut W, s: &[u8]) -> Result<(), CodecError> {
    let len = u8::try_from(s.len())
        .map_err(|_| CodecError::Validation(format!("shortstr of {} bytes exceeds 255", s.len())))?;
    w.write_u8(len)?;
    w.write_all(s)?;
    Ok(())
}

fn write_longstr<W: Write>(w: &mut W, s: &[u8]) -> Result<(), CodecError> {
    let len = u32::try_from(s.len())
        .map_err(|_| CodecError::Validation(format!("longstr of {} bytes exceeds u32", s.len())))?;
    w.write_u32::<BigEndian>(len)?;
    w.write_all(s)?;
    Ok(())
}

fn nested(depth: usize) -> Result<usize, CodecError> {
    if depth >= MAX_NESTING {
        return Err(CodecError::Syntax(format!("field values nested deeper than {}", MAX_NESTING)));
    }
    Ok(depth + 1)
}

/// Nested bodies are read through a `Take` over the outer reader, so they are
/// never copied and a short body surfaces as EOF.
fn read_table(r: &mut dyn Read, depth: usize) -> Result<FieldTable, CodecError> {
    let len = r.read_u32::<BigEndian>()? as u64;
    let mut body = Read::take(r, len);
    let mut table = FieldTable::new();
    while body.limit() > 0 {
        let name_len = body.read_u8()? as u64;
        let name = read_exact_len(&mut body, name_len)?;
        let value = read_field_value(&mut body, depth)?;
        table.entries.push((name, value));
    }
    Ok(table)
}

fn write_table<W: Write>(w: &mut W, t: &FieldTable) -> Result<(), CodecError> {
    let mut body = Vec::new();
    for (name, value) in &t.entries {
        write_shortstr(&mut body, name)?;
        write_field_value(&mut body, value)?;
    }
    write_longstr(w, &body)
}

fn read_field_value(r: &mut dyn Read, depth: usize) -> Result<FieldValue, CodecError> {
    let tag = r.read_u8()?;
    Ok(match tag {
        b't' => FieldValue::Bool(r.read_u8()? != 0),
        b'b' => FieldValue::I8(r.read_i8()?),
        b'B' => FieldValue::U8(r.read_u8()?),
        b's' => FieldValue::I16(r.read_i16::<BigEndian>()?),
        b'u' => FieldValue::U16(r.read_u16::<BigEndian>()?),
        b'I' => FieldValue::I32(r.read_i32::<BigEndian>()?),
        b'i' => FieldValue::U32(r.read_u32::<BigEndian>()?),
        b'l' => FieldValue::I64(r.read_i64::<BigEndian>()?),
        b'f' => FieldValue::F32(r.read_f32::<BigEndian>()?),
        b'd' => FieldValue::F64(r.read_f64::<BigEndian>()?),
        b'D' => {
            let scale = r.read_u8()?;
            FieldValue::Decimal(scale, r.read_u32::<BigEndian>()?)
        }
        b'S' => {
            let len = r.read_u32::<BigEndian>()? as u64;
            FieldValue::LongStr(read_exact_len(r, len)?)
        }
        b'A' => {
            let depth = nested(depth)?;
            let len = r.read_u32::<BigEndian>()? as u64;
            let mut body = Read::take(r, len);
            let mut items = Vec::new();
            while body.limit() > 0 {
                items.push(read_field_value(&mut body, depth)?);
            }
            FieldValue::Array(items)
        }
        b'T' => FieldValue::Timestamp(r.read_u64::<BigEndian>()?),
        b'F' => FieldValue::Table(read_table(r, nested(depth)?)?),
        b'x' => {
            let len = r.read_u32::<BigEndian>()? as u64;
            FieldValue::Bytes(read_exact_len(r, len)?)
        }
        b'V' => FieldValue::Void,
        other => return Err(CodecError::Syntax(format!("unknown field value tag 0x{:02x}", other))),
    })
}

fn write_field_value<W: Write>(w: &mut W, v: &FieldValue) -> Result<(), CodecError> {
    w.write_u8(v.tag())?;
    match v {
        FieldValue::Bool(b) => w.write_u8(u8::from(*b))?,
        FieldValue::I8(x) => w.write_i8(*x)?,
        FieldValue::U8(x) => w.write_u8(*x)?,
        FieldValue::I16(x) => w.write_i16::<BigEndian>(*x)?,
        FieldValue::U16(x) => w.write_u16::<BigEndian>(*x)?,
        FieldValue::I32(x) => w.write_i32::<BigEndian>(*x)?,
        FieldValue::U32(x) => w.write_u32::<BigEndian>(*x)?,
        FieldValue::I64(x) => w.write_i64::<BigEndian>(*x)?,
        FieldValue::F32(x) => w.write_f32::<BigEndian>(*x)?,
        FieldValue::F64(x) => w.write_f64::<BigEndian>(*x)?,
        FieldValue::Decimal(scale, x) => {
            w.write_u8(*scale)?;
            w.write_u32::<BigEndian>(*x)?;
        }
        FieldValue::LongStr(s) | FieldValue::Bytes(s) => write_longstr(w, s)?,
        FieldValue::Array(items) => {
            let mut body = Vec::new();
            for item in items {
                write_field_value(&mut body, item)?;
            }
            write_longstr(w, &body)?;
        }
        FieldValue::Timestamp(x) => w.write_u64::<BigEndian>(*x)?,
        FieldValue::Table(t) => write_table(w, t)?,
        FieldValue::Void => {}
    }
    Ok(())
}

fn table_to_sexp(t: &FieldTable) -> Sexp {
    Sexp::Arr(
        t.entries
            .iter()
            .map(|(name, v)| Sexp::Arr(vec![Sexp::Str(name.clone()), field_value_to_sexp(v)]))
            .collect(),
    )
}

fn field_value_to_sexp(v: &FieldValue) -> Sexp {
    let tag = Sexp::Str(vec![v.tag()]);
    let payload = match v {
        FieldValue::Bool(b) => vec![Sexp::str(if *b { "true" } else { "false" })],
        FieldValue::I8(x) => vec![Sexp::str(x.to_string())],
        FieldValue::U8(x) => vec![Sexp::str(x.to_string())],
        FieldValue::I16(x) => vec![Sexp::str(x.to_string())],
        FieldValue::U16(x) => vec![Sexp::str(x.to_string())],
        FieldValue::I32(x) => vec![Sexp::str(x.to_string())],
        FieldValue::U32(x) => vec![Sexp::str(x.to_string())],
        FieldValue::I64(x) => vec![Sexp::str(x.to_string())],
        FieldValue::F32(x) => vec![Sexp::str(x.to_string())],
        FieldValue::F64(x) => vec![Sexp::str(x.to_string())],
        FieldValue::Decimal(scale, x) => vec![Sexp::str(scale.to_string()), Sexp::str(x.to_string())],
        FieldValue::LongStr(s) | FieldValue::Bytes(s) => vec![Sexp::Str(s.clone())],
        FieldValue::Array(items) => items.iter().map(field_value_to_sexp).collect(),
        FieldValue::Timestamp(x) => vec![Sexp::str(x.to_string())],
        FieldValue::Table(t) => vec![table_to_sexp(t)],
        FieldValue::Void => Vec::new(),
    };
    let mut items = Vec::with_capacity(payload.len() + 1);
    items.push(tag);
    items.extend(payload);
    Sexp::Arr(items)
}

fn table_of_sexp(s: &Sexp, depth: usize) -> Result<FieldTable, CodecError> {
    let entries = s
        .as_list()
        .ok_or_else(|| CodecError::Internal(format!("table: expected a list, found {}", s)))?;
    let mut table = FieldTable::new();
    for entry in entries {
        match entry.as_list() {
            Some([name, value]) => {
                let name = bytes(name, "table key")?;
                table.entries.push((name.to_vec(), field_value_of_sexp(value, depth)?));
            }
            _ => return Err(CodecError::Internal(format!("table entry: expected (name value), found {}", entry))),
        }
    }
    Ok(table)
}

fn field_value_of_sexp(s: &Sexp, depth: usize) -> Result<FieldValue, CodecError> {
    let bad = || CodecError::Internal(format!("field value: malformed {}", s));
    let items = s.as_list().ok_or_else(bad)?;
    let (tag, rest) = items.split_first().ok_or_else(bad)?;
    let tag = match bytes(tag, "field value tag")? {
        [t] => *t,
        _ => return Err(bad()),
    };
    let one = || match rest {
        [x] => Ok(x),
        _ => Err(bad()),
    };
    Ok(match tag {
        b't' => FieldValue::Bool(number(one()?, "bool")?),
        b'b' => FieldValue::I8(number(one()?, "i8")?),
        b'B' => FieldValue::U8(number(one()?, "u8")?),
        b's' => FieldValue::I16(number(one()?, "i16")?),
        b'u' => FieldValue::U16(number(one()?, "u16")?),
        b'I' => FieldValue::I32(number(one()?, "i32")?),
        b'i' => FieldValue::U32(number(one()?, "u32")?),
        b'l' => FieldValue::I64(number(one()?, "i64")?),
        b'f' => FieldValue::F32(number(one()?, "f32")?),
        b'd' => FieldValue::F64(number(one()?, "f64")?),
        b'D' => match rest {
            [scale, x] => FieldValue::Decimal(number(scale, "decimal scale")?, number(x, "decimal")?),
            _ => return Err(bad()),
        },
        b'S' => FieldValue::LongStr(bytes(one()?, "longstr")?.to_vec()),
        b'x' => FieldValue::Bytes(bytes(one()?, "bytes")?.to_vec()),
        b'A' => {
            let depth = nested(depth)?;
            FieldValue::Array(
                rest.iter()
                    .map(|item| field_value_of_sexp(item, depth))
                    .collect::<Result<Vec<_>, CodecError>>()?,
            )
        }
        b'T' => FieldValue::Timestamp(number(one()?, "timestamp")?),
        b'F' => FieldValue::Table(table_of_sexp(one()?, nested(depth)?)?),
        b'V' if rest.is_empty() => FieldValue::Void,
        _ => return Err(bad()),
    })
}

fn bytes<'a>(s: &'a Sexp, what: &str) -> Result<&'a [u8], CodecError> {
    s.as_bytes()
        .ok_or_else(|| CodecError::Internal(format!("{}: expected an atom, found {}", what, s)))
}

fn number<T: FromStr>(s: &Sexp, what: &str) -> Result<T, CodecError> {
    s.as_text()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| CodecError::Internal(format!("{}: cannot parse {}", what, s)))
}
