//! Encode/decode method and content-property payloads from a compiled schema.
//!
//! The [`Codec`] interprets the operation lists produced by
//! [`compile`](crate::synth::compile): method read/write programs and
//! property flag slots. Scalars go through [`WireType`].

use crate::schema::{ResolvedSchema, Schema, SchemaError};
use crate::sexp::Sexp;
use crate::synth::{compile, CompiledSchema, MethodSpec, PropertiesSpec, ReadOp, SlotKind, Source, Target, WriteOp};
use crate::value::{Method, Properties, Value};
use crate::wire::WireType;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};
use tracing::debug;

/// AMQP reply code for malformed or unrecognized frames.
pub const FRAME_ERROR: u16 = 501;
/// AMQP reply code for frames with invalid field values.
pub const SYNTAX_ERROR: u16 = 502;
/// AMQP reply code for local faults.
pub const INTERNAL_ERROR: u16 = 541;

/// Property flag bit announcing a further flags word.
const PROPERTY_CONTINUATION: u16 = 0x0001;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Peer sent a method this schema does not define.
    #[error("Unknown method number {class_index}/{method_index}")]
    Frame { class_index: u16, method_index: u16 },
    #[error("Unknown method {0}")]
    UnknownMethod(String),
    /// Local schema/codec mismatch.
    #[error("Internal: {0}")]
    Internal(String),
    #[error("Validation: {0}")]
    Validation(String),
    #[error("Syntax: {0}")]
    Syntax(String),
}

impl CodecError {
    /// True for local defects; everything else is attributable to input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CodecError::Internal(_))
    }

    pub fn reply_code(&self) -> u16 {
        match self {
            CodecError::Io(_) | CodecError::Frame { .. } => FRAME_ERROR,
            CodecError::UnknownMethod(_) | CodecError::Validation(_) | CodecError::Syntax(_) => SYNTAX_ERROR,
            CodecError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct Codec {
    compiled: CompiledSchema,
}

impl Codec {
    /// Bind a compiled schema to the scalar codecs. Every resolved field type
    /// must name a [`WireType`].
    pub fn new(compiled: CompiledSchema) -> Result<Self, SchemaError> {
        for m in compiled.methods() {
            for f in &m.fields {
                check_type(&m.constructor, &f.name, &f.ty)?;
            }
        }
        for p in compiled.properties() {
            for s in &p.slots {
                check_type(&p.constructor, &s.name, &s.ty)?;
            }
        }
        debug!(
            methods = compiled.methods().len(),
            property_classes = compiled.properties().len(),
            "codec ready"
        );
        Ok(Codec { compiled })
    }

    /// Resolve, validate, compile and bind in one step.
    pub fn from_schema(schema: &Schema) -> Result<Self, SchemaError> {
        let resolved = ResolvedSchema::resolve(schema)?;
        Codec::new(compile(&resolved)?)
    }

    pub fn compiled(&self) -> &CompiledSchema {
        &self.compiled
    }

    // ==================== Methods ====================

    /// Decode the arguments of method `class_index/method_index`.
    pub fn decode_method<R: Read>(
        &self,
        class_index: u16,
        method_index: u16,
        input: &mut R,
    ) -> Result<Method, CodecError> {
        let spec = self
            .compiled
            .get_method(class_index, method_index)
            .ok_or(CodecError::Frame { class_index, method_index })?;
        let mut args = Vec::with_capacity(spec.args.len());
        let mut bits = 0u8;
        for op in &spec.read {
            match op {
                ReadOp::LoadBits => bits = input.read_u8()?,
                ReadOp::Bit { target, mask } => keep(&mut args, *target, Value::Bit(bits & mask != 0)),
                ReadOp::Scalar { ty, target } => {
                    let v = wire_type(ty)?.read(input)?;
                    keep(&mut args, *target, v);
                }
            }
        }
        Ok(Method::new(class_index, method_index, args))
    }

    /// Encode a method's arguments (not its index).
    pub fn encode_method<W: Write>(&self, m: &Method, output: &mut W) -> Result<(), CodecError> {
        let spec = self.method_spec(m)?;
        check_arity(&spec.constructor, spec.args.len(), m.args.len())?;
        for op in &spec.write {
            match op {
                WriteOp::Bits(bits) => {
                    let mut octet = 0u8;
                    for b in bits {
                        if bit_source(spec, m, b.source)? {
                            octet |= b.mask;
                        }
                    }
                    output.write_u8(octet)?;
                }
                WriteOp::Scalar { ty, source } => {
                    let t = wire_type(ty)?;
                    match source {
                        Source::Arg(i) => t.write(output, &m.args[*i])?,
                        Source::Reserved => t.write(output, &t.reserved_value())?,
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode a method payload: class index, method index, then arguments.
    pub fn decode_method_payload(&self, bytes: &[u8]) -> Result<Method, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let class_index = cursor.read_u16::<BigEndian>()?;
        let method_index = cursor.read_u16::<BigEndian>()?;
        let m = self.decode_method(class_index, method_index, &mut cursor)?;
        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(CodecError::Syntax(format!(
                "{} trailing bytes after method {}/{}",
                bytes.len() - consumed,
                class_index,
                method_index
            )));
        }
        Ok(m)
    }

    /// Encode a method payload: class index, method index, then arguments.
    pub fn encode_method_payload(&self, m: &Method) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(m.class_index)?;
        out.write_u16::<BigEndian>(m.method_index)?;
        self.encode_method(m, &mut out)?;
        Ok(out)
    }

    /// `(class method (field value) ...)` over accessible fields.
    pub fn method_to_sexp(&self, m: &Method) -> Result<Sexp, CodecError> {
        let spec = self.method_spec(m)?;
        check_arity(&spec.constructor, spec.args.len(), m.args.len())?;
        let mut items = vec![Sexp::str(&spec.class_name), Sexp::str(&spec.name)];
        for (arg, v) in spec.args.iter().zip(&m.args) {
            items.push(Sexp::Arr(vec![Sexp::str(&arg.name), wire_type(&arg.ty)?.to_sexp(v)?]));
        }
        Ok(Sexp::Arr(items))
    }

    /// Inverse of [`Codec::method_to_sexp`]. Fields missing from the text take
    /// their type's placeholder; unknown field names are ignored.
    pub fn method_from_sexp(&self, s: &Sexp) -> Result<Method, CodecError> {
        let items = s
            .as_list()
            .ok_or_else(|| CodecError::Syntax(format!("method: expected a list, found {}", s)))?;
        let (class_name, method_name) = match items {
            [c, m, ..] => match (c.as_text(), m.as_text()) {
                (Some(c), Some(m)) => (c, m),
                _ => return Err(CodecError::Syntax(format!("method: bad header in {}", s))),
            },
            _ => return Err(CodecError::Syntax(format!("method: missing class/method in {}", s))),
        };
        let spec = self
            .compiled
            .get_method_by_name(class_name, method_name)
            .ok_or_else(|| CodecError::UnknownMethod(format!("{}.{}", class_name, method_name)))?;
        let mut values: Vec<Option<Value>> = vec![None; spec.args.len()];
        for (name, v) in named_entries(&items[2..]) {
            if let Some(i) = spec.args.iter().position(|a| a.name.as_bytes() == name) {
                values[i] = Some(wire_type(&spec.args[i].ty)?.from_sexp(v)?);
            }
        }
        let args = values
            .into_iter()
            .zip(&spec.args)
            .map(|(v, a)| match v {
                Some(v) => Ok(v),
                None => Ok(wire_type(&a.ty)?.reserved_value()),
            })
            .collect::<Result<Vec<_>, CodecError>>()?;
        Ok(Method::new(spec.class_index, spec.index, args))
    }

    /// Display name, or `unknown(c/m)` for an index pair the schema lacks.
    pub fn method_name(&self, class_index: u16, method_index: u16) -> String {
        match self.compiled.get_method(class_index, method_index) {
            Some(spec) => spec.constructor.clone(),
            None => format!("unknown({}/{})", class_index, method_index),
        }
    }

    pub fn has_content(&self, m: &Method) -> bool {
        self.compiled
            .get_method(m.class_index, m.method_index)
            .map(|s| s.content)
            .unwrap_or(false)
    }

    /// Only methods the schema marks asynchronous report false.
    pub fn is_synchronous(&self, m: &Method) -> bool {
        self.compiled
            .get_method(m.class_index, m.method_index)
            .map(|s| s.synchronous)
            .unwrap_or(true)
    }

    fn method_spec(&self, m: &Method) -> Result<&MethodSpec, CodecError> {
        self.compiled.get_method(m.class_index, m.method_index).ok_or_else(|| {
            CodecError::Internal(format!("no method {}/{} in schema", m.class_index, m.method_index))
        })
    }

    // ==================== Properties ====================

    /// Decode the flags word and the present property values of a class.
    pub fn decode_properties<R: Read>(&self, class_index: u16, input: &mut R) -> Result<Properties, CodecError> {
        let spec = self.properties_spec(class_index)?;
        let flags = input.read_u16::<BigEndian>()?;
        if flags & PROPERTY_CONTINUATION != 0 {
            return Err(CodecError::Syntax(format!(
                "class {}: property flags continuation word is not supported",
                class_index
            )));
        }
        let mut fields = vec![None; spec.args.len()];
        for slot in &spec.slots {
            let set = flags & slot.mask != 0;
            let value = match slot.kind {
                SlotKind::Flag => set.then_some(Value::Bit(true)),
                SlotKind::Optional if set => Some(wire_type(&slot.ty)?.read(input)?),
                SlotKind::Optional => None,
            };
            if let Some(i) = slot.arg {
                fields[i] = value;
            }
        }
        Ok(Properties::new(class_index, fields))
    }

    /// Encode the flags word, then each present value in declared order.
    /// Reserved properties are always absent. A bit property must be
    /// `Some(Value::Bit(true))` or `None`.
    pub fn encode_properties<W: Write>(&self, p: &Properties, output: &mut W) -> Result<(), CodecError> {
        let spec = self.properties_spec(p.class_index)?;
        check_arity(&spec.constructor, spec.args.len(), p.fields.len())?;
        let mut flags = 0u16;
        for slot in &spec.slots {
            let Some(i) = slot.arg else { continue };
            let set = match (slot.kind, &p.fields[i]) {
                (_, None) => false,
                (SlotKind::Flag, Some(Value::Bit(true))) | (SlotKind::Optional, Some(_)) => true,
                (SlotKind::Flag, Some(v)) => {
                    return Err(CodecError::Validation(format!(
                        "{}: a bit property is Some(true) when set and None when clear, found {:?}",
                        slot.name, v
                    )));
                }
            };
            if set {
                flags |= slot.mask;
            }
        }
        output.write_u16::<BigEndian>(flags)?;
        for slot in &spec.slots {
            if slot.kind != SlotKind::Optional {
                continue;
            }
            if let Some(Some(v)) = slot.arg.map(|i| &p.fields[i]) {
                wire_type(&slot.ty)?.write(output, v)?;
            }
        }
        Ok(())
    }

    /// `((field value) ...)` for present properties, in declared order.
    pub fn properties_to_sexp(&self, p: &Properties) -> Result<Sexp, CodecError> {
        let spec = self.properties_spec(p.class_index)?;
        check_arity(&spec.constructor, spec.args.len(), p.fields.len())?;
        let mut items = Vec::new();
        for (arg, v) in spec.args.iter().zip(&p.fields) {
            if let Some(v) = v {
                items.push(Sexp::Arr(vec![Sexp::str(&arg.name), wire_type(&arg.ty)?.to_sexp(v)?]));
            }
        }
        Ok(Sexp::Arr(items))
    }

    /// Inverse of [`Codec::properties_to_sexp`]. Unknown names are ignored,
    /// missing names are absent, and a non-list yields all-absent properties.
    pub fn properties_from_sexp(&self, class_index: u16, s: &Sexp) -> Result<Properties, CodecError> {
        let spec = self.properties_spec(class_index)?;
        let mut fields = vec![None; spec.args.len()];
        if let Some(items) = s.as_list() {
            for (name, v) in named_entries(items) {
                let Some(i) = spec.args.iter().position(|a| a.name.as_bytes() == name) else {
                    continue;
                };
                let value = wire_type(&spec.args[i].ty)?.from_sexp(v)?;
                fields[i] = match value {
                    Value::Bit(false) => None,
                    other => Some(other),
                };
            }
        }
        Ok(Properties::new(class_index, fields))
    }

    fn properties_spec(&self, class_index: u16) -> Result<&PropertiesSpec, CodecError> {
        self.compiled
            .get_properties(class_index)
            .ok_or_else(|| CodecError::Internal(format!("Bad content class {}", class_index)))
    }
}

fn check_type(owner: &str, field: &str, ty: &str) -> Result<(), SchemaError> {
    match WireType::from_name(ty) {
        Some(_) => Ok(()),
        None => Err(SchemaError::UnsupportedType {
            owner: owner.to_string(),
            field: field.to_string(),
            ty: ty.to_string(),
        }),
    }
}

fn wire_type(ty: &str) -> Result<WireType, CodecError> {
    WireType::from_name(ty).ok_or_else(|| CodecError::Internal(format!("no scalar codec for {}", ty)))
}

fn keep(args: &mut Vec<Value>, target: Target, v: Value) {
    if let Target::Arg(_) = target {
        args.push(v);
    }
}

fn check_arity(owner: &str, expected: usize, found: usize) -> Result<(), CodecError> {
    if expected != found {
        return Err(CodecError::Validation(format!(
            "{} takes {} fields, found {}",
            owner, expected, found
        )));
    }
    Ok(())
}

fn bit_source(spec: &MethodSpec, m: &Method, source: Source) -> Result<bool, CodecError> {
    match source {
        Source::Reserved => Ok(false),
        Source::Arg(i) => m.args[i].as_bool().ok_or_else(|| {
            CodecError::Validation(format!(
                "{}.{}: expected bit, found {}",
                spec.constructor,
                spec.args[i].name,
                m.args[i].type_name()
            ))
        }),
    }
}

/// `(name value)` pairs of a dump; other shapes are skipped.
fn named_entries<'a>(items: &'a [Sexp]) -> impl Iterator<Item = (&'a [u8], &'a Sexp)> + 'a {
    items.iter().filter_map(|item| match item.as_list() {
        Some([name, v]) => name.as_bytes().map(|n| (n, v)),
        _ => None,
    })
}
