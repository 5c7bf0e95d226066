//! Codec synthesis: turns each entity's layout into abstract operation lists.
//!
//! For every method the synthesizer produces a read program and a write
//! program folded from the same [`Layout`], so both sides agree bit for bit.
//! For every class with properties it produces the ordered flag slots used by
//! decode, encode, dump and reverse parse alike. The runtime [`Codec`] and the
//! source emitter both consume this description.
//!
//! [`Codec`]: crate::codec::Codec

use crate::layout::{plan_method, plan_properties, Layout, LayoutStep};
use crate::schema::{Class, Constant, Field, Method, ResolvedSchema, SchemaError, Version};
use heck::ToUpperCamelCase;
use std::collections::HashMap;
use tracing::debug;

/// Where a decoded value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Position among the entity's accessible fields.
    Arg(usize),
    /// Reserved field: read and dropped.
    Discard,
}

/// Where an encoded value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Arg(usize),
    /// Reserved field: the type's fixed placeholder.
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOp {
    /// Read the next octet of a boolean run into the bit buffer.
    LoadBits,
    Bit { target: Target, mask: u8 },
    Scalar { ty: String, target: Target },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSource {
    pub source: Source,
    pub mask: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// One `write_octet` of the OR of every set bit.
    Bits(Vec<BitSource>),
    Scalar { ty: String, source: Source },
}

/// An accessible field as seen by calling code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodSpec {
    pub class_index: u16,
    pub index: u16,
    pub class_name: String,
    pub name: String,
    /// Constructor name, e.g. `BasicPublish`.
    pub constructor: String,
    pub content: bool,
    pub synchronous: bool,
    pub deprecated: bool,
    pub responses: Vec<String>,
    /// Every declared field, reserved ones included.
    pub fields: Vec<Field>,
    pub args: Vec<Arg>,
    pub layout: Layout,
    pub read: Vec<ReadOp>,
    pub write: Vec<WriteOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Boolean stored directly in its flag bit.
    Flag,
    /// Flag bit signals that a payload follows.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySlot {
    pub name: String,
    pub ty: String,
    pub mask: u16,
    pub kind: SlotKind,
    /// `None` for reserved fields.
    pub arg: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesSpec {
    pub class_index: u16,
    pub class_name: String,
    /// Constructor name, e.g. `BasicProperties`.
    pub constructor: String,
    pub args: Vec<Arg>,
    pub layout: Layout,
    pub slots: Vec<PropertySlot>,
}

/// Whole-schema synthesis result with dispatch tables.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub version: Version,
    pub port: u16,
    pub constants: Vec<Constant>,
    /// `(class name, class index)` for every class, in declared order.
    pub class_ids: Vec<(String, u16)>,
    methods: Vec<MethodSpec>,
    properties: Vec<PropertiesSpec>,
    methods_by_index: HashMap<(u16, u16), usize>,
    methods_by_name: HashMap<(String, String), usize>,
    properties_by_index: HashMap<u16, usize>,
}

impl CompiledSchema {
    pub fn methods(&self) -> &[MethodSpec] {
        &self.methods
    }

    pub fn properties(&self) -> &[PropertiesSpec] {
        &self.properties
    }

    pub fn get_method(&self, class_index: u16, method_index: u16) -> Option<&MethodSpec> {
        self.methods_by_index
            .get(&(class_index, method_index))
            .map(|&i| &self.methods[i])
    }

    pub fn get_method_by_name(&self, class_name: &str, method_name: &str) -> Option<&MethodSpec> {
        self.methods_by_name
            .get(&(class_name.to_string(), method_name.to_string()))
            .map(|&i| &self.methods[i])
    }

    pub fn get_properties(&self, class_index: u16) -> Option<&PropertiesSpec> {
        self.properties_by_index
            .get(&class_index)
            .map(|&i| &self.properties[i])
    }
}

/// Compile a resolved schema into per-entity operation descriptions.
pub fn compile(schema: &ResolvedSchema) -> Result<CompiledSchema, SchemaError> {
    let mut methods = Vec::new();
    let mut properties = Vec::new();
    for class in schema.classes() {
        for m in &class.methods {
            methods.push(synthesize_method(m));
        }
        if !class.fields.is_empty() {
            properties.push(synthesize_properties(class)?);
        }
    }

    let methods_by_index = methods
        .iter()
        .enumerate()
        .map(|(i, m)| ((m.class_index, m.index), i))
        .collect();
    let methods_by_name = methods
        .iter()
        .enumerate()
        .map(|(i, m)| ((m.class_name.clone(), m.name.clone()), i))
        .collect();
    let properties_by_index = properties
        .iter()
        .enumerate()
        .map(|(i, p)| (p.class_index, i))
        .collect();
    debug!(
        methods = methods.len(),
        property_classes = properties.len(),
        "compiled schema"
    );
    Ok(CompiledSchema {
        version: schema.version,
        port: schema.port,
        constants: schema.constants.clone(),
        class_ids: schema.classes().iter().map(|c| (c.name.clone(), c.index)).collect(),
        methods,
        properties,
        methods_by_index,
        methods_by_name,
        properties_by_index,
    })
}

/// Constructor name for a dashed schema name (`basic-publish` -> `BasicPublish`).
pub fn constructor_name(full_name: &str) -> String {
    full_name.to_upper_camel_case()
}

/// Map each field to its accessible-argument position (None when reserved).
fn arg_positions(fields: &[Field]) -> Vec<Option<usize>> {
    let mut next = 0;
    fields
        .iter()
        .map(|f| {
            if f.reserved {
                None
            } else {
                next += 1;
                Some(next - 1)
            }
        })
        .collect()
}

fn args_of<'a>(fields: impl Iterator<Item = &'a Field>) -> Vec<Arg> {
    fields
        .map(|f| Arg { name: f.name.clone(), ty: f.ty.clone() })
        .collect()
}

fn synthesize_method(m: &Method) -> MethodSpec {
    let layout = plan_method(&m.fields);
    let positions = arg_positions(&m.fields);
    let target = |i: usize| positions[i].map(Target::Arg).unwrap_or(Target::Discard);
    let source = |i: usize| positions[i].map(Source::Arg).unwrap_or(Source::Reserved);

    let mut read = Vec::with_capacity(layout.steps.len());
    let mut write = Vec::with_capacity(layout.steps.len());
    let mut pending: Vec<BitSource> = Vec::new();
    let mut loaded_word = None;
    for step in &layout.steps {
        match *step {
            LayoutStep::Bit { field, word, bit } => {
                if loaded_word != Some(word) {
                    read.push(ReadOp::LoadBits);
                    loaded_word = Some(word);
                }
                let mask = 1u8 << bit;
                read.push(ReadOp::Bit { target: target(field), mask });
                pending.push(BitSource { source: source(field), mask });
            }
            LayoutStep::Flush => {
                write.push(WriteOp::Bits(std::mem::take(&mut pending)));
            }
            LayoutStep::Scalar { field, .. } => {
                let ty = m.fields[field].ty.clone();
                read.push(ReadOp::Scalar { ty: ty.clone(), target: target(field) });
                write.push(WriteOp::Scalar { ty, source: source(field) });
            }
        }
    }

    let spec = MethodSpec {
        class_index: m.class_index,
        index: m.index,
        class_name: m.class_name.clone(),
        name: m.name.clone(),
        constructor: constructor_name(&m.full_name()),
        content: m.content,
        synchronous: m.synchronous,
        deprecated: m.deprecated,
        responses: m.responses.clone(),
        fields: m.fields.clone(),
        args: args_of(m.accessible_fields()),
        layout,
        read,
        write,
    };
    debug!(
        method = %spec.constructor,
        class_index = spec.class_index,
        method_index = spec.index,
        octets = spec.layout.words,
        "synthesized method codec"
    );
    spec
}

fn synthesize_properties(class: &Class) -> Result<PropertiesSpec, SchemaError> {
    let layout = plan_properties(class)?;
    let positions = arg_positions(&class.fields);
    let slots = layout
        .steps
        .iter()
        .filter_map(|step| {
            let (field, bit, kind) = match *step {
                LayoutStep::Bit { field, bit, .. } => (field, bit, SlotKind::Flag),
                LayoutStep::Scalar { field, presence: Some(bit) } => (field, bit, SlotKind::Optional),
                _ => return None,
            };
            let f = &class.fields[field];
            Some(PropertySlot {
                name: f.name.clone(),
                ty: f.ty.clone(),
                mask: 1u16 << bit,
                kind,
                arg: positions[field],
            })
        })
        .collect();
    Ok(PropertiesSpec {
        class_index: class.index,
        class_name: class.name.clone(),
        constructor: constructor_name(&class.full_name()),
        args: args_of(class.accessible_fields()),
        layout,
        slots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ClassDecl, FieldDecl, MethodDecl, Schema};

    fn compiled(class: ClassDecl) -> CompiledSchema {
        let schema = Schema::new(Version { major: 0, minor: 9, revision: 1 }, 5672).class(class);
        compile(&ResolvedSchema::resolve(&schema).expect("resolve")).expect("compile")
    }

    #[test]
    fn read_and_write_programs_mirror_each_other() {
        let c = compiled(
            ClassDecl::new(50, "queue").method(
                MethodDecl::new(10, "declare")
                    .field(FieldDecl::reserved("reserved-1", "short"))
                    .field(FieldDecl::new("queue", "shortstr"))
                    .field(FieldDecl::new("passive", "bit"))
                    .field(FieldDecl::new("durable", "bit"))
                    .field(FieldDecl::new("arguments", "table")),
            ),
        );
        let m = c.get_method(50, 10).expect("method");
        assert_eq!(m.constructor, "QueueDeclare");
        assert_eq!(
            m.read,
            vec![
                ReadOp::Scalar { ty: "short".into(), target: Target::Discard },
                ReadOp::Scalar { ty: "shortstr".into(), target: Target::Arg(0) },
                ReadOp::LoadBits,
                ReadOp::Bit { target: Target::Arg(1), mask: 1 },
                ReadOp::Bit { target: Target::Arg(2), mask: 2 },
                ReadOp::Scalar { ty: "table".into(), target: Target::Arg(3) },
            ]
        );
        assert_eq!(
            m.write,
            vec![
                WriteOp::Scalar { ty: "short".into(), source: Source::Reserved },
                WriteOp::Scalar { ty: "shortstr".into(), source: Source::Arg(0) },
                WriteOp::Bits(vec![
                    BitSource { source: Source::Arg(1), mask: 1 },
                    BitSource { source: Source::Arg(2), mask: 2 },
                ]),
                WriteOp::Scalar { ty: "table".into(), source: Source::Arg(3) },
            ]
        );
    }

    #[test]
    fn property_slots_follow_declared_order() {
        let c = compiled(
            ClassDecl::new(60, "basic")
                .field(FieldDecl::new("content-type", "shortstr"))
                .field(FieldDecl::reserved("cluster-id", "shortstr"))
                .field(FieldDecl::new("persistent", "bit")),
        );
        let p = c.get_properties(60).expect("properties");
        assert_eq!(p.constructor, "BasicProperties");
        let masks: Vec<_> = p.slots.iter().map(|s| (s.mask, s.kind, s.arg)).collect();
        assert_eq!(
            masks,
            vec![
                (0x8000, SlotKind::Optional, Some(0)),
                (0x4000, SlotKind::Optional, None),
                (0x2000, SlotKind::Flag, Some(1)),
            ]
        );
    }

    #[test]
    fn classes_without_fields_have_no_properties() {
        let c = compiled(ClassDecl::new(90, "tx").method(MethodDecl::new(10, "select")));
        assert!(c.get_properties(90).is_none());
        assert!(c.get_method_by_name("tx", "select").is_some());
    }

    #[test]
    fn identical_shapes_keep_distinct_constructors() {
        let c = compiled(
            ClassDecl::new(90, "tx")
                .method(MethodDecl::new(10, "select"))
                .method(MethodDecl::new(11, "select-ok")),
        );
        let names: Vec<_> = c.methods().iter().map(|m| m.constructor.as_str()).collect();
        assert_eq!(names, vec!["TxSelect", "TxSelectOk"]);
    }
}
