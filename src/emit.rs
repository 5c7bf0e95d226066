//! Render compiled schemas as Rust source.
//!
//! The generated module defines closed `Method` and `Properties` enums, one
//! variant per method and per class with properties, plus the dispatch
//! functions over them. Scalars are never encoded inline: the module calls
//! `read_T`, `write_T`, `sexp_of_T`, `T_of_sexp` and `reserved_value_T`
//! from the wire format module named in [`EmitOptions`], along with its
//! type aliases (`Octet`, `Shortstr`, ...), its `Error` type and the
//! `frame_error`, `syntax_error` and `internal_error` constructors.
//!
//! Locals and parameters introduced by the generator end in `__`, which
//! snake-cased schema names never do, so field bindings cannot shadow them.

use crate::envelope::EnvelopeSchema;
use crate::schema::BIT_TYPE;
use crate::synth::{Arg, CompiledSchema, MethodSpec, PropertiesSpec, PropertySlot, ReadOp, SlotKind, Source, Target, WriteOp};
use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Comment placed at the top of the generated file, one `//` line per line.
    pub header: String,
    /// Path of the module providing the scalar codecs.
    pub wireformat_module: String,
    /// Path of the module providing `Sexp`.
    pub sexp_module: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            header: "Generated by amqp_codegen. Do not edit by hand.".to_string(),
            wireformat_module: "crate::wireformat".to_string(),
            sexp_module: "crate::sexp".to_string(),
        }
    }
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static", "struct",
    "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Names that cannot be raw identifiers.
const RESERVED_PATHS: &[&str] = &["self", "super", "crate", "Self"];

/// snake_case identifier for a schema name, escaped when it collides with a keyword.
pub fn ident(name: &str) -> String {
    let snake = name.to_snake_case();
    if RESERVED_PATHS.contains(&snake.as_str()) {
        format!("{}_", snake)
    } else if KEYWORDS.contains(&snake.as_str()) {
        format!("r#{}", snake)
    } else if snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", snake)
    } else {
        snake
    }
}

/// Name of the wire format's alias for a base type (`shortstr` -> `Shortstr`).
pub fn type_ident(ty: &str) -> String {
    ty.to_upper_camel_case()
}

fn const_ident(name: &str) -> String {
    let shouty = name.to_shouty_snake_case();
    if shouty.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", shouty)
    } else {
        shouty
    }
}

/// Suffix of the scalar codec functions for a base type.
fn fn_suffix(ty: &str) -> String {
    ty.to_snake_case()
}

fn header_lines(out: &mut String, header: &str) {
    for line in header.lines() {
        if line.is_empty() {
            out.push_str("//\n");
        } else {
            out.push_str(&format!("// {}\n", line));
        }
    }
    out.push('\n');
}

/// Struct pattern binding every accessible field, or the bare variant.
fn pattern(enum_name: &str, constructor: &str, args: &[Arg]) -> String {
    if args.is_empty() {
        format!("{}::{}", enum_name, constructor)
    } else {
        let names: Vec<_> = args.iter().map(|a| ident(&a.name)).collect();
        format!("{}::{} {{ {} }}", enum_name, constructor, names.join(", "))
    }
}

fn quoted(s: &str) -> String {
    format!("{:?}", s)
}

/// Render the codec module for a compiled schema.
pub fn rust_module(schema: &CompiledSchema, options: &EmitOptions) -> String {
    let mut out = String::new();
    header_lines(&mut out, &options.header);
    out.push_str(&format!("use {}::*;\n", options.wireformat_module));
    out.push_str(&format!("use {}::Sexp;\n", options.sexp_module));
    out.push_str("use std::io::{Read, Write};\n\n");

    let v = schema.version;
    out.push_str(&format!("pub const VERSION: (u8, u8, u8) = ({}, {}, {});\n", v.major, v.minor, v.revision));
    out.push_str(&format!("pub const PORT: u16 = {};\n\n", schema.port));
    for c in &schema.constants {
        out.push_str(&format!("pub const {}: i64 = {};\n", const_ident(&c.name), c.value));
    }
    out.push('\n');
    for (name, index) in &schema.class_ids {
        out.push_str(&format!("pub const {}_CLASS_ID: u16 = {};\n", const_ident(name), index));
    }
    out.push('\n');

    method_enum(&mut out, schema);
    has_content(&mut out, schema);
    is_synchronous(&mut out, schema);
    sexp_of_method(&mut out, schema);
    method_name(&mut out, schema);
    read_method(&mut out, schema);
    method_index(&mut out, schema);
    write_method(&mut out, schema);

    properties_enum(&mut out, schema);
    sexp_of_properties(&mut out, schema);
    read_properties(&mut out, schema);
    class_index(&mut out, schema);
    properties_of_sexp(&mut out, schema);
    write_properties(&mut out, schema);

    debug!(
        methods = schema.methods().len(),
        property_classes = schema.properties().len(),
        bytes = out.len(),
        "emitted codec module"
    );
    out
}

fn method_enum(out: &mut String, schema: &CompiledSchema) {
    out.push_str("#[derive(Debug, Clone, PartialEq)]\npub enum Method {\n");
    for m in schema.methods() {
        out.push_str(&format!("    /// `{}.{}` ({}/{})", m.class_name, m.name, m.class_index, m.index));
        if m.deprecated {
            out.push_str(", deprecated");
        }
        out.push('\n');
        if m.args.is_empty() {
            out.push_str(&format!("    {},\n", m.constructor));
            continue;
        }
        out.push_str(&format!("    {} {{\n", m.constructor));
        for a in &m.args {
            out.push_str(&format!("        {}: {},\n", ident(&a.name), type_ident(&a.ty)));
        }
        out.push_str("    },\n");
    }
    out.push_str("}\n\n");
}

fn method_arm(m: &MethodSpec) -> String {
    format!("Method::{} {{ .. }}", m.constructor)
}

fn has_content(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn has_content(m: &Method) -> bool {\n    match m {\n");
    for m in schema.methods().iter().filter(|m| m.content) {
        out.push_str(&format!("        {} => true,\n", method_arm(m)));
    }
    out.push_str("        _ => false,\n    }\n}\n\n");
}

fn is_synchronous(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn is_synchronous(m: &Method) -> bool {\n    match m {\n");
    for m in schema.methods().iter().filter(|m| !m.synchronous) {
        out.push_str(&format!("        {} => false,\n", method_arm(m)));
    }
    out.push_str("        _ => true,\n    }\n}\n\n");
}

fn field_sexp(name: &str, ty: &str, value: &str) -> String {
    format!(
        "Sexp::Arr(vec![Sexp::str({}), sexp_of_{}({})])",
        quoted(name),
        fn_suffix(ty),
        value
    )
}

fn sexp_of_method(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn sexp_of_method(m: &Method) -> Sexp {\n    match m {\n");
    for m in schema.methods() {
        out.push_str(&format!("        {} => Sexp::Arr(vec![\n", pattern("Method", &m.constructor, &m.args)));
        out.push_str(&format!("            Sexp::str({}),\n", quoted(&m.class_name)));
        out.push_str(&format!("            Sexp::str({}),\n", quoted(&m.name)));
        for a in &m.args {
            out.push_str(&format!("            {},\n", field_sexp(&a.name, &a.ty, &ident(&a.name))));
        }
        out.push_str("        ]),\n");
    }
    out.push_str("    }\n}\n\n");
}

fn method_name(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn method_name(class_index: u16, method_index: u16) -> String {\n");
    out.push_str("    match (class_index, method_index) {\n");
    for m in schema.methods() {
        out.push_str(&format!(
            "        ({}, {}) => {}.to_string(),\n",
            m.class_index,
            m.index,
            quoted(&m.constructor)
        ));
    }
    out.push_str("        _ => format!(\"unknown({}/{})\", class_index, method_index),\n    }\n}\n\n");
}

/// Whether the bit run starting after `ops[start]` binds any accessible field.
fn run_binds(ops: &[ReadOp], start: usize) -> bool {
    ops[start + 1..]
        .iter()
        .take_while(|op| matches!(op, ReadOp::Bit { .. }))
        .any(|op| matches!(op, ReadOp::Bit { target: Target::Arg(_), .. }))
}

fn read_method(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn read_method<R: Read>(class_index: u16, method_index: u16, input__: &mut R) -> Result<Method, Error> {\n");
    out.push_str("    match (class_index, method_index) {\n");
    for m in schema.methods() {
        out.push_str(&format!("        ({}, {}) => {{\n", m.class_index, m.index));
        for (i, op) in m.read.iter().enumerate() {
            match op {
                ReadOp::LoadBits if run_binds(&m.read, i) => {
                    out.push_str("            let bits__ = read_octet(input__)?;\n");
                }
                ReadOp::LoadBits => out.push_str("            read_octet(input__)?;\n"),
                ReadOp::Bit { target: Target::Arg(a), mask } => {
                    out.push_str(&format!("            let {} = bits__ & {} != 0;\n", ident(&m.args[*a].name), mask));
                }
                ReadOp::Bit { target: Target::Discard, .. } => {}
                ReadOp::Scalar { ty, target: Target::Arg(a) } => {
                    out.push_str(&format!(
                        "            let {} = read_{}(input__)?;\n",
                        ident(&m.args[*a].name),
                        fn_suffix(ty)
                    ));
                }
                ReadOp::Scalar { ty, target: Target::Discard } => {
                    out.push_str(&format!("            read_{}(input__)?;\n", fn_suffix(ty)));
                }
            }
        }
        out.push_str(&format!("            Ok({})\n        }}\n", pattern("Method", &m.constructor, &m.args)));
    }
    out.push_str("        _ => Err(frame_error(class_index, method_index)),\n    }\n}\n\n");
}

fn method_index(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn method_index(m: &Method) -> (u16, u16) {\n    match m {\n");
    for m in schema.methods() {
        out.push_str(&format!("        {} => ({}, {}),\n", method_arm(m), m.class_index, m.index));
    }
    out.push_str("    }\n}\n\n");
}

fn write_method(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn write_method<W: Write>(m: &Method, output__: &mut W) -> Result<(), Error> {\n");
    out.push_str("    match m {\n");
    for m in schema.methods() {
        out.push_str(&format!("        {} => {{\n", pattern("Method", &m.constructor, &m.args)));
        for op in &m.write {
            match op {
                WriteOp::Bits(bits) => {
                    let terms: Vec<_> = bits
                        .iter()
                        .filter_map(|b| match b.source {
                            Source::Arg(a) => Some(format!("if *{} {{ {} }} else {{ 0 }}", ident(&m.args[a].name), b.mask)),
                            Source::Reserved => None,
                        })
                        .map(|t| format!("({})", t))
                        .collect();
                    let octet = if terms.is_empty() { "0".to_string() } else { terms.join(" | ") };
                    out.push_str(&format!("            write_octet(output__, &{})?;\n", octet_expr(&octet, terms.len())));
                }
                WriteOp::Scalar { ty, source: Source::Arg(a) } => {
                    out.push_str(&format!(
                        "            write_{}(output__, {})?;\n",
                        fn_suffix(ty),
                        ident(&m.args[*a].name)
                    ));
                }
                WriteOp::Scalar { ty, source: Source::Reserved } => {
                    out.push_str(&format!(
                        "            write_{ty}(output__, &reserved_value_{ty}())?;\n",
                        ty = fn_suffix(ty)
                    ));
                }
            }
        }
        out.push_str("            Ok(())\n        }\n");
    }
    out.push_str("    }\n}\n\n");
}

/// `&` binds to the whole OR expression only when it is parenthesized.
fn octet_expr(octet: &str, terms: usize) -> String {
    if terms > 1 {
        format!("({})", octet)
    } else {
        octet.to_string()
    }
}

fn property_type(slot_kind: SlotKind, ty: &str) -> String {
    match slot_kind {
        SlotKind::Flag => "bool".to_string(),
        SlotKind::Optional => format!("Option<{}>", type_ident(ty)),
    }
}

fn accessible_slots<'a>(p: &'a PropertiesSpec) -> impl Iterator<Item = (&'a PropertySlot, String)> + 'a {
    p.slots.iter().filter(|s| s.arg.is_some()).map(|s| (s, ident(&s.name)))
}

fn properties_enum(out: &mut String, schema: &CompiledSchema) {
    out.push_str("#[derive(Debug, Clone, PartialEq)]\npub enum Properties {\n");
    for p in schema.properties() {
        if p.args.is_empty() {
            out.push_str(&format!("    {},\n", p.constructor));
            continue;
        }
        out.push_str(&format!("    {} {{\n", p.constructor));
        for (s, name) in accessible_slots(p) {
            out.push_str(&format!("        {}: {},\n", name, property_type(s.kind, &s.ty)));
        }
        out.push_str("    },\n");
    }
    out.push_str("}\n\n");
}

/// Head of a `match` over `p: &Properties`; an empty enum needs `*p`.
fn properties_match(out: &mut String, schema: &CompiledSchema) -> bool {
    if schema.properties().is_empty() {
        out.push_str("    match *p {}\n}\n\n");
        return false;
    }
    out.push_str("    match p {\n");
    true
}

fn sexp_of_properties(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn sexp_of_properties(p: &Properties) -> Sexp {\n");
    if !properties_match(out, schema) {
        return;
    }
    for p in schema.properties() {
        out.push_str(&format!("        {} => {{\n", pattern("Properties", &p.constructor, &p.args)));
        out.push_str("            let mut fields__ = Vec::new();\n");
        for (s, name) in accessible_slots(p) {
            match s.kind {
                SlotKind::Flag => out.push_str(&format!(
                    "            if *{} {{\n                fields__.push({});\n            }}\n",
                    name,
                    field_sexp(&s.name, BIT_TYPE, &name)
                )),
                SlotKind::Optional => out.push_str(&format!(
                    "            if let Some(v__) = {} {{\n                fields__.push({});\n            }}\n",
                    name,
                    field_sexp(&s.name, &s.ty, "v__")
                )),
            }
        }
        out.push_str("            Sexp::Arr(fields__)\n        }\n");
    }
    out.push_str("    }\n}\n\n");
}

fn read_properties(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn read_properties<R: Read>(class_index: u16, input__: &mut R) -> Result<Properties, Error> {\n");
    out.push_str("    match class_index {\n");
    for p in schema.properties() {
        out.push_str(&format!("        {} => {{\n", p.class_index));
        out.push_str("            let flags__ = read_short(input__)?;\n");
        out.push_str("            if flags__ & 1 != 0 {\n");
        out.push_str(&format!(
            "                return Err(syntax_error(\"class {}: property flags continuation word is not supported\".to_string()));\n",
            p.class_index
        ));
        out.push_str("            }\n");
        for s in &p.slots {
            let test = format!("flags__ & 0x{:04x} != 0", s.mask);
            match (s.kind, s.arg) {
                (SlotKind::Flag, Some(_)) => {
                    out.push_str(&format!("            let {} = {};\n", ident(&s.name), test));
                }
                (SlotKind::Flag, None) => {}
                (SlotKind::Optional, Some(_)) => out.push_str(&format!(
                    "            let {} = if {} {{ Some(read_{}(input__)?) }} else {{ None }};\n",
                    ident(&s.name),
                    test,
                    fn_suffix(&s.ty)
                )),
                (SlotKind::Optional, None) => out.push_str(&format!(
                    "            if {} {{\n                read_{}(input__)?;\n            }}\n",
                    test,
                    fn_suffix(&s.ty)
                )),
            }
        }
        out.push_str(&format!("            Ok({})\n        }}\n", pattern("Properties", &p.constructor, &p.args)));
    }
    out.push_str("        _ => Err(internal_error(format!(\"Bad content class {}\", class_index))),\n    }\n}\n\n");
}

fn class_index(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn class_index(p: &Properties) -> u16 {\n");
    if !properties_match(out, schema) {
        return;
    }
    for p in schema.properties() {
        out.push_str(&format!("        Properties::{} {{ .. }} => {},\n", p.constructor, p.class_index));
    }
    out.push_str("    }\n}\n\n");
}

fn properties_of_sexp(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn properties_of_sexp(class_index: u16, s__: &Sexp) -> Result<Properties, Error> {\n");
    out.push_str("    match class_index {\n");
    for p in schema.properties() {
        out.push_str(&format!("        {} => {{\n", p.class_index));
        for (s, name) in accessible_slots(p) {
            let init = match s.kind {
                SlotKind::Flag => "false",
                SlotKind::Optional => "None",
            };
            out.push_str(&format!("            let mut {} = {};\n", name, init));
        }
        out.push_str("            if let Sexp::Arr(ps__) = s__ {\n");
        out.push_str("                for p__ in ps__ {\n");
        out.push_str("                    let Sexp::Arr(kv__) = p__ else { continue };\n");
        out.push_str("                    let [Sexp::Str(k__), v__] = kv__.as_slice() else { continue };\n");
        out.push_str("                    match k__.as_slice() {\n");
        for (s, name) in accessible_slots(p) {
            let value = match s.kind {
                SlotKind::Flag => format!("{}_of_sexp(v__)?", fn_suffix(BIT_TYPE)),
                SlotKind::Optional => format!("Some({}_of_sexp(v__)?)", fn_suffix(&s.ty)),
            };
            out.push_str(&format!(
                "                        b{} => {} = {},\n",
                quoted(&s.name),
                name,
                value
            ));
        }
        out.push_str("                        _ => {}\n");
        out.push_str("                    }\n                }\n            }\n");
        out.push_str(&format!("            Ok({})\n        }}\n", pattern("Properties", &p.constructor, &p.args)));
    }
    out.push_str("        _ => Err(internal_error(format!(\"Bad content class {}\", class_index))),\n    }\n}\n\n");
}

fn write_properties(out: &mut String, schema: &CompiledSchema) {
    out.push_str("pub fn write_properties<W: Write>(p: &Properties, output__: &mut W) -> Result<(), Error> {\n");
    if !properties_match(out, schema) {
        return;
    }
    for p in schema.properties() {
        out.push_str(&format!("        {} => {{\n", pattern("Properties", &p.constructor, &p.args)));
        out.push_str("            let mut flags__: Short = 0;\n");
        for (s, name) in accessible_slots(p) {
            let test = match s.kind {
                SlotKind::Flag => format!("*{}", name),
                SlotKind::Optional => format!("{}.is_some()", name),
            };
            out.push_str(&format!("            if {} {{\n                flags__ |= 0x{:04x};\n            }}\n", test, s.mask));
        }
        out.push_str("            write_short(output__, &flags__)?;\n");
        for (s, name) in accessible_slots(p).filter(|(s, _)| s.kind == SlotKind::Optional) {
            out.push_str(&format!(
                "            if let Some(v__) = {} {{\n                write_{}(output__, v__)?;\n            }}\n",
                name,
                fn_suffix(&s.ty)
            ));
        }
        out.push_str("            Ok(())\n        }\n");
    }
    out.push_str("    }\n}\n");
}

/// Render the envelope module: a `Message` enum with an `Unknown` fallback,
/// the two conversions, and one constructor helper per selector.
pub fn envelope_module(schema: &EnvelopeSchema, options: &EmitOptions) -> String {
    let mut out = String::new();
    header_lines(&mut out, &options.header);
    out.push_str(&format!("use {}::Sexp;\n\n", options.sexp_module));

    out.push_str("#[derive(Debug, Clone, PartialEq, Eq)]\npub enum Message {\n");
    for m in schema.messages() {
        let ctor = m.selector.to_upper_camel_case();
        if m.args.is_empty() {
            out.push_str(&format!("    {},\n", ctor));
        } else {
            let fields: Vec<_> = m.args.iter().map(|a| format!("{}: Sexp", ident(a))).collect();
            out.push_str(&format!("    {} {{ {} }},\n", ctor, fields.join(", ")));
        }
    }
    out.push_str("    Unknown(Sexp),\n}\n\n");

    out.push_str("pub fn sexp_of_message(m: &Message) -> Sexp {\n    match m {\n");
    for m in schema.messages() {
        let ctor = m.selector.to_upper_camel_case();
        let mut items = vec![format!("Sexp::str({})", quoted(&m.selector))];
        items.extend(args_of(&m.args).into_iter().map(|a| format!("{}.clone()", a)));
        out.push_str(&format!(
            "        {} => Sexp::Arr(vec![{}]),\n",
            envelope_pattern(&ctor, &m.args),
            items.join(", ")
        ));
    }
    out.push_str("        Message::Unknown(s) => s.clone(),\n    }\n}\n\n");

    out.push_str("pub fn message_of_sexp(s: &Sexp) -> Message {\n");
    out.push_str("    let Sexp::Arr(items) = s else {\n        return Message::Unknown(s.clone());\n    };\n");
    out.push_str("    match items.as_slice() {\n");
    for m in schema.messages() {
        let ctor = m.selector.to_upper_camel_case();
        let args = args_of(&m.args);
        let mut slots = vec!["Sexp::Str(selector__)".to_string()];
        slots.extend(args.iter().cloned());
        let fields: Vec<_> = args.iter().map(|a| format!("{a}: {a}.clone()")).collect();
        let value = if args.is_empty() {
            format!("Message::{}", ctor)
        } else {
            format!("Message::{} {{ {} }}", ctor, fields.join(", "))
        };
        out.push_str(&format!(
            "        [{}] if selector__.as_slice() == b{} => {},\n",
            slots.join(", "),
            quoted(&m.selector),
            value
        ));
    }
    out.push_str("        _ => Message::Unknown(s.clone()),\n    }\n}\n");

    for m in schema.messages() {
        let ctor = m.selector.to_upper_camel_case();
        let params: Vec<_> = args_of(&m.args).into_iter().map(|a| format!("{}: Sexp", a)).collect();
        out.push_str(&format!(
            "\npub fn {}({}) -> Sexp {{\n    sexp_of_message(&{})\n}}\n",
            ident(&m.selector),
            params.join(", "),
            envelope_pattern(&ctor, &m.args)
        ));
    }
    debug!(messages = schema.messages().len(), "emitted envelope module");
    out
}

fn args_of(args: &[String]) -> Vec<String> {
    args.iter().map(|a| ident(a)).collect()
}

fn envelope_pattern(ctor: &str, args: &[String]) -> String {
    if args.is_empty() {
        format!("Message::{}", ctor)
    } else {
        format!("Message::{} {{ {} }}", ctor, args_of(args).join(", "))
    }
}

/// One line per dispatch entry: index, constructor, flags.
pub fn dispatch_summary(schema: &CompiledSchema) -> String {
    let mut out = String::new();
    for m in schema.methods() {
        let mut flags = Vec::new();
        if m.content {
            flags.push("content");
        }
        if !m.synchronous {
            flags.push("async");
        }
        if m.deprecated {
            flags.push("deprecated");
        }
        out.push_str(&format!(
            "method {:>3}/{:<3} {:<24} octets={} {}\n",
            m.class_index,
            m.index,
            m.constructor,
            m.layout.words,
            flags.join(",")
        ));
    }
    for p in schema.properties() {
        out.push_str(&format!(
            "properties {:>3} {:<24} fields={}\n",
            p.class_index,
            p.constructor,
            p.slots.len()
        ));
    }
    out
}

/// Write generated source to `path`, creating parent directories.
pub fn write_file(path: &Path, source: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, source)
}
