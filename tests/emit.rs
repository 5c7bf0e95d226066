//! Source emission for the AMQP codec module and the envelope module.

use amqp_codegen::emit::{self, ident, EmitOptions};
use amqp_codegen::schema::{ClassDecl, FieldDecl, MethodDecl, Schema, Version};
use amqp_codegen::{amqp, compile, CompiledSchema, ResolvedSchema};

fn compiled() -> CompiledSchema {
    compile(&ResolvedSchema::resolve(&amqp::amqp0_9_1()).expect("resolve")).expect("compile")
}

fn amqp_source() -> String {
    emit::rust_module(&compiled(), &EmitOptions::default())
}

fn balanced(src: &str, open: char, close: char) -> bool {
    src.matches(open).count() == src.matches(close).count()
}

#[test]
fn test_identifiers() {
    assert_eq!(ident("no-wait"), "no_wait");
    assert_eq!(ident("type"), "r#type");
    assert_eq!(ident("self"), "self_");
    assert_eq!(ident("reply-code"), "reply_code");
}

#[test]
fn test_header_constants_and_imports() {
    let src = amqp_source();
    assert!(src.starts_with("// Generated by amqp_codegen. Do not edit by hand.\n"));
    assert!(src.contains("use crate::wireformat::*;\n"));
    assert!(src.contains("use crate::sexp::Sexp;\n"));
    assert!(src.contains("pub const VERSION: (u8, u8, u8) = (0, 9, 1);\n"));
    assert!(src.contains("pub const PORT: u16 = 5672;\n"));
    assert!(src.contains("pub const FRAME_END: i64 = 206;\n"));
    assert!(src.contains("pub const BASIC_CLASS_ID: u16 = 60;\n"));
}

#[test]
fn test_method_enum_and_dispatch() {
    let src = amqp_source();
    assert!(src.contains("pub enum Method {\n"));
    assert!(src.contains("    ExchangeDeclare {\n"));
    assert!(src.contains("        r#type: Shortstr,\n"));
    assert!(src.contains("    TxSelect,\n"));
    assert!(src.contains("        Method::BasicPublish { .. } => true,\n"));
    assert!(src.contains("        Method::BasicAck { .. } => false,\n"));
    assert!(src.contains("        (60, 40) => \"BasicPublish\".to_string(),\n"));
    assert!(src.contains("        _ => Err(frame_error(class_index, method_index)),\n"));
    assert!(src.contains("        Method::TxSelect { .. } => (90, 10),\n"));
}

#[test]
fn test_method_bodies_follow_layout() {
    let src = amqp_source();
    // exchange.declare: reserved short placeholder, then one octet for five bits.
    assert!(src.contains("            write_short(output__, &reserved_value_short())?;\n"));
    assert!(src.contains(
        "            write_octet(output__, &((if *passive { 1 } else { 0 }) | (if *durable { 2 } else { 0 }) | (if *no_wait { 16 } else { 0 })))?;\n"
    ));
    // connection.open: only reserved bits in the run.
    assert!(src.contains("            write_octet(output__, &0)?;\n"));
    assert!(src.contains("            let bits__ = read_octet(input__)?;\n"));
    assert!(src.contains("            let durable = bits__ & 2 != 0;\n"));
}

#[test]
fn test_properties_functions() {
    let src = amqp_source();
    assert!(src.contains("pub enum Properties {\n    BasicProperties {\n"));
    assert!(src.contains("        r#type: Option<Shortstr>,\n"));
    assert!(src.contains("            let flags__ = read_short(input__)?;\n"));
    assert!(src.contains("            if flags__ & 0x0004 != 0 {\n                read_shortstr(input__)?;\n"));
    assert!(src.contains("                flags__ |= 0x8000;\n"));
    assert!(src.contains("                        b\"content-type\" => content_type = Some(shortstr_of_sexp(v__)?),\n"));
    assert!(src.contains("        Properties::BasicProperties { .. } => 60,\n"));
    assert!(src.contains("Bad content class {}"));
}

#[test]
fn test_field_names_never_shadow_generated_locals() {
    let class = ClassDecl::new(200, "clash")
        .field(FieldDecl::new("flags", "shortstr"))
        .field(FieldDecl::new("fields", "bit"))
        .field(FieldDecl::new("v", "octet"))
        .field(FieldDecl::new("p", "table"))
        .field(FieldDecl::reserved("s", "bit"))
        .method(
            MethodDecl::new(10, "collide")
                .field(FieldDecl::new("bits", "bit"))
                .field(FieldDecl::new("input", "bit"))
                .field(FieldDecl::new("output", "shortstr")),
        );
    let schema = Schema::new(Version { major: 0, minor: 9, revision: 1 }, 5672).class(class);
    let compiled = compile(&ResolvedSchema::resolve(&schema).expect("resolve")).expect("compile");
    let src = emit::rust_module(&compiled, &EmitOptions::default());

    assert!(src.contains("            let bits = bits__ & 1 != 0;\n            let input = bits__ & 2 != 0;\n"));
    assert!(src.contains("            let output = read_shortstr(input__)?;\n"));
    assert!(src.contains("            write_shortstr(output__, output)?;\n"));
    assert!(src.contains(
        "            let flags = if flags__ & 0x8000 != 0 { Some(read_shortstr(input__)?) } else { None };\n"
    ));
    assert!(src.contains("            let fields = flags__ & 0x4000 != 0;\n"));
    assert!(src.contains("            if let Some(v__) = v {\n                fields__.push("));
    assert!(src.contains("            if v.is_some() {\n                flags__ |= 0x2000;\n            }\n"));
    assert!(src.contains("                        b\"flags\" => flags = Some(shortstr_of_sexp(v__)?),\n"));
    // The reserved bit at 0x0800 is neither bound nor ever set.
    assert!(!src.contains("0x0800"));
    assert!(!src.contains("let s ="));
}

#[test]
fn test_output_is_deterministic_and_balanced() {
    let a = amqp_source();
    let b = amqp_source();
    assert_eq!(a, b);
    assert!(balanced(&a, '{', '}'));
    assert!(balanced(&a, '(', ')'));
    assert!(balanced(&a, '[', ']'));
}

#[test]
fn test_options_change_paths_and_header() {
    let options = EmitOptions {
        header: "line one\n\nline three".to_string(),
        wireformat_module: "amqp_wire".to_string(),
        sexp_module: "my_sexp".to_string(),
    };
    let src = emit::rust_module(&compiled(), &options);
    assert!(src.starts_with("// line one\n//\n// line three\n\n"));
    assert!(src.contains("use amqp_wire::*;\n"));
    assert!(src.contains("use my_sexp::Sexp;\n"));
}

#[test]
fn test_envelope_module() {
    let src = emit::envelope_module(&amqp::hop_messages(), &EmitOptions::default());
    assert!(src.contains("    Post { target: Sexp, datum: Sexp, token: Sexp },\n"));
    assert!(src.contains("    Unknown(Sexp),\n"));
    assert!(src.contains(
        "        [Sexp::Str(selector__), token] if selector__.as_slice() == b\"unsubscribe\" => Message::Unsubscribe { token: token.clone() },\n"
    ));
    assert!(src.contains("pub fn unsubscribe(token: Sexp) -> Sexp {\n"));
    assert!(src.contains("        Message::Unknown(s) => s.clone(),\n"));
    assert!(balanced(&src, '{', '}'));
}

#[test]
fn test_summary_lists_every_entry() {
    let compiled = compiled();
    let summary = emit::dispatch_summary(&compiled);
    assert_eq!(summary.lines().count(), compiled.methods().len() + compiled.properties().len());
    let publish = summary.lines().find(|l| l.contains("BasicPublish")).expect("publish line");
    assert!(publish.contains("content,async"));
}

#[test]
fn test_write_file_creates_parents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gen").join("amqp_spec.rs");
    let src = amqp_source();
    emit::write_file(&path, &src).expect("write");
    assert_eq!(std::fs::read_to_string(&path).expect("read back"), src);
}
