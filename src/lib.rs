//! # amqp-codegen: AMQP-style schema compiler and codecs
//!
//! Compiles a declarative protocol schema (classes, methods, typed fields,
//! domain aliases) into symmetric binary codecs for method frames and for
//! per-class content properties.
//!
//! ## Pipeline
//!
//! 1. [`Schema`]: declarations as ingested, field types named through domains.
//! 2. [`ResolvedSchema::resolve`]: domain resolution and validation (at most
//!    15 property fields per class, unique class and method indices).
//! 3. [`compile`]: plans each entity's [`layout`] and synthesizes its read and
//!    write programs into a [`CompiledSchema`].
//! 4. Either [`Codec`] interprets the compiled schema at runtime, or
//!    [`emit::rust_module`] renders it as Rust source.
//!
//! ## Wire layout
//!
//! - Method fields are written in declared order. Consecutive `bit` fields
//!   pack LSB-first, eight per octet; a run is flushed before any other field.
//! - Property sets start with a 16-bit flags word: first field at bit 15,
//!   bit 0 reserved for continuation. Bit fields live in their flag; other
//!   fields are present when their flag is set.
//!
//! ## Usage
//!
//! ```no_run
//! use amqp_codegen::{amqp, Codec, Method, Value};
//!
//! let codec = Codec::from_schema(&amqp::amqp0_9_1()).expect("schema");
//! let m = Method::new(60, 80, vec![Value::LongLong(7), Value::Bit(true)]);
//! let bytes = codec.encode_method_payload(&m).expect("encode");
//! assert_eq!(codec.decode_method_payload(&bytes).expect("decode"), m);
//! ```

pub mod amqp;
pub mod codec;
pub mod emit;
pub mod envelope;
pub mod layout;
pub mod schema;
pub mod sexp;
pub mod synth;
pub mod value;
pub mod wire;

pub use codec::{Codec, CodecError};
pub use envelope::{Envelope, EnvelopeSchema, MessageType};
pub use schema::{ClassDecl, FieldDecl, MethodDecl, ResolvedSchema, Schema, SchemaError, Version};
pub use sexp::Sexp;
pub use synth::{compile, CompiledSchema};
pub use value::{FieldTable, FieldValue, Method, Properties, Value};
pub use wire::WireType;
