//! Type-check generated modules with rustc against a minimal wire format.
//!
//! Skipped when no `rustc` can be spawned.

use amqp_codegen::emit::{self, EmitOptions};
use amqp_codegen::envelope::{EnvelopeSchema, MessageType};
use amqp_codegen::schema::{ClassDecl, FieldDecl, MethodDecl, ResolvedSchema, Schema, Version};
use amqp_codegen::{amqp, compile, CompiledSchema};
use std::path::Path;
use std::process::Command;

const LIB: &str = r#"
pub mod sexp {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sexp {
        Str(Vec<u8>),
        Arr(Vec<Sexp>),
    }

    impl Sexp {
        pub fn str(s: &str) -> Sexp {
            Sexp::Str(s.as_bytes().to_vec())
        }
    }
}

pub mod wireformat {
    use crate::sexp::Sexp;
    use std::io::{Read, Write};

    #[derive(Debug)]
    pub struct Error(pub String);

    pub type Octet = u8;
    pub type Short = u16;
    pub type Long = u32;
    pub type Longlong = u64;
    pub type Timestamp = u64;
    pub type Bit = bool;
    pub type Shortstr = Vec<u8>;
    pub type Longstr = Vec<u8>;
    pub type Table = Vec<u8>;

    pub fn frame_error(class_index: u16, method_index: u16) -> Error {
        Error(format!("unknown method {}/{}", class_index, method_index))
    }

    pub fn syntax_error(message: String) -> Error {
        Error(message)
    }

    pub fn internal_error(message: String) -> Error {
        Error(message)
    }

    fn io(e: std::io::Error) -> Error {
        Error(e.to_string())
    }

    fn bytes<R: Read>(r: &mut R, n: usize) -> Result<Vec<u8>, Error> {
        let mut b = vec![0; n];
        r.read_exact(&mut b).map_err(io)?;
        Ok(b)
    }

    fn put<W: Write>(w: &mut W, b: &[u8]) -> Result<(), Error> {
        w.write_all(b).map_err(io)
    }

    fn text(s: &Sexp) -> Result<String, Error> {
        match s {
            Sexp::Str(b) => String::from_utf8(b.clone()).map_err(|e| syntax_error(e.to_string())),
            Sexp::Arr(_) => Err(syntax_error("expected an atom".to_string())),
        }
    }

    macro_rules! number {
        ($ty:ty, $n:expr, $read:ident, $write:ident, $to:ident, $of:ident, $reserved:ident) => {
            pub fn $read<R: Read>(r: &mut R) -> Result<$ty, Error> {
                let mut a = [0u8; $n];
                a.copy_from_slice(&bytes(r, $n)?);
                Ok(<$ty>::from_be_bytes(a))
            }

            pub fn $write<W: Write>(w: &mut W, v: &$ty) -> Result<(), Error> {
                put(w, &v.to_be_bytes())
            }

            pub fn $to(v: &$ty) -> Sexp {
                Sexp::Str(v.to_string().into_bytes())
            }

            pub fn $of(s: &Sexp) -> Result<$ty, Error> {
                text(s)?.parse::<$ty>().map_err(|e| syntax_error(e.to_string()))
            }

            pub fn $reserved() -> $ty {
                0
            }
        };
    }

    number!(u8, 1, read_octet, write_octet, sexp_of_octet, octet_of_sexp, reserved_value_octet);
    number!(u16, 2, read_short, write_short, sexp_of_short, short_of_sexp, reserved_value_short);
    number!(u32, 4, read_long, write_long, sexp_of_long, long_of_sexp, reserved_value_long);
    number!(u64, 8, read_longlong, write_longlong, sexp_of_longlong, longlong_of_sexp, reserved_value_longlong);
    number!(u64, 8, read_timestamp, write_timestamp, sexp_of_timestamp, timestamp_of_sexp, reserved_value_timestamp);

    pub fn read_bit<R: Read>(r: &mut R) -> Result<bool, Error> {
        Ok(read_octet(r)? != 0)
    }

    pub fn write_bit<W: Write>(w: &mut W, v: &bool) -> Result<(), Error> {
        write_octet(w, &u8::from(*v))
    }

    pub fn sexp_of_bit(v: &bool) -> Sexp {
        Sexp::str(if *v { "true" } else { "false" })
    }

    pub fn bit_of_sexp(s: &Sexp) -> Result<bool, Error> {
        text(s)?.parse::<bool>().map_err(|e| syntax_error(e.to_string()))
    }

    pub fn reserved_value_bit() -> bool {
        false
    }

    macro_rules! string {
        ($len:ty, $n:expr, $read:ident, $write:ident, $to:ident, $of:ident, $reserved:ident) => {
            pub fn $read<R: Read>(r: &mut R) -> Result<Vec<u8>, Error> {
                let mut a = [0u8; $n];
                a.copy_from_slice(&bytes(r, $n)?);
                let n = <$len>::from_be_bytes(a) as usize;
                bytes(r, n)
            }

            pub fn $write<W: Write>(w: &mut W, v: &Vec<u8>) -> Result<(), Error> {
                let n = <$len>::try_from(v.len()).map_err(|e| syntax_error(e.to_string()))?;
                put(w, &n.to_be_bytes())?;
                put(w, v)
            }

            pub fn $to(v: &Vec<u8>) -> Sexp {
                Sexp::Str(v.clone())
            }

            pub fn $of(s: &Sexp) -> Result<Vec<u8>, Error> {
                match s {
                    Sexp::Str(b) => Ok(b.clone()),
                    Sexp::Arr(_) => Err(syntax_error("expected an atom".to_string())),
                }
            }

            pub fn $reserved() -> Vec<u8> {
                Vec::new()
            }
        };
    }

    string!(u8, 1, read_shortstr, write_shortstr, sexp_of_shortstr, shortstr_of_sexp, reserved_value_shortstr);
    string!(u32, 4, read_longstr, write_longstr, sexp_of_longstr, longstr_of_sexp, reserved_value_longstr);
    string!(u32, 4, read_table, write_table, sexp_of_table, table_of_sexp, reserved_value_table);
}

pub mod amqp_spec;
pub mod clash_spec;
pub mod hop;
pub mod relay;
"#;

fn compiled(schema: &Schema) -> CompiledSchema {
    compile(&ResolvedSchema::resolve(schema).expect("resolve")).expect("compile")
}

/// Field names that match the generator's own locals and parameters.
fn clash_schema() -> Schema {
    let class = ClassDecl::new(200, "clash")
        .field(FieldDecl::new("flags", "shortstr"))
        .field(FieldDecl::new("fields", "bit"))
        .field(FieldDecl::new("v", "octet"))
        .field(FieldDecl::new("p", "table"))
        .field(FieldDecl::reserved("s", "bit"))
        .field(FieldDecl::new("k", "longstr"))
        .method(
            MethodDecl::new(10, "collide")
                .field(FieldDecl::new("bits", "bit"))
                .field(FieldDecl::new("input", "bit"))
                .field(FieldDecl::new("output", "shortstr"))
                .field(FieldDecl::new("class-index", "short")),
        );
    Schema::new(Version { major: 0, minor: 9, revision: 1 }, 5672).class(class)
}

fn relay_messages() -> EnvelopeSchema {
    EnvelopeSchema::new(vec![
        MessageType::new("relay", &["selector", "s", "items"]),
        MessageType::new("ping", &[]),
    ])
}

fn rustc() -> std::ffi::OsString {
    std::env::var_os("RUSTC").unwrap_or_else(|| "rustc".into())
}

fn write(dir: &Path, name: &str, source: &str) {
    emit::write_file(&dir.join(name), source).expect("write generated module");
}

#[test]
fn test_generated_modules_type_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = EmitOptions::default();
    write(dir.path(), "amqp_spec.rs", &emit::rust_module(&compiled(&amqp::amqp0_9_1()), &options));
    write(dir.path(), "clash_spec.rs", &emit::rust_module(&compiled(&clash_schema()), &options));
    write(dir.path(), "hop.rs", &emit::envelope_module(&amqp::hop_messages(), &options));
    write(dir.path(), "relay.rs", &emit::envelope_module(&relay_messages(), &options));
    write(dir.path(), "lib.rs", LIB);

    let output = Command::new(rustc())
        .args(["--edition", "2021", "--crate-type", "lib", "--crate-name", "emitted", "--emit", "metadata"])
        .arg("--out-dir")
        .arg(dir.path())
        .arg(dir.path().join("lib.rs"))
        .output();
    let output = match output {
        Ok(output) => output,
        Err(e) => {
            eprintln!("rustc unavailable, skipping: {}", e);
            return;
        }
    };
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}
