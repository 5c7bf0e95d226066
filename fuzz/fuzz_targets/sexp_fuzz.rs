//! Text parser fuzz target: arbitrary UTF-8 into `sexp::parse`.
//! Must not panic; whatever parses must render and parse back to itself.
//! Build with: cargo fuzz run sexp_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(v) = amqp_codegen::sexp::parse(s) {
        let again = amqp_codegen::sexp::parse(&v.to_string()).expect("rendered text parses");
        assert_eq!(again, v);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run sexp_fuzz");
}
