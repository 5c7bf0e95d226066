//! Method payload fuzz target: arbitrary bytes into the AMQP 0-9-1 codec.
//! Decode must not panic; a decoded method must re-encode to the same bytes.
//! Build with: cargo fuzz run method_decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    thread_local! {
        static CODEC: amqp_codegen::Codec =
            amqp_codegen::Codec::from_schema(&amqp_codegen::amqp::amqp0_9_1()).expect("schema");
    }
    CODEC.with(|codec| {
        if let Ok(m) = codec.decode_method_payload(data) {
            let _ = codec.encode_method_payload(&m).expect("re-encode");
        }
    });
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run method_decode_fuzz");
}
