//! Hop envelope messages: classification and round trips through text.

use amqp_codegen::envelope::Envelope;
use amqp_codegen::{amqp, sexp, CodecError, Sexp};

#[test]
fn test_every_hop_message_round_trips() {
    let schema = amqp::hop_messages();
    for m in schema.messages() {
        let args: Vec<Sexp> = m
            .args
            .iter()
            .map(|a| Sexp::Arr(vec![Sexp::str(a), Sexp::str("some value")]))
            .collect();
        let env = schema.message(&m.selector, args).expect("build");
        let text = env.to_sexp().to_string();
        let parsed = sexp::parse(&text).expect("parse");
        assert_eq!(schema.from_sexp(&parsed), env, "{}", text);
    }
}

#[test]
fn test_post_classification() {
    let schema = amqp::hop_messages();
    let s = sexp::parse("(post inbox (hello world) \"\")").expect("parse");
    match schema.from_sexp(&s) {
        Envelope::Known { selector, args } => {
            assert_eq!(selector, "post");
            assert_eq!(args.len(), 3);
            assert_eq!(args[0], Sexp::str("inbox"));
        }
        other => panic!("expected post, got {:?}", other),
    }
}

#[test]
fn test_unknown_envelopes_preserved() {
    let schema = amqp::hop_messages();
    for text in ["(subscribe only two)", "(shutdown now)", "post", "()"] {
        let s = sexp::parse(text).expect("parse");
        let env = schema.from_sexp(&s);
        assert!(matches!(env, Envelope::Unknown(_)), "{}", text);
        assert_eq!(env.to_sexp(), s);
    }
}

#[test]
fn test_builder_rejects_bad_arity() {
    let schema = amqp::hop_messages();
    let err = schema.message("unsubscribe", vec![]).unwrap_err();
    assert!(matches!(err, CodecError::Validation(_)));
    assert!(!err.is_fatal());
}
