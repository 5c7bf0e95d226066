//! Message envelopes: a selector atom followed by positional arguments.
//!
//! No bit packing and no optional fields. An envelope travels as
//! `(selector arg ...)`; lists that match no known selector with the right
//! arity are kept whole as [`Envelope::Unknown`].

use crate::codec::CodecError;
use crate::sexp::Sexp;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageType {
    pub selector: String,
    pub args: Vec<String>,
}

impl MessageType {
    pub fn new(selector: impl Into<String>, args: &[&str]) -> Self {
        MessageType {
            selector: selector.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Known { selector: String, args: Vec<Sexp> },
    Unknown(Sexp),
}

impl Envelope {
    pub fn to_sexp(&self) -> Sexp {
        match self {
            Envelope::Known { selector, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Sexp::str(selector));
                items.extend(args.iter().cloned());
                Sexp::Arr(items)
            }
            Envelope::Unknown(s) => s.clone(),
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match self {
            Envelope::Known { selector, .. } => Some(selector),
            Envelope::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvelopeSchema {
    messages: Vec<MessageType>,
    by_selector: HashMap<String, usize>,
}

impl EnvelopeSchema {
    pub fn new(messages: Vec<MessageType>) -> Self {
        let by_selector = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (m.selector.clone(), i))
            .collect();
        EnvelopeSchema { messages, by_selector }
    }

    pub fn messages(&self) -> &[MessageType] {
        &self.messages
    }

    pub fn get(&self, selector: &str) -> Option<&MessageType> {
        self.by_selector.get(selector).map(|&i| &self.messages[i])
    }

    /// Classify a received value. Never fails: anything unrecognized is
    /// returned as [`Envelope::Unknown`].
    pub fn from_sexp(&self, s: &Sexp) -> Envelope {
        if let Some((head, rest)) = s.as_list().and_then(|items| items.split_first()) {
            if let Some(m) = head.as_text().and_then(|sel| self.get(sel)) {
                if m.args.len() == rest.len() {
                    return Envelope::Known { selector: m.selector.clone(), args: rest.to_vec() };
                }
            }
        }
        Envelope::Unknown(s.clone())
    }

    /// Build a known envelope, checking selector and arity.
    pub fn message(&self, selector: &str, args: Vec<Sexp>) -> Result<Envelope, CodecError> {
        let m = self
            .get(selector)
            .ok_or_else(|| CodecError::UnknownMethod(selector.to_string()))?;
        if m.args.len() != args.len() {
            return Err(CodecError::Validation(format!(
                "{} takes {} arguments, found {}",
                selector,
                m.args.len(),
                args.len()
            )));
        }
        Ok(Envelope::Known { selector: m.selector.clone(), args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> EnvelopeSchema {
        EnvelopeSchema::new(vec![
            MessageType::new("post", &["target", "datum", "token"]),
            MessageType::new("ping", &[]),
        ])
    }

    #[test]
    fn known_selector_with_matching_arity() {
        let s = crate::sexp::parse("(post q1 (hello) \"\")").expect("parse");
        let env = schema().from_sexp(&s);
        assert_eq!(env.selector(), Some("post"));
        assert_eq!(env.to_sexp(), s);
    }

    #[test]
    fn wrong_arity_is_unknown() {
        let s = crate::sexp::parse("(post q1)").expect("parse");
        assert_eq!(schema().from_sexp(&s), Envelope::Unknown(s.clone()));
    }

    #[test]
    fn non_lists_and_unknown_selectors_are_kept() {
        let sc = schema();
        for text in ["bare", "()", "(pong)", "((post) a b c)"] {
            let s = crate::sexp::parse(text).expect("parse");
            let env = sc.from_sexp(&s);
            assert_eq!(env, Envelope::Unknown(s.clone()), "{}", text);
            assert_eq!(env.to_sexp(), s);
        }
    }

    #[test]
    fn nullary_message() {
        let env = schema().message("ping", vec![]).expect("ping");
        assert_eq!(env.to_sexp().to_string(), "(ping)");
    }

    #[test]
    fn message_checks_arity_and_selector() {
        let sc = schema();
        assert!(matches!(sc.message("post", vec![]), Err(CodecError::Validation(_))));
        assert!(matches!(sc.message("nope", vec![]), Err(CodecError::UnknownMethod(_))));
    }
}
