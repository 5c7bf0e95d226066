//! Structured text: byte-string atoms and lists.
//!
//! Textual dumps of methods and properties are built from [`Sexp`] values.
//! The text form is `(a "b c" (d))`: bare tokens for simple atoms, quoted
//! strings with `\"`, `\\`, `\n`, `\t`, `\r` and `\xHH` escapes for the rest.
//! `;` starts a comment that runs to end of line.

use pest::Parser;
use pest_derive::Parser as PestParser;
use std::fmt;

#[derive(PestParser)]
#[grammar = "sexp.pest"]
struct SexpParser;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sexp {
    Str(Vec<u8>),
    Arr(Vec<Sexp>),
}

/// Flat renderings longer than this are broken over several lines by [`Sexp::to_pretty`].
const PRETTY_WIDTH: usize = 72;

impl Sexp {
    pub fn str(s: impl AsRef<[u8]>) -> Self {
        Sexp::Str(s.as_ref().to_vec())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Sexp::Str(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::Arr(items) => Some(items),
            _ => None,
        }
    }

    /// Multi-line rendering for diagnostics; parses back to the same value.
    pub fn to_pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        let flat = self.to_string();
        let items = match self {
            Sexp::Arr(items) if flat.len() + indent > PRETTY_WIDTH && !items.is_empty() => items,
            _ => {
                out.push_str(&flat);
                return;
            }
        };
        out.push('(');
        items[0].write_pretty(out, indent + 1);
        for item in &items[1..] {
            out.push('\n');
            out.push_str(&" ".repeat(indent + 2));
            item.write_pretty(out, indent + 2);
        }
        out.push(')');
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"_-.:/+*=@#!?<>".contains(&b)
}

fn write_atom(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    if !bytes.is_empty() && bytes.iter().all(|&b| is_token_byte(b)) {
        // Token bytes are ASCII.
        return f.write_str(std::str::from_utf8(bytes).map_err(|_| fmt::Error)?);
    }
    f.write_str("\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\t' => f.write_str("\\t")?,
            b'\r' => f.write_str("\\r")?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\x{:02x}", b)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Str(b) => write_atom(f, b),
            Sexp::Arr(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Parse the text form of one value.
pub fn parse(source: &str) -> Result<Sexp, String> {
    let mut pairs = SexpParser::parse(Rule::document, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let document = pairs.next().ok_or("Empty parse")?;
    let node = document
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or("Empty document")?;
    build_node(node)
}

fn build_node(pair: pest::iterators::Pair<Rule>) -> Result<Sexp, String> {
    match pair.as_rule() {
        Rule::list => pair.into_inner().map(build_node).collect::<Result<Vec<_>, _>>().map(Sexp::Arr),
        Rule::token => Ok(Sexp::str(pair.as_str())),
        Rule::quoted => {
            let inner = pair.into_inner().next().ok_or("quoted: missing body")?;
            unescape(inner.as_str()).map(Sexp::Str)
        }
        other => Err(format!("unexpected node: {:?}", other)),
    }
}

fn unescape(body: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('"') => out.push(b'"'),
            Some('\\') => out.push(b'\\'),
            Some('n') => out.push(b'\n'),
            Some('t') => out.push(b'\t'),
            Some('r') => out.push(b'\r'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let b = u8::from_str_radix(&hex, 16).map_err(|_| format!("bad escape \\x{}", hex))?;
                out.push(b);
            }
            other => return Err(format!("bad escape \\{}", other.map(String::from).unwrap_or_default())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_render_bare() {
        let s = Sexp::Arr(vec![Sexp::str("basic"), Sexp::str("publish")]);
        assert_eq!(s.to_string(), "(basic publish)");
    }

    #[test]
    fn awkward_bytes_are_quoted() {
        let s = Sexp::Arr(vec![Sexp::str(""), Sexp::str("a b"), Sexp::Str(vec![0, b'"'])]);
        assert_eq!(s.to_string(), r#"("" "a b" "\x00\"")"#);
    }

    #[test]
    fn parse_reads_back_display() {
        let s = Sexp::Arr(vec![
            Sexp::str("queue"),
            Sexp::Arr(vec![Sexp::str("name"), Sexp::str("my queue\n")]),
            Sexp::Arr(vec![]),
            Sexp::Str(vec![0xff, 0x01]),
        ]);
        assert_eq!(parse(&s.to_string()).expect("parse"), s);
    }

    #[test]
    fn parse_skips_comments_and_whitespace() {
        let s = parse("( a ; trailing words\n  \"b\" )").expect("parse");
        assert_eq!(s, Sexp::Arr(vec![Sexp::str("a"), Sexp::str("b")]));
    }

    #[test]
    fn parse_rejects_unbalanced() {
        assert!(parse("(a (b)").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn pretty_breaks_long_lists() {
        let fields: Vec<_> = (0..12)
            .map(|i| Sexp::Arr(vec![Sexp::str(format!("field-{}", i)), Sexp::str("value")]))
            .collect();
        let s = Sexp::Arr(fields);
        let pretty = s.to_pretty();
        assert!(pretty.lines().count() > 1);
        assert_eq!(parse(&pretty).expect("parse"), s);
    }
}
