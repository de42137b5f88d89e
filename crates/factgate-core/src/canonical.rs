//! Canonical encoding of fact content.
//!
//! The canonical form is compact JSON text:
//!
//! ```text
//! {"fields":<fields>,"predecessors":<predecessors>}
//! ```
//!
//! - Object keys are sorted by byte comparison, recursively
//! - Predecessor references render as `{"hash":..,"type":..}`
//! - Arrays of predecessor references are sorted by hash, then type
//! - Integral floats render without a fractional part
//!
//! The canonical encoding is what makes facts content-addressed: the same
//! fields and predecessors produce identical bytes (and thus identical
//! hashes) no matter how the maps were built.

use serde_json::{Number, Value};

use crate::crypto::Sha512Digest;
use crate::fact::{Fact, FactReference, Fields, PredecessorSet, Predecessors};

/// Encode fields and predecessors to canonical UTF-8 bytes.
pub fn canonicalize(fields: &Fields, predecessors: &Predecessors) -> Vec<u8> {
    canonical_string(fields, predecessors).into_bytes()
}

/// Encode fields and predecessors to the canonical string.
pub fn canonical_string(fields: &Fields, predecessors: &Predecessors) -> String {
    let mut buf = String::with_capacity(128);
    buf.push_str("{\"fields\":");
    encode_object(&mut buf, fields.iter());
    buf.push_str(",\"predecessors\":");
    encode_predecessors(&mut buf, predecessors);
    buf.push('}');
    buf
}

/// Compute the content hash: base64(SHA-512(canonical bytes)).
pub fn compute_hash(fields: &Fields, predecessors: &Predecessors) -> String {
    content_digest(fields, predecessors).to_base64()
}

/// SHA-512 digest of the canonical bytes. This is also the signing input.
pub fn content_digest(fields: &Fields, predecessors: &Predecessors) -> Sha512Digest {
    Sha512Digest::hash(&canonicalize(fields, predecessors))
}

/// Digest of a fact's content, ignoring its declared hash.
pub fn fact_digest(fact: &Fact) -> Sha512Digest {
    content_digest(&fact.fields, &fact.predecessors)
}

/// Recursively encode a JSON value.
fn encode_value(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_text(buf, s),
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_value(buf, item);
            }
            buf.push(']');
        }
        Value::Object(map) => encode_object(buf, map.iter()),
    }
}

/// Encode an object with keys sorted by byte comparison.
fn encode_object<'a>(buf: &mut String, entries: impl Iterator<Item = (&'a String, &'a Value)>) {
    let mut sorted: Vec<(&String, &Value)> = entries.collect();
    sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push('{');
    for (i, (key, value)) in sorted.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_text(buf, key);
        buf.push(':');
        encode_value(buf, value);
    }
    buf.push('}');
}

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Encode a number. Integral floats lose their fractional part so that
/// `1.0` and `1` hash the same.
fn encode_number(buf: &mut String, n: &Number) {
    if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
        if f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT_INTEGER {
            buf.push_str(&(f as i64).to_string());
            return;
        }
    }
    buf.push_str(&n.to_string());
}

/// Encode a string with JSON escaping.
fn encode_text(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            c if (c as u32) < 0x20 => buf.push_str(&format!("\\u{:04x}", c as u32)),
            c => buf.push(c),
        }
    }
    buf.push('"');
}

fn encode_predecessors(buf: &mut String, predecessors: &Predecessors) {
    let mut roles: Vec<(&String, &PredecessorSet)> = predecessors.iter().collect();
    roles.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push('{');
    for (i, (role, set)) in roles.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_text(buf, role);
        buf.push(':');
        match set {
            PredecessorSet::Single(reference) => encode_reference(buf, reference),
            PredecessorSet::Many(references) => {
                let mut sorted: Vec<&FactReference> = references.iter().collect();
                sorted.sort();
                buf.push('[');
                for (j, reference) in sorted.into_iter().enumerate() {
                    if j > 0 {
                        buf.push(',');
                    }
                    encode_reference(buf, reference);
                }
                buf.push(']');
            }
        }
    }
    buf.push('}');
}

fn encode_reference(buf: &mut String, reference: &FactReference) {
    buf.push_str("{\"hash\":");
    encode_text(buf, &reference.hash);
    buf.push_str(",\"type\":");
    encode_text(buf, &reference.fact_type);
    buf.push('}');
}
