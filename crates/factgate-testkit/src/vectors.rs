//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding and the resulting hash, so any
//! implementation that stores or verifies facts can check itself against
//! them.

use factgate_core::{canonical_string, compute_hash, Fact, Fields, Predecessors};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub fact_type: &'static str,
    /// Fields as JSON text, in no particular key order.
    pub fields: &'static str,
    /// Predecessors as JSON text, in no particular order.
    pub predecessors: &'static str,
    /// Expected canonical string.
    pub expected_canonical: &'static str,
    /// Expected base64 SHA-512 hash.
    pub expected_hash: &'static str,
}

impl GoldenVector {
    pub fn fields(&self) -> Fields {
        serde_json::from_str(self.fields).unwrap_or_default()
    }

    pub fn predecessors(&self) -> Predecessors {
        serde_json::from_str(self.predecessors).unwrap_or_default()
    }

    pub fn fact(&self) -> Fact {
        Fact::new(self.fact_type, self.fields(), self.predecessors())
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty fact",
            fact_type: "Root",
            fields: "{}",
            predecessors: "{}",
            expected_canonical: r#"{"fields":{},"predecessors":{}}"#,
            expected_hash: "fSS1hK7OGAeSX4ocN3acuFF87jvzCdPN3vLFUtcej0lOAsVV859UIYZLRcHUoMbyd/J31TdVn5QuE7094oqUPg==",
        },
        GoldenVector {
            name: "single field",
            fact_type: "Blog",
            fields: r#"{"name":"notes"}"#,
            predecessors: "{}",
            expected_canonical: r#"{"fields":{"name":"notes"},"predecessors":{}}"#,
            expected_hash: "sd474gUbBMKB6k18y4OtZzavcC9mYzf6gffYcgTXuFwO7GjuQSZf4d3bpa7RgXZvBxcvguHtI6h4OA2tr5MiKA==",
        },
        GoldenVector {
            name: "single predecessor",
            fact_type: "Blog.Post",
            fields: r#"{"title":"hello"}"#,
            predecessors: r#"{"blog":{"type":"Blog","hash":"sd474gUbBMKB6k18y4OtZzavcC9mYzf6gffYcgTXuFwO7GjuQSZf4d3bpa7RgXZvBxcvguHtI6h4OA2tr5MiKA=="}}"#,
            expected_canonical: r#"{"fields":{"title":"hello"},"predecessors":{"blog":{"hash":"sd474gUbBMKB6k18y4OtZzavcC9mYzf6gffYcgTXuFwO7GjuQSZf4d3bpa7RgXZvBxcvguHtI6h4OA2tr5MiKA==","type":"Blog"}}}"#,
            expected_hash: "oUZh5+cTYWdlkrrhP4PQW18z2IFBdsSfvFVLWCqWSH6zPvcpo51hqkf6g9+wp+HWdZ/suAX3Sif0Dq6hnljAkA==",
        },
        GoldenVector {
            name: "nested values and escapes",
            fact_type: "Note",
            fields: r#"{"b":[1,2.5,true,null],"a":{"z":"x\"y","m":"é"}}"#,
            predecessors: "{}",
            expected_canonical: r#"{"fields":{"a":{"m":"é","z":"x\"y"},"b":[1,2.5,true,null]},"predecessors":{}}"#,
            expected_hash: "JzljS6dIjUn9YWuNgOYi+l0qaOPd+xwwUMhijCRkb0mCY1XQjfdiZMnwNqLkoLr1YjIiauFNk4VYd4nb47rKqQ==",
        },
        GoldenVector {
            name: "integral float and predecessor list",
            fact_type: "Tally",
            fields: r#"{"count":3.0}"#,
            predecessors: r#"{"tags":[{"type":"Tag","hash":"YmV0YQ=="},{"type":"Tag","hash":"YWxwaGE="}],"author":{"type":"Jinaga.User","hash":"dXNlcg=="}}"#,
            expected_canonical: r#"{"fields":{"count":3},"predecessors":{"author":{"hash":"dXNlcg==","type":"Jinaga.User"},"tags":[{"hash":"YWxwaGE=","type":"Tag"},{"hash":"YmV0YQ==","type":"Tag"}]}}"#,
            expected_hash: "K29mi1+/YfmSgZBrV8lmypyHB0rbUmXhCHGx/rk2YQcnGEXzo/PM4bov6jTXMC8FYl/0Kf0vRtgPwdwQBU5FYA==",
        },
    ]
}

/// Check every vector, returning the names of those that do not match.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|vector| {
            let fields = vector.fields();
            let predecessors = vector.predecessors();
            canonical_string(&fields, &predecessors) != vector.expected_canonical
                || compute_hash(&fields, &predecessors) != vector.expected_hash
        })
        .map(|vector| vector.name)
        .collect()
}
