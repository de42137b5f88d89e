//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::Value;

use factgate_core::{Fact, FactReference, Fields, PredecessorSet, Predecessors};

/// Generate an arbitrary JSON value, nested up to three levels.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6f64).prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::String),
        "\\PC{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Generate a field map.
pub fn fields() -> impl Strategy<Value = Fields> {
    prop::collection::btree_map("[a-zA-Z][a-zA-Z0-9]{0,7}", json_value(), 0..6)
        .prop_map(|map| map.into_iter().collect())
}

/// Generate a fact type name.
pub fn fact_type() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,7}(\\.[A-Z][a-z]{1,7})?".prop_map(String::from)
}

/// Generate a reference with a hash-shaped (not necessarily real) hash.
pub fn fact_reference() -> impl Strategy<Value = FactReference> {
    (fact_type(), "[A-Za-z0-9+/]{86}==")
        .prop_map(|(fact_type, hash)| FactReference::new(fact_type, hash))
}

/// Generate a predecessor set, single or many.
pub fn predecessor_set() -> impl Strategy<Value = PredecessorSet> {
    prop_oneof![
        fact_reference().prop_map(PredecessorSet::Single),
        prop::collection::vec(fact_reference(), 0..4).prop_map(PredecessorSet::Many),
    ]
}

/// Generate predecessors keyed by role.
pub fn predecessors() -> impl Strategy<Value = Predecessors> {
    prop::collection::btree_map("[a-z]{1,8}", predecessor_set(), 0..4)
}

/// Parameters for generating a fact.
#[derive(Debug, Clone)]
pub struct FactParams {
    pub fact_type: String,
    pub fields: Fields,
    pub predecessors: Predecessors,
}

impl FactParams {
    pub fn fact(&self) -> Fact {
        Fact::new(
            self.fact_type.clone(),
            self.fields.clone(),
            self.predecessors.clone(),
        )
    }
}

impl Arbitrary for FactParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (fact_type(), fields(), predecessors())
            .prop_map(|(fact_type, fields, predecessors)| FactParams {
                fact_type,
                fields,
                predecessors,
            })
            .boxed()
    }
}

/// The same predecessors with every multi-reference role reversed.
pub fn reversed(predecessors: &Predecessors) -> Predecessors {
    predecessors
        .iter()
        .map(|(role, set)| {
            let set = match set {
                PredecessorSet::Many(references) => {
                    PredecessorSet::Many(references.iter().rev().cloned().collect())
                }
                single => single.clone(),
            };
            (role.clone(), set)
        })
        .collect()
}
