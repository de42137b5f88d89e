//! Fact envelopes: facts paired with the signatures collected for them.

use serde::{Deserialize, Serialize};

use crate::fact::{Fact, FactReference};

/// A signature over a fact's canonical digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    /// Base64 signature bytes.
    pub signature: String,
    /// PEM public key of the signer.
    pub public_key: String,
}

/// A fact and zero or more signatures, in append order.
///
/// An empty signature list means the fact was saved without an
/// authenticated identity (or a soft signing failure was tolerated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactEnvelope {
    pub fact: Fact,
    pub signatures: Vec<Signature>,
}

impl FactEnvelope {
    /// Wrap a fact with no signatures.
    pub fn unsigned(fact: Fact) -> Self {
        Self {
            fact,
            signatures: Vec::new(),
        }
    }

    pub fn new(fact: Fact, signatures: Vec<Signature>) -> Self {
        Self { fact, signatures }
    }

    pub fn reference(&self) -> FactReference {
        self.fact.reference()
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Append signatures from another envelope for the same fact, skipping
    /// signers already present. Returns the number of signatures added.
    pub fn merge_signatures(&mut self, signatures: &[Signature]) -> usize {
        let mut added = 0;
        for signature in signatures {
            if !self
                .signatures
                .iter()
                .any(|existing| existing.public_key == signature.public_key)
            {
                self.signatures.push(signature.clone());
                added += 1;
            }
        }
        added
    }
}
