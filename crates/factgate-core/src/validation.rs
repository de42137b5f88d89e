//! Verification of facts and envelopes.
//!
//! Any reader can check provenance: recompute the canonical digest and
//! verify every attached signature against its embedded public key.

use crate::canonical::fact_digest;
use crate::crypto::verify_digest;
use crate::envelope::{FactEnvelope, Signature};
use crate::error::{CoreError, Result};
use crate::fact::Fact;

/// Check that the declared hash matches the canonical hash.
pub fn verify_fact_hash(fact: &Fact) -> Result<()> {
    let computed = fact_digest(fact).to_base64();
    if computed != fact.hash {
        return Err(CoreError::HashMismatch {
            declared: fact.hash.clone(),
            computed,
        });
    }
    Ok(())
}

/// Verify one signature over a fact's canonical digest.
pub fn verify_signature(fact: &Fact, signature: &Signature) -> Result<()> {
    let digest = fact_digest(fact);
    verify_digest(&signature.public_key, &digest, &signature.signature)
}

/// Verify the hash and every signature of an envelope.
///
/// Returns the number of verified signatures; an unsigned envelope with a
/// consistent hash verifies with zero.
pub fn verify_envelope(envelope: &FactEnvelope) -> Result<usize> {
    verify_fact_hash(&envelope.fact)?;
    for signature in &envelope.signatures {
        verify_signature(&envelope.fact, signature)?;
    }
    Ok(envelope.signatures.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningKeyPair;
    use crate::fact::{Fields, Predecessors};
    use serde_json::json;

    fn note(text: &str) -> Fact {
        let fields = json!({ "text": text }).as_object().cloned().unwrap();
        Fact::new("Note", fields, Predecessors::new())
    }

    fn sign(fact: &Fact, keypair: &SigningKeyPair) -> Signature {
        Signature {
            signature: keypair.sign_digest(&fact_digest(fact)),
            public_key: keypair.public_pem().unwrap(),
        }
    }

    #[test]
    fn test_verify_signed_envelope() {
        let fact = note("hello");
        let a = SigningKeyPair::generate();
        let b = SigningKeyPair::generate();
        let envelope = FactEnvelope::new(fact.clone(), vec![sign(&fact, &a), sign(&fact, &b)]);

        assert_eq!(verify_envelope(&envelope).unwrap(), 2);
    }

    #[test]
    fn test_unsigned_envelope_verifies_with_zero() {
        assert_eq!(verify_envelope(&FactEnvelope::unsigned(note("x"))).unwrap(), 0);
    }

    #[test]
    fn test_signature_from_other_fact_rejected() {
        let keypair = SigningKeyPair::generate();
        let other = note("other");
        let envelope = FactEnvelope::new(note("mine"), vec![sign(&other, &keypair)]);

        assert!(matches!(
            verify_envelope(&envelope),
            Err(CoreError::InvalidSignature)
        ));
    }

    #[test]
    fn test_hash_mismatch_detected() {
        let fact = Fact::from_parts("Note", "bogus", Fields::new(), Predecessors::new());
        let err = verify_fact_hash(&fact).unwrap_err();
        assert!(matches!(err, CoreError::HashMismatch { ref declared, .. } if declared == "bogus"));
    }
}
