//! Cryptographic primitives for Factgate.
//!
//! Wraps SHA-512 hashing and Ed25519 signing with strong types. Keys travel
//! as PEM text (PKCS#8 for private keys, SPKI for public keys) and
//! signatures as base64, which is how they are stored and attached to fact
//! envelopes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::{CoreError, Result};

/// A 64-byte SHA-512 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha512Digest(pub [u8; 64]);

impl Sha512Digest {
    /// Compute the SHA-512 digest of the given data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(data);
        let mut out = [0u8; 64];
        out.copy_from_slice(&hasher.finalize());
        Self(out)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Standard base64 with padding; the printable form of a fact hash.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha512Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha512({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Sha512Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A key pair for signing fact digests.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a key pair from a PKCS#8 PEM private key.
    pub fn from_private_pem(pem: &str) -> Result<Self> {
        let signing_key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// The private key as PKCS#8 PEM.
    pub fn private_pem(&self) -> Result<String> {
        let pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(pem.as_str().to_owned())
    }

    /// The public key as SPKI PEM.
    pub fn public_pem(&self) -> Result<String> {
        self.signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Sign a digest; returns the base64 signature.
    pub fn sign_digest(&self, digest: &Sha512Digest) -> String {
        let signature = self.signing_key.sign(digest.as_bytes());
        STANDARD.encode(signature.to_bytes())
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let public = hex::encode(self.signing_key.verifying_key().to_bytes());
        write!(f, "SigningKeyPair({})", &public[..16])
    }
}

/// Verify a base64 signature over a digest with a PEM public key.
pub fn verify_digest(public_pem: &str, digest: &Sha512Digest, signature: &str) -> Result<()> {
    let verifying_key = VerifyingKey::from_public_key_pem(public_pem)
        .map_err(|e| CoreError::InvalidPublicKey(e.to_string()))?;

    let bytes = STANDARD
        .decode(signature)
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let bytes: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CoreError::InvalidSignature)?;
    let signature = DalekSignature::from_bytes(&bytes);

    verifying_key
        .verify(digest.as_bytes(), &signature)
        .map_err(|_| CoreError::InvalidSignature)
}
