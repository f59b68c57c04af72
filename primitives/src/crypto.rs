//! Cryptographic operations for the Tessera sequencer.
//!
//! - BLAKE3 for commitments, state paths, and Merkle nodes
//! - SHA-256 for computed-block identifiers
//! - Ed25519 for pending-transaction signatures
//!
//! All operations are deterministic with no randomization, except key
//! generation which is only used by tests and tooling.

use crate::types::Hash;

/// Compute BLAKE3 hash of the input data.
pub fn hash_blake3(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Compute a domain-separated BLAKE3 hash over several parts.
///
/// The tag and every part are length-prefixed so that distinct splits of
/// the same bytes never collide.
pub fn hash_tagged(tag: &[u8], parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(tag.len() as u32).to_le_bytes());
    hasher.update(tag);
    for part in parts {
        hasher.update(&(part.len() as u32).to_le_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Compute SHA-256 hash of the input data.
pub fn hash_sha256(data: &[u8]) -> Hash {
    use sha2::Digest;
    let result = sha2::Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Verify an Ed25519 signature.
///
/// Returns `true` if the signature is valid for the given message and
/// public key, `false` otherwise (including malformed keys).
pub fn verify_ed25519(message: &[u8], signature: &[u8; 64], public_key: &[u8; 32]) -> bool {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = Signature::from_bytes(signature);
    verifying_key.verify(message, &sig).is_ok()
}

/// Sign a message with an Ed25519 private key.
pub fn sign_ed25519(message: &[u8], secret_key: &ed25519_dalek::SigningKey) -> [u8; 64] {
    use ed25519_dalek::Signer;
    secret_key.sign(message).to_bytes()
}

/// Generate an Ed25519 keypair from OS randomness.
///
/// Never used on the sequencing path.
pub fn generate_keypair() -> (ed25519_dalek::VerifyingKey, ed25519_dalek::SigningKey) {
    use ed25519_dalek::SigningKey;
    let mut rng = rand::rngs::OsRng;
    let signing_key = SigningKey::generate(&mut rng);
    let verifying_key = signing_key.verifying_key();
    (verifying_key, signing_key)
}
