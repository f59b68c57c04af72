//! Proof backends.
//!
//! A backend turns a satisfied circuit instance into a [`ProofArtifact`].
//! It only ever sees the circuit name, the serialized public values, and
//! a digest of the private witness; constraint checking happens before it
//! is called.
//!
//! - [`PlaceholderBackend`]: no proof at all, every artifact is the
//!   `mock-proof` placeholder
//! - [`DigestBackend`]: binds the circuit, public values, and witness
//!   digest under BLAKE3 so that artifacts can be re-checked against the
//!   public values they claim

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessera_primitives::{Hash, ProofArtifact};

const DIGEST_PROOF_CONTEXT: &str = "tessera 2024 digest-proof v1";

/// Selected once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvingMode {
    #[default]
    Mock,
    Digest,
}

impl fmt::Display for ProvingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvingMode::Mock => f.write_str("mock"),
            ProvingMode::Digest => f.write_str("digest"),
        }
    }
}

impl FromStr for ProvingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mock" => Ok(ProvingMode::Mock),
            "digest" => Ok(ProvingMode::Digest),
            other => Err(format!("unknown proving mode: {other}")),
        }
    }
}

pub trait ProofBackend: Send + Sync + 'static {
    fn mode(&self) -> ProvingMode;

    fn prove(&self, circuit: &str, public_io: &[u8], witness_digest: &Hash) -> ProofArtifact;

    fn verify(&self, circuit: &str, public_io: &[u8], proof: &ProofArtifact) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderBackend;

impl ProofBackend for PlaceholderBackend {
    fn mode(&self) -> ProvingMode {
        ProvingMode::Mock
    }

    fn prove(&self, _circuit: &str, _public_io: &[u8], _witness_digest: &Hash) -> ProofArtifact {
        ProofArtifact::Placeholder
    }

    fn verify(&self, _circuit: &str, _public_io: &[u8], proof: &ProofArtifact) -> bool {
        matches!(proof, ProofArtifact::Placeholder)
    }
}

/// Artifact layout: `witness_digest (32) || binding (32)` where
/// `binding = BLAKE3-derive(circuit || public_io || witness_digest)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestBackend;

impl DigestBackend {
    fn binding(circuit: &str, public_io: &[u8], witness_digest: &Hash) -> Hash {
        let mut hasher = blake3::Hasher::new_derive_key(DIGEST_PROOF_CONTEXT);
        hasher.update(&(circuit.len() as u32).to_le_bytes());
        hasher.update(circuit.as_bytes());
        hasher.update(&(public_io.len() as u64).to_le_bytes());
        hasher.update(public_io);
        hasher.update(witness_digest);
        *hasher.finalize().as_bytes()
    }
}

impl ProofBackend for DigestBackend {
    fn mode(&self) -> ProvingMode {
        ProvingMode::Digest
    }

    fn prove(&self, circuit: &str, public_io: &[u8], witness_digest: &Hash) -> ProofArtifact {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(witness_digest);
        bytes.extend_from_slice(&Self::binding(circuit, public_io, witness_digest));
        ProofArtifact::Bytes(bytes)
    }

    fn verify(&self, circuit: &str, public_io: &[u8], proof: &ProofArtifact) -> bool {
        let ProofArtifact::Bytes(bytes) = proof else {
            return false;
        };
        if bytes.len() != 64 {
            return false;
        }
        let mut witness_digest = [0u8; 32];
        witness_digest.copy_from_slice(&bytes[..32]);
        Self::binding(circuit, public_io, &witness_digest)[..] == bytes[32..]
    }
}
