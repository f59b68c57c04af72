//! Signed transactions and their committed form.
//!
//! A [`Transaction`] is what users submit to the mempool. Its committed
//! form, [`RuntimeTransaction`], drops the raw arguments in favour of
//! their hash and is what every transaction-list commitment and every
//! signature covers.

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::codec::encode_runtime_transaction;
use crate::crypto::{hash_tagged, sign_ed25519, verify_ed25519};
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::types::{hash_to_hex, Address, Hash, MethodId};

/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LEN: usize = 64;

const ARGS_TAG: &[u8] = b"tessera/args";
const TRANSACTION_TAG: &[u8] = b"tessera/transaction";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub method_id: MethodId,
    /// Sender address, which is also its Ed25519 verifying key.
    pub sender: Address,
    pub nonce: u64,
    pub args: Vec<u8>,
    pub signature: Vec<u8>,
}

/// The committed fields of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeTransaction {
    pub method_id: MethodId,
    pub sender: Address,
    pub nonce: u64,
    pub args_hash: Hash,
}

/// Commitment over raw method arguments.
pub fn args_hash(args: &[u8]) -> Hash {
    hash_tagged(ARGS_TAG, &[args])
}

impl RuntimeTransaction {
    pub fn hash(&self) -> Hash {
        hash_tagged(TRANSACTION_TAG, &[&encode_runtime_transaction(self)])
    }
}

impl Transaction {
    /// Build and sign a transaction; the sender is the signer's public key.
    pub fn new_signed(method_id: MethodId, nonce: u64, args: Vec<u8>, key: &SigningKey) -> Self {
        let mut tx = Self {
            method_id,
            sender: key.verifying_key().to_bytes(),
            nonce,
            args,
            signature: Vec::new(),
        };
        tx.sign(key);
        tx
    }

    pub fn args_hash(&self) -> Hash {
        args_hash(&self.args)
    }

    pub fn to_runtime_transaction(&self) -> RuntimeTransaction {
        RuntimeTransaction {
            method_id: self.method_id,
            sender: self.sender,
            nonce: self.nonce,
            args_hash: self.args_hash(),
        }
    }

    /// Identity of the transaction. The signature is not part of it.
    pub fn hash(&self) -> Hash {
        self.to_runtime_transaction().hash()
    }

    pub fn sign(&mut self, key: &SigningKey) {
        self.signature = sign_ed25519(&self.hash(), key).to_vec();
    }

    pub fn verify_signature(&self) -> PrimitiveResult<()> {
        let invalid = || PrimitiveError::InvalidSignature {
            sender: hash_to_hex(&self.sender),
        };
        let signature: &[u8; SIGNATURE_LEN] = self
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| invalid())?;
        if verify_ed25519(&self.hash(), signature, &self.sender) {
            Ok(())
        } else {
            Err(invalid())
        }
    }
}
