//! Deterministic serialization for committed values.
//!
//! Every commitment in the sequencer (transaction hashes, network-state
//! hashes, state-transition hashes) is a BLAKE3 hash over the bytes
//! produced here, so the encoding must never depend on map order or
//! platform layout.
//!
//! Encoding format:
//! - Fixed-size fields (Hash, u64, u32, bool) are written directly, little-endian
//! - Variable-length fields (Vec<u8>) are length-prefixed (u32 LE)
//! - Provable options: 1-byte flag (0=None, 1=Some) followed by the 32-byte value

use crate::error::{PrimitiveError, PrimitiveResult};
use crate::network::NetworkState;
use crate::state_transition::ProvableStateTransition;
use crate::transaction::{RuntimeTransaction, Transaction, SIGNATURE_LEN};
use crate::types::{Hash, MethodId};

/// A cursor for reading bytes during decoding.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_bytes(&mut self, n: usize) -> PrimitiveResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(PrimitiveError::Serialization("unexpected end of data".into()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u32(&mut self) -> PrimitiveResult<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> PrimitiveResult<u64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_hash(&mut self) -> PrimitiveResult<Hash> {
        let bytes = self.read_bytes(32)?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(bytes);
        Ok(hash)
    }

    fn read_var_bytes(&mut self) -> PrimitiveResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    fn finish(self) -> PrimitiveResult<()> {
        if self.remaining() != 0 {
            return Err(PrimitiveError::Serialization(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

// ── Encoding helpers ──

fn write_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_bool(buf: &mut Vec<u8>, v: bool) {
    write_u8(buf, u8::from(v));
}

fn write_hash(buf: &mut Vec<u8>, h: &Hash) {
    buf.extend_from_slice(h);
}

fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_u32(buf, data.len() as u32);
    buf.extend_from_slice(data);
}

// ── Transactions ──

/// Encode the committed fields of a transaction.
pub fn encode_runtime_transaction(tx: &RuntimeTransaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 32 + 8 + 32);
    write_u64(&mut buf, tx.method_id.as_u64());
    write_hash(&mut buf, &tx.sender);
    write_u64(&mut buf, tx.nonce);
    write_hash(&mut buf, &tx.args_hash);
    buf
}

/// Encode a signed transaction into its wire form.
///
/// ```text
/// [method_id: 8 LE] [sender: 32] [nonce: 8 LE] [args: u32 LE len + bytes] [signature: 64]
/// ```
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 32 + 8 + 4 + tx.args.len() + SIGNATURE_LEN);
    write_u64(&mut buf, tx.method_id.as_u64());
    write_hash(&mut buf, &tx.sender);
    write_u64(&mut buf, tx.nonce);
    write_var_bytes(&mut buf, &tx.args);
    buf.extend_from_slice(&tx.signature);
    buf
}

/// Decode a signed transaction from its wire form.
pub fn decode_transaction(data: &[u8]) -> PrimitiveResult<Transaction> {
    let mut r = Reader::new(data);
    let method_id = MethodId(r.read_u64()?);
    let sender = r.read_hash()?;
    let nonce = r.read_u64()?;
    let args = r.read_var_bytes()?;
    let signature = r.read_bytes(SIGNATURE_LEN)?.to_vec();
    r.finish()?;

    Ok(Transaction {
        method_id,
        sender,
        nonce,
        args,
        signature,
    })
}

// ── Network state ──

pub fn encode_network_state(state: &NetworkState) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + 32);
    write_u64(&mut buf, state.block_height);
    write_hash(&mut buf, &state.previous_state_root);
    buf
}

// ── State transitions ──

pub fn encode_provable_state_transition(st: &ProvableStateTransition) -> Vec<u8> {
    let mut buf = Vec::with_capacity(32 + 2 * 33);
    write_hash(&mut buf, &st.path);
    write_bool(&mut buf, st.from.is_some);
    write_hash(&mut buf, &st.from.value);
    write_bool(&mut buf, st.to.is_some);
    write_hash(&mut buf, &st.to.value);
    buf
}

/// Encode a list of byte fields, as used for method argument payloads.
pub fn encode_args(fields: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_u32(&mut buf, fields.len() as u32);
    for field in fields {
        write_var_bytes(&mut buf, field);
    }
    buf
}

/// Decode an argument payload produced by [`encode_args`].
pub fn decode_args(data: &[u8]) -> PrimitiveResult<Vec<Vec<u8>>> {
    let mut r = Reader::new(data);
    let count = r.read_u32()? as usize;
    // Each field needs at least its 4-byte length prefix.
    if count > r.remaining() / 4 {
        return Err(PrimitiveError::Serialization("argument count too large".into()));
    }
    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        fields.push(r.read_var_bytes()?);
    }
    r.finish()?;
    Ok(fields)
}
