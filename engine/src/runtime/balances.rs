//! Built-in account balances module.
//!
//! Accounts hold a u64 balance and a u64 nonce, stored little-endian under
//! the state keys `acct/<addr>/balance` and `acct/<addr>/nonce`.
//!
//! ## Methods
//!
//! - `transfer(to: 32 bytes, amount: 8 bytes LE)`: move `amount` from the
//!   sender to `to`; fails on insufficient balance or overflow

use tessera_primitives::codec::{decode_args, encode_args};
use tessera_primitives::{Address, Hash};

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::context::{state_path, RuntimeContext};
use crate::runtime::RuntimeModule;

/// State key prefix for accounts.
const ACCOUNT_PREFIX: &[u8] = b"acct/";
/// State key suffix for account balances.
const BALANCE_SUFFIX: &[u8] = b"/balance";
/// State key suffix for account nonces.
const NONCE_SUFFIX: &[u8] = b"/nonce";

pub const MODULE_NAME: &str = "Balances";
pub const TRANSFER: &str = "transfer";

fn account_key(addr: &Address, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(ACCOUNT_PREFIX.len() + 32 + suffix.len());
    key.extend_from_slice(ACCOUNT_PREFIX);
    key.extend_from_slice(addr);
    key.extend_from_slice(suffix);
    key
}

/// Merkle path of an account's balance.
pub fn balance_path(addr: &Address) -> Hash {
    state_path(&account_key(addr, BALANCE_SUFFIX))
}

/// Merkle path of an account's nonce.
pub fn nonce_path(addr: &Address) -> Hash {
    state_path(&account_key(addr, NONCE_SUFFIX))
}

/// Encode arguments for `Balances.transfer`.
pub fn transfer_args(to: &Address, amount: u64) -> Vec<u8> {
    encode_args(&[to, &amount.to_le_bytes()])
}

fn decode_transfer_args(args: &[u8]) -> RuntimeResult<(Address, u64)> {
    let fields = decode_args(args).map_err(|e| RuntimeError::InvalidArguments(e.to_string()))?;
    let [to, amount] = fields.as_slice() else {
        return Err(RuntimeError::InvalidArguments(format!(
            "transfer expects 2 arguments, got {}",
            fields.len()
        )));
    };
    let to: Address = to
        .as_slice()
        .try_into()
        .map_err(|_| RuntimeError::InvalidArguments("recipient must be 32 bytes".into()))?;
    let amount: [u8; 8] = amount
        .as_slice()
        .try_into()
        .map_err(|_| RuntimeError::InvalidArguments("amount must be 8 bytes".into()))?;
    Ok((to, u64::from_le_bytes(amount)))
}

/// Move `amount` from `from` to `to`.
pub fn move_balance(
    ctx: &mut RuntimeContext<'_>,
    from: &Address,
    to: &Address,
    amount: u64,
) -> RuntimeResult<()> {
    let from_path = balance_path(from);
    let from_balance = ctx.get_u64(&from_path)?;
    if from_balance < amount {
        return Err(RuntimeError::InsufficientBalance {
            needed: amount,
            available: from_balance,
        });
    }
    if from == to {
        return Ok(());
    }

    let to_path = balance_path(to);
    let to_balance = ctx.get_u64(&to_path)?;
    let new_to = to_balance
        .checked_add(amount)
        .ok_or(RuntimeError::Overflow("recipient balance"))?;

    ctx.set_u64(&from_path, from_balance - amount)?;
    ctx.set_u64(&to_path, new_to)?;
    Ok(())
}

/// State entries funding the given accounts, for genesis and tests.
pub fn genesis_balances(accounts: &[(Address, u64)]) -> Vec<(Hash, Vec<u8>)> {
    accounts
        .iter()
        .map(|(addr, amount)| (balance_path(addr), amount.to_le_bytes().to_vec()))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Balances;

impl RuntimeModule for Balances {
    fn name(&self) -> &'static str {
        MODULE_NAME
    }

    fn methods(&self) -> &'static [&'static str] {
        &[TRANSFER]
    }

    fn dispatch(&self, method: &str, ctx: &mut RuntimeContext<'_>, args: &[u8]) -> RuntimeResult<()> {
        match method {
            TRANSFER => {
                let (to, amount) = decode_transfer_args(args)?;
                let sender = *ctx.sender();
                move_balance(ctx, &sender, &to, amount)
            }
            other => Err(RuntimeError::UnknownMethod {
                module: MODULE_NAME.to_string(),
                method: other.to_string(),
            }),
        }
    }
}
