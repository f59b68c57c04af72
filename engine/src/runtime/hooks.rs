//! Transaction hooks run before every method.
//!
//! - [`NonceHook`]: the transaction nonce must equal the sender's account
//!   nonce, which is then incremented (replay protection)
//! - [`TransactionFeeHook`]: charges `base_fee + weight * per_weight_unit_fee`
//!   and pays it to the configured recipient
//!
//! A failing hook rejects the transaction; it is never included.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_primitives::{Address, ZERO_ADDRESS};

use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::balances::{move_balance, nonce_path};
use crate::runtime::context::RuntimeContext;
use crate::runtime::TransactionHook;

#[derive(Debug, Clone, Copy, Default)]
pub struct NonceHook;

impl TransactionHook for NonceHook {
    fn name(&self) -> &'static str {
        "nonce"
    }

    fn before_transaction(&self, ctx: &mut RuntimeContext<'_>) -> RuntimeResult<()> {
        let sender = *ctx.sender();
        let got = ctx.transaction().nonce;
        let path = nonce_path(&sender);
        let expected = ctx.get_u64(&path)?;
        if got != expected {
            return Err(RuntimeError::InvalidNonce { expected, got });
        }
        let next = expected
            .checked_add(1)
            .ok_or(RuntimeError::Overflow("account nonce"))?;
        ctx.set_u64(&path, next)
    }
}

/// Fee parameters of a single method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodFee {
    pub base_fee: u64,
    pub weight: u64,
    pub per_weight_unit_fee: u64,
}

impl MethodFee {
    /// Fee charged for one call, saturating at `u64::MAX`.
    pub fn fee(&self) -> u64 {
        self.base_fee
            .saturating_add(self.weight.saturating_mul(self.per_weight_unit_fee))
    }
}

/// Fee schedule, keyed by `"<module>.<method>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    pub fee_recipient: Address,
    /// Applies to every method without an explicit entry.
    pub default: MethodFee,
    pub methods: BTreeMap<String, MethodFee>,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            fee_recipient: ZERO_ADDRESS,
            default: MethodFee::default(),
            methods: BTreeMap::new(),
        }
    }
}

impl FeeConfig {
    pub fn method_fee(&self, module: &str, method: &str) -> MethodFee {
        self.methods
            .get(&format!("{module}.{method}"))
            .copied()
            .unwrap_or(self.default)
    }
}

#[derive(Debug, Clone)]
pub struct TransactionFeeHook {
    config: FeeConfig,
}

impl TransactionFeeHook {
    pub fn new(config: FeeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }
}

impl TransactionHook for TransactionFeeHook {
    fn name(&self) -> &'static str {
        "fee"
    }

    fn before_transaction(&self, ctx: &mut RuntimeContext<'_>) -> RuntimeResult<()> {
        let (module, method) = ctx.method();
        let fee = self.config.method_fee(module, method).fee();
        if fee == 0 {
            return Ok(());
        }
        let sender = *ctx.sender();
        move_balance(ctx, &sender, &self.config.fee_recipient, fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::balances::balance_path;
    use crate::runtime::context::PreFilledState;
    use tessera_primitives::{MethodId, NetworkState, RuntimeTransaction, ZERO_HASH};

    fn tx(sender: Address, nonce: u64) -> RuntimeTransaction {
        RuntimeTransaction {
            method_id: MethodId(1),
            sender,
            nonce,
            args_hash: ZERO_HASH,
        }
    }

    #[test]
    fn test_method_fee_formula() {
        let fee = MethodFee {
            base_fee: 10,
            weight: 3,
            per_weight_unit_fee: 4,
        };
        assert_eq!(fee.fee(), 22);

        let huge = MethodFee {
            base_fee: 1,
            weight: u64::MAX,
            per_weight_unit_fee: 2,
        };
        assert_eq!(huge.fee(), u64::MAX);
    }

    #[test]
    fn test_fee_config_lookup() {
        let mut config = FeeConfig::default();
        config.default.base_fee = 1;
        config.methods.insert(
            "Balances.transfer".into(),
            MethodFee {
                base_fee: 5,
                ..MethodFee::default()
            },
        );
        assert_eq!(config.method_fee("Balances", "transfer").fee(), 5);
        assert_eq!(config.method_fee("Balances", "other").fee(), 1);
    }

    #[test]
    fn test_fee_hook_pays_recipient() {
        let (a, recipient) = ([1u8; 32], [7u8; 32]);
        let state = PreFilledState::from_entries(vec![
            (balance_path(&a), Some(100u64.to_le_bytes().to_vec())),
            (balance_path(&recipient), None),
        ]);
        let hook = TransactionFeeHook::new(FeeConfig {
            fee_recipient: recipient,
            default: MethodFee {
                base_fee: 2,
                weight: 4,
                per_weight_unit_fee: 2,
            },
            methods: BTreeMap::new(),
        });
        let mut ctx = RuntimeContext::new(&state, NetworkState::empty(), tx(a, 0), "Balances", "transfer");

        hook.before_transaction(&mut ctx).unwrap();
        assert_eq!(ctx.get_u64(&balance_path(&a)).unwrap(), 90);
        assert_eq!(ctx.get_u64(&balance_path(&recipient)).unwrap(), 10);
    }

    #[test]
    fn test_fee_hook_insufficient_balance() {
        let a = [1u8; 32];
        let state = PreFilledState::from_entries(vec![(balance_path(&a), None)]);
        let mut config = FeeConfig::default();
        config.default.base_fee = 1;
        let hook = TransactionFeeHook::new(config);
        let mut ctx = RuntimeContext::new(&state, NetworkState::empty(), tx(a, 0), "Balances", "transfer");

        assert!(matches!(
            hook.before_transaction(&mut ctx),
            Err(RuntimeError::InsufficientBalance { needed: 1, available: 0 })
        ));
    }

    #[test]
    fn test_nonce_hook_increments() {
        let a = [1u8; 32];
        let state = PreFilledState::from_entries(vec![(nonce_path(&a), Some(3u64.to_le_bytes().to_vec()))]);
        let mut ctx = RuntimeContext::new(&state, NetworkState::empty(), tx(a, 3), "Balances", "transfer");

        NonceHook.before_transaction(&mut ctx).unwrap();
        assert_eq!(ctx.get_u64(&nonce_path(&a)).unwrap(), 4);
    }

    #[test]
    fn test_fee_config_from_json() {
        let json = r#"{"default":{"base_fee":3},"methods":{"Balances.transfer":{"weight":2,"per_weight_unit_fee":5}}}"#;
        let config: FeeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.default.fee(), 3);
        assert_eq!(config.method_fee("Balances", "transfer").fee(), 10);
    }
}
