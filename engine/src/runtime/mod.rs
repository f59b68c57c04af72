//! The state-transition runtime.
//!
//! A [`Runtime`] is a set of [`RuntimeModule`]s plus the
//! [`TransactionHook`]s that run before every method. Executing a
//! transaction is synchronous and deterministic: it reads state through a
//! [`StateReader`], and its only effect is the list of state transitions
//! it records. Persisting those transitions is the caller's business.
//!
//! Per transaction:
//! 1. Resolve the method id to `(module, method)`
//! 2. Run every hook; a failing hook rejects the transaction
//! 3. Run the method; a failing method keeps the hook effects, drops its
//!    own, and yields `status = false`
//!
//! A read of state the reader has not loaded aborts the attempt and
//! reports the paths, so the caller can preload them and try again.

pub mod balances;
pub mod context;
pub mod hooks;

use std::collections::BTreeMap;
use std::sync::Arc;

use tessera_primitives::{Hash, MethodId, NetworkState, RuntimeTransaction, StateTransition};
use tracing::trace;

use crate::error::{RuntimeError, RuntimeResult};

pub use balances::Balances;
pub use context::{state_path, PreFilledState, RuntimeContext, StateReader};
pub use hooks::{FeeConfig, MethodFee, NonceHook, TransactionFeeHook};

/// A named group of methods callable by transactions.
pub trait RuntimeModule: Send + Sync {
    fn name(&self) -> &'static str;

    fn methods(&self) -> &'static [&'static str];

    fn dispatch(&self, method: &str, ctx: &mut RuntimeContext<'_>, args: &[u8]) -> RuntimeResult<()>;
}

/// Logic run before every transaction's method.
pub trait TransactionHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn before_transaction(&self, ctx: &mut RuntimeContext<'_>) -> RuntimeResult<()>;
}

/// Two-way mapping between method ids and `(module, method)` names.
#[derive(Debug, Clone, Default)]
pub struct MethodIdResolver {
    by_id: BTreeMap<MethodId, (String, String)>,
    modules: BTreeMap<String, Vec<String>>,
}

impl MethodIdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: &str, methods: &[&str]) {
        for method in methods {
            self.by_id.insert(
                MethodId::from_names(module, method),
                (module.to_string(), method.to_string()),
            );
        }
        self.modules
            .entry(module.to_string())
            .or_default()
            .extend(methods.iter().map(|m| m.to_string()));
    }

    /// Identifier of `module.method`, failing for names never registered.
    pub fn get_method_id(&self, module: &str, method: &str) -> RuntimeResult<MethodId> {
        let methods = self
            .modules
            .get(module)
            .ok_or_else(|| RuntimeError::UnknownModule(module.to_string()))?;
        if !methods.iter().any(|m| m == method) {
            return Err(RuntimeError::UnknownMethod {
                module: module.to_string(),
                method: method.to_string(),
            });
        }
        Ok(MethodId::from_names(module, method))
    }

    pub fn get_method_name_from_id(&self, id: MethodId) -> Option<(&str, &str)> {
        self.by_id
            .get(&id)
            .map(|(module, method)| (module.as_str(), method.as_str()))
    }
}

/// Outcome of a completed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodExecution {
    pub status: bool,
    pub status_message: Option<String>,
    pub state_transitions: Vec<StateTransition>,
    /// First value observed for every path read from the reader.
    pub pre_state: BTreeMap<Hash, Option<Vec<u8>>>,
}

impl MethodExecution {
    /// Final value of every written path, in path order.
    pub fn writes(&self) -> BTreeMap<Hash, Vec<u8>> {
        let mut out = BTreeMap::new();
        for st in &self.state_transitions {
            if let Some(to) = &st.to {
                out.insert(st.path, to.clone());
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionAttempt {
    Complete(MethodExecution),
    /// A hook failed; the transaction must not be included.
    Rejected { hook: &'static str, reason: RuntimeError },
    /// State the reader did not have; preload and retry.
    NeedsState(Vec<Hash>),
}

#[derive(Default)]
pub struct Runtime {
    modules: BTreeMap<&'static str, Arc<dyn RuntimeModule>>,
    hooks: Vec<Arc<dyn TransactionHook>>,
    resolver: MethodIdResolver,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balances module behind the nonce and fee hooks.
    pub fn with_defaults(fees: FeeConfig) -> Self {
        Self::new()
            .with_module(Arc::new(Balances))
            .with_hook(Arc::new(NonceHook))
            .with_hook(Arc::new(TransactionFeeHook::new(fees)))
    }

    pub fn with_module(mut self, module: Arc<dyn RuntimeModule>) -> Self {
        self.resolver.register(module.name(), module.methods());
        self.modules.insert(module.name(), module);
        self
    }

    /// Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn TransactionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn resolver(&self) -> &MethodIdResolver {
        &self.resolver
    }

    pub fn is_known_method(&self, id: MethodId) -> bool {
        self.resolver.get_method_name_from_id(id).is_some()
    }

    pub fn try_execute(
        &self,
        reader: &dyn StateReader,
        transaction: &RuntimeTransaction,
        args: &[u8],
        network_state: &NetworkState,
    ) -> RuntimeResult<ExecutionAttempt> {
        let (module_name, method) = self
            .resolver
            .get_method_name_from_id(transaction.method_id)
            .ok_or(RuntimeError::UnknownMethodId(transaction.method_id))?;
        let module = self
            .modules
            .get(module_name)
            .ok_or_else(|| RuntimeError::UnknownModule(module_name.to_string()))?;

        let mut ctx = RuntimeContext::new(reader, *network_state, *transaction, module_name, method);

        for hook in &self.hooks {
            if let Err(reason) = hook.before_transaction(&mut ctx) {
                if ctx.has_missing() {
                    return Ok(ExecutionAttempt::NeedsState(ctx.into_parts().missing));
                }
                trace!(hook = hook.name(), %reason, "hook rejected transaction");
                return Ok(ExecutionAttempt::Rejected {
                    hook: hook.name(),
                    reason,
                });
            }
        }

        let checkpoint = ctx.checkpoint();
        let result = module.dispatch(method, &mut ctx, args);
        if ctx.has_missing() {
            return Ok(ExecutionAttempt::NeedsState(ctx.into_parts().missing));
        }

        let (status, status_message) = match result {
            Ok(()) => (true, None),
            Err(e) => {
                ctx.rollback(checkpoint);
                (false, Some(e.to_string()))
            }
        };

        let parts = ctx.into_parts();
        Ok(ExecutionAttempt::Complete(MethodExecution {
            status,
            status_message,
            state_transitions: parts.transitions,
            pre_state: parts.pre_state,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::balances::{balance_path, nonce_path, transfer_args};
    use tessera_primitives::ZERO_HASH;

    fn runtime() -> Runtime {
        Runtime::with_defaults(FeeConfig::default())
    }

    fn transfer(sender: Hash, nonce: u64, to: Hash, amount: u64) -> (RuntimeTransaction, Vec<u8>) {
        let args = transfer_args(&to, amount);
        let tx = RuntimeTransaction {
            method_id: MethodId::from_names("Balances", "transfer"),
            sender,
            nonce,
            args_hash: ZERO_HASH,
        };
        (tx, args)
    }

    #[test]
    fn test_resolver_round_trip() {
        let rt = runtime();
        let id = rt.resolver().get_method_id("Balances", "transfer").unwrap();
        assert_eq!(rt.resolver().get_method_name_from_id(id), Some(("Balances", "transfer")));
        assert!(rt.is_known_method(id));
    }

    #[test]
    fn test_resolver_unknown_names() {
        let rt = runtime();
        assert_eq!(
            rt.resolver().get_method_id("Nope", "transfer"),
            Err(RuntimeError::UnknownModule("Nope".into()))
        );
        assert!(matches!(
            rt.resolver().get_method_id("Balances", "nope"),
            Err(RuntimeError::UnknownMethod { .. })
        ));
        assert!(rt.resolver().get_method_name_from_id(MethodId(0)).is_none());
    }

    #[test]
    fn test_missing_state_is_requested() {
        let rt = runtime();
        let (tx, args) = transfer([1u8; 32], 0, [2u8; 32], 5);
        let empty = PreFilledState::default();

        let attempt = rt.try_execute(&empty, &tx, &args, &NetworkState::empty()).unwrap();
        assert_eq!(attempt, ExecutionAttempt::NeedsState(vec![nonce_path(&[1u8; 32])]));
    }

    #[test]
    fn test_successful_transfer() {
        let rt = runtime();
        let (a, b) = ([1u8; 32], [2u8; 32]);
        let state = PreFilledState::from_entries(vec![
            (nonce_path(&a), None),
            (balance_path(&a), Some(100u64.to_le_bytes().to_vec())),
            (balance_path(&b), None),
        ]);
        let (tx, args) = transfer(a, 0, b, 30);

        let ExecutionAttempt::Complete(exec) =
            rt.try_execute(&state, &tx, &args, &NetworkState::empty()).unwrap()
        else {
            panic!("expected completion");
        };
        assert!(exec.status);
        let writes = exec.writes();
        assert_eq!(writes.get(&balance_path(&a)), Some(&70u64.to_le_bytes().to_vec()));
        assert_eq!(writes.get(&balance_path(&b)), Some(&30u64.to_le_bytes().to_vec()));
        assert_eq!(writes.get(&nonce_path(&a)), Some(&1u64.to_le_bytes().to_vec()));
    }

    #[test]
    fn test_failed_method_keeps_hook_effects() {
        let rt = runtime();
        let (a, b) = ([1u8; 32], [2u8; 32]);
        let state = PreFilledState::from_entries(vec![
            (nonce_path(&a), None),
            (balance_path(&a), Some(10u64.to_le_bytes().to_vec())),
            (balance_path(&b), None),
        ]);
        let (tx, args) = transfer(a, 0, b, 30);

        let ExecutionAttempt::Complete(exec) =
            rt.try_execute(&state, &tx, &args, &NetworkState::empty()).unwrap()
        else {
            panic!("expected completion");
        };
        assert!(!exec.status);
        assert!(exec
            .status_message
            .as_deref()
            .unwrap()
            .contains("insufficient balance"));
        let writes = exec.writes();
        assert_eq!(writes.len(), 1);
        assert!(writes.contains_key(&nonce_path(&a)));
    }

    #[test]
    fn test_wrong_nonce_is_rejected() {
        let rt = runtime();
        let a = [1u8; 32];
        let state = PreFilledState::from_entries(vec![(nonce_path(&a), None)]);
        let (tx, args) = transfer(a, 4, [2u8; 32], 1);

        let attempt = rt.try_execute(&state, &tx, &args, &NetworkState::empty()).unwrap();
        assert_eq!(
            attempt,
            ExecutionAttempt::Rejected {
                hook: "nonce",
                reason: RuntimeError::InvalidNonce { expected: 0, got: 4 },
            }
        );
    }

    #[test]
    fn test_unknown_method_id() {
        let rt = runtime();
        let tx = RuntimeTransaction {
            method_id: MethodId(42),
            sender: [1u8; 32],
            nonce: 0,
            args_hash: ZERO_HASH,
        };
        let err = rt
            .try_execute(&PreFilledState::default(), &tx, &[], &NetworkState::empty())
            .unwrap_err();
        assert_eq!(err, RuntimeError::UnknownMethodId(MethodId(42)));
    }
}
