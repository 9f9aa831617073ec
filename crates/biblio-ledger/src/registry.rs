use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use biblio_store::RecordStore;
use biblio_types::{function, TxIntent};
use tracing::debug;

use crate::contract::{PublicationContract, CONTRACT_NAME};
use crate::error::{ContractError, ContractResult};

/// A transaction body: positional string arguments in, payload bytes out.
pub type Handler =
    Box<dyn Fn(&dyn RecordStore, &[String]) -> ContractResult<Vec<u8>> + Send + Sync>;

/// One registered transaction.
pub struct TransactionDef {
    name: String,
    intent: TxIntent,
    arity: usize,
    handler: Handler,
}

impl TransactionDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Peers refuse to endorse an `Evaluate` transaction that writes.
    pub fn intent(&self) -> TxIntent {
        self.intent
    }

    pub fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Debug for TransactionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionDef")
            .field("name", &self.name)
            .field("intent", &self.intent)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Explicit name → transaction table, built once when a peer starts.
#[derive(Debug)]
pub struct ContractRegistry {
    contract_name: String,
    transactions: BTreeMap<String, TransactionDef>,
}

impl ContractRegistry {
    pub fn new(contract_name: impl Into<String>) -> Self {
        Self {
            contract_name: contract_name.into(),
            transactions: BTreeMap::new(),
        }
    }

    /// Register a transaction. A later registration under the same name
    /// replaces the earlier one.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        intent: TxIntent,
        arity: usize,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&dyn RecordStore, &[String]) -> ContractResult<Vec<u8>> + Send + Sync + 'static,
    {
        let name = name.into();
        self.transactions.insert(
            name.clone(),
            TransactionDef {
                name,
                intent,
                arity,
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Install the same transactions under a different contract name.
    pub fn named(mut self, contract_name: impl Into<String>) -> Self {
        self.contract_name = contract_name.into();
        self
    }

    pub fn contract_name(&self) -> &str {
        &self.contract_name
    }

    pub fn get(&self, name: &str) -> Option<&TransactionDef> {
        self.transactions.get(name)
    }

    pub fn intent_of(&self, name: &str) -> ContractResult<TxIntent> {
        self.get(name)
            .map(TransactionDef::intent)
            .ok_or_else(|| ContractError::UnknownFunction(name.to_string()))
    }

    /// Registered transaction names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transactions.keys().map(String::as_str)
    }

    /// Dispatch `function` against `store` after checking its arity.
    pub fn invoke(
        &self,
        store: &dyn RecordStore,
        function: &str,
        args: &[String],
    ) -> ContractResult<Vec<u8>> {
        let def = self
            .get(function)
            .ok_or_else(|| ContractError::UnknownFunction(function.to_string()))?;
        if args.len() != def.arity {
            return Err(ContractError::IncorrectArgumentCount {
                function: function.to_string(),
                expected: def.arity,
                actual: args.len(),
            });
        }
        debug!(contract = %self.contract_name, function, intent = ?def.intent, "invoke");
        (def.handler)(store, args)
    }

    /// Registry exposing every [`PublicationContract`] operation under its
    /// wire name. Results are JSON: records and lists as their canonical
    /// encoding, `existsById` as a bare boolean, and an empty payload for
    /// `initLedger` and `deletePublication`.
    pub fn publication(contract: PublicationContract) -> Self {
        let contract = Arc::new(contract);
        let mut registry = Self::new(CONTRACT_NAME);

        let c = Arc::clone(&contract);
        registry.register(function::INIT_LEDGER, TxIntent::Submit, 0, move |store, _| {
            c.init_ledger(store)?;
            Ok(Vec::new())
        });

        let c = Arc::clone(&contract);
        registry.register(function::GET_ALL, TxIntent::Evaluate, 0, move |store, _| {
            Ok(serde_json::to_vec(&c.get_all(store)?)?)
        });

        let c = Arc::clone(&contract);
        registry.register(function::EXISTS_BY_ID, TxIntent::Evaluate, 1, move |store, args| {
            Ok(serde_json::to_vec(&c.exists_by_id(store, &args[0])?)?)
        });

        let c = Arc::clone(&contract);
        registry.register(
            function::CREATE_PUBLICATION,
            TxIntent::Submit,
            2,
            move |store, args| Ok(c.create_publication(store, &args[0], &args[1])?.to_canonical_json()?),
        );

        let c = Arc::clone(&contract);
        registry.register(
            function::UPDATE_PUBLICATION,
            TxIntent::Submit,
            2,
            move |store, args| Ok(c.update_publication(store, &args[0], &args[1])?.to_canonical_json()?),
        );

        let c = Arc::clone(&contract);
        registry.register(function::DELETE_PUBLICATION, TxIntent::Submit, 1, move |store, args| {
            c.delete_publication(store, &args[0])?;
            Ok(Vec::new())
        });

        let c = contract;
        registry.register(function::GET_HISTORY, TxIntent::Evaluate, 1, move |store, args| {
            Ok(serde_json::to_vec(&c.get_history(store, &args[0])?)?)
        });

        registry
    }
}
