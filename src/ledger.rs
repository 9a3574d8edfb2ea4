//! Balance views over a chain and the transaction admission policy.
//!
//! A [`Ledger`] is a disposable view: it replays every transaction on the
//! chain into a balance map, rejecting the replay outright if any block
//! carries an illegal transaction. [`AsyncLedger`] layers the same admission
//! policy over the background miner, deciding admission on the worker thread
//! against the chain state at mining time rather than at submission time.

use crate::blockchain::Blockchain;
use crate::crypto::PublicKeyBytes;
use crate::error::ChainError;
use crate::miner::{BlockMiner, MiningObserver, PayloadValidator};
use crate::transaction::{SignedObject, Transaction};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Who owns how many embers, keyed by exact public key bytes. An absent
/// entry reads as a zero balance.
pub type BalanceMap = HashMap<PublicKeyBytes, i64>;

/// Notified for every transaction a ledger admits, during replay and on
/// successful submission alike. Used to build transaction histories and
/// balance projections for wallet-side consumers.
pub trait TransactionObserver: Send + Sync {
    fn transaction_admitted(&self, transaction: &Transaction);
}

/// Decodes one block payload, runs the admission checks against `balances`,
/// and on success applies the transfer and notifies the observers. The
/// shared admission path for replay, synchronous submission, and the
/// miner-side validator.
fn admit_payload(
    payload: &[u8],
    genesis: bool,
    balances: &mut BalanceMap,
    observers: &[Box<dyn TransactionObserver>],
) -> Result<(), ChainError> {
    let transaction = Transaction::decode(payload)?;

    balances.entry(transaction.sender).or_insert(0);
    balances.entry(transaction.receiver).or_insert(0);

    transaction.validate_against(balances, genesis)?;

    *balances.entry(transaction.sender).or_insert(0) -= transaction.amount;
    *balances.entry(transaction.receiver).or_insert(0) += transaction.amount;

    for observer in observers {
        observer.transaction_admitted(&transaction);
    }
    Ok(())
}

/// A balance view replayed from a chain, with synchronous submission.
///
/// The view validates individual transactions so nobody spends money they do
/// not own; whether the *sequence* of blocks is well-formed is
/// [`Blockchain::validate`]'s job, checked when a downloaded chain is loaded.
pub struct Ledger {
    chain: Arc<RwLock<Blockchain>>,
    balances: BalanceMap,
    observers: Vec<Box<dyn TransactionObserver>>,
}

impl Ledger {
    /// Replays `chain` from genesis into a fresh balance map.
    ///
    /// Each block's payload is decoded as a transaction and admitted in
    /// order; the genesis block alone is exempt from the
    /// balance-sufficiency rule, since it is where money comes from. Any
    /// illegal transaction aborts the replay as [`ChainError::WalkFailed`]
    /// wrapping the cause, and no ledger is produced.
    pub fn from_chain(
        chain: Arc<RwLock<Blockchain>>,
        observers: Vec<Box<dyn TransactionObserver>>,
    ) -> Result<Self, ChainError> {
        let mut balances = BalanceMap::new();
        {
            let guard = chain.read();
            guard.walk(|index, block| {
                admit_payload(&block.payload, index == 0, &mut balances, &observers)
            })?;
        }

        Ok(Ledger {
            chain,
            balances,
            observers,
        })
    }

    /// Attempts to append `transaction` to the underlying chain.
    ///
    /// Runs the full admission check against the current balance view; on
    /// success the payload is mined inline onto the chain and the view is
    /// updated. Failure is a silent `false` with no state change: once the
    /// chain is the source of truth, a transaction that was never mined is
    /// indistinguishable from one that never existed.
    pub fn submit(&mut self, transaction: &Transaction) -> bool {
        // Hold the write lock across check-then-append so readers never see
        // the chain and this view disagree.
        let mut chain = self.chain.write();

        if let Err(reason) = transaction.validate_against(&self.balances, false) {
            info!("Rejecting transaction {}: {}", transaction, reason);
            return false;
        }

        if let Err(reason) = chain.append_payload(transaction.encode()) {
            warn!("Could not mine a block for {}: {}", transaction, reason);
            return false;
        }

        *self.balances.entry(transaction.sender).or_insert(0) -= transaction.amount;
        *self.balances.entry(transaction.receiver).or_insert(0) += transaction.amount;

        for observer in &self.observers {
            observer.transaction_admitted(transaction);
        }
        true
    }

    /// Current balance of `key`; zero when the key has never appeared.
    pub fn balance(&self, key: &PublicKeyBytes) -> i64 {
        self.balances.get(key).copied().unwrap_or(0)
    }

    pub fn balances(&self) -> &BalanceMap {
        &self.balances
    }
}

/// The miner-side admission gate: shares the async ledger's balance map and
/// observers, and runs the same checks as replay, on the worker thread.
struct DeferredAdmission {
    balances: Arc<Mutex<BalanceMap>>,
    observers: Arc<Vec<Box<dyn TransactionObserver>>>,
}

impl PayloadValidator for DeferredAdmission {
    fn validate(&self, payload: &[u8], chain_length: usize) -> bool {
        let mut balances = self.balances.lock();
        match admit_payload(payload, chain_length == 0, &mut balances, &self.observers) {
            Ok(()) => true,
            Err(reason) => {
                info!("Rejecting transaction: {}", reason);
                false
            }
        }
    }

    fn on_mining_failure(&self, payload: &[u8]) {
        match Transaction::decode(payload) {
            Ok(transaction) => warn!(
                "Could not find a nonce to mine a block for {}, sorry",
                transaction
            ),
            Err(_) => warn!(
                "Could not find a nonce to mine a block for a {} byte payload",
                payload.len()
            ),
        }
    }
}

/// A ledger whose submissions go through the background miner.
///
/// `submit` returns a job id immediately; the authoritative admission
/// decision runs inside the miner's validator callback, against the chain
/// state at the moment the job is dequeued. The balance map is shared with
/// those callbacks and only ever written on the worker thread.
pub struct AsyncLedger {
    miner: BlockMiner,
    balances: Arc<Mutex<BalanceMap>>,
    observers: Arc<Vec<Box<dyn TransactionObserver>>>,
}

impl AsyncLedger {
    /// Replays `chain` into a shared balance map and spawns the mining
    /// worker over it. Fails like [`Ledger::from_chain`] when the chain
    /// carries an illegal transaction.
    pub fn new(
        chain: Arc<RwLock<Blockchain>>,
        observers: Vec<Box<dyn TransactionObserver>>,
        mining_observer: Option<Box<dyn MiningObserver>>,
    ) -> Result<Self, ChainError> {
        let mut balances = BalanceMap::new();
        {
            let guard = chain.read();
            guard.walk(|index, block| {
                admit_payload(&block.payload, index == 0, &mut balances, &observers)
            })?;
        }

        let miner = BlockMiner::new(chain, mining_observer);

        Ok(AsyncLedger {
            miner,
            balances: Arc::new(Mutex::new(balances)),
            observers: Arc::new(observers),
        })
    }

    /// Queues a serialized transaction payload for admission and mining;
    /// returns the job id without blocking. The admission checks run when
    /// the worker dequeues the job, so a payload that looks legal now may
    /// still be dropped if an earlier job in the queue spends the funds
    /// first.
    pub fn submit(&self, payload: Vec<u8>) -> u64 {
        let validator = DeferredAdmission {
            balances: Arc::clone(&self.balances),
            observers: Arc::clone(&self.observers),
        };
        self.miner.submit(payload, Some(Box::new(validator)))
    }

    /// Queues a signed envelope; the combined wire form decodes directly as
    /// a transaction with its embedded signature.
    pub fn submit_signed(&self, blob: &SignedObject) -> u64 {
        self.submit(blob.to_bytes())
    }

    /// Blocks until the given job and every job before it has been fully
    /// processed, admitted-and-mined or dropped.
    pub fn wait_for(&self, job_id: u64) {
        self.miner.wait_for(job_id);
    }

    /// Current balance of `key` as of the last processed job.
    pub fn balance(&self, key: &PublicKeyBytes) -> i64 {
        self.balances.lock().get(key).copied().unwrap_or(0)
    }

    /// Drains the queue and joins the mining worker.
    pub fn shutdown(self) {
        self.miner.shutdown();
    }
}
