//! Stock transaction observers for wallet-side consumers.

use crate::blockchain::Blockchain;
use crate::crypto::PublicKeyBytes;
use crate::error::ChainError;
use crate::ledger::{Ledger, TransactionObserver};
use crate::transaction::Transaction;
use parking_lot::{Mutex, RwLock};
use std::fmt::Write;
use std::sync::Arc;
use tracing::info;

/// Logs every admitted transaction.
pub struct LoggingObserver;

impl TransactionObserver for LoggingObserver {
    fn transaction_admitted(&self, transaction: &Transaction) {
        info!("Admitted {}", transaction);
    }
}

/// Accumulates every admitted transaction for later rendering and
/// per-wallet balance projection.
///
/// Clones share the same underlying record, so a caller can keep one handle
/// and register another with a ledger.
#[derive(Clone, Default)]
pub struct TransactionHistory {
    transactions: Arc<Mutex<Vec<Transaction>>>,
}

impl TransactionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// One admitted transaction per line, in admission order.
    pub fn render_log(&self) -> String {
        let transactions = self.transactions.lock();
        let mut log = String::new();
        for transaction in transactions.iter() {
            let _ = writeln!(log, "{}", transaction);
        }
        log
    }

    /// Projects `wallet`'s balance from the recorded transactions.
    ///
    /// The credit arm is checked first so the genesis self-payment reads as
    /// a deposit rather than cancelling itself out.
    pub fn balance_of(&self, wallet: &PublicKeyBytes) -> i64 {
        let transactions = self.transactions.lock();
        let mut balance = 0;
        for transaction in transactions.iter() {
            if &transaction.receiver == wallet {
                balance += transaction.amount;
            } else if &transaction.sender == wallet {
                balance -= transaction.amount;
            }
        }
        balance
    }

    pub fn len(&self) -> usize {
        self.transactions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.lock().is_empty()
    }
}

impl TransactionObserver for TransactionHistory {
    fn transaction_admitted(&self, transaction: &Transaction) {
        self.transactions.lock().push(transaction.clone());
    }
}

/// Replays `chain` with a history observer and reports `wallet`'s balance.
/// The wallet-side "what do I own" query, minus any transport.
pub fn balance_for(
    chain: &Arc<RwLock<Blockchain>>,
    wallet: &PublicKeyBytes,
) -> Result<i64, ChainError> {
    let history = TransactionHistory::new();
    Ledger::from_chain(Arc::clone(chain), vec![Box::new(history.clone())])?;
    Ok(history.balance_of(wallet))
}
