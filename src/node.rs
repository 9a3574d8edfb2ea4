//! Composition root: wires config, chain, miner, and ledger into one node.

use crate::blockchain::Blockchain;
use crate::config::{load_config, Config};
use crate::crypto::{public_key_from_hex, PublicKeyBytes};
use crate::error::ChainError;
use crate::history::LoggingObserver;
use crate::ledger::AsyncLedger;
use crate::transaction::{Transaction, ZERO_KEY};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Node {
    pub config: Config,
    chain: Arc<RwLock<Blockchain>>,
    ledger: AsyncLedger,
}

impl Node {
    /// Loads `emberchain.toml`, initializes logging, and boots a node.
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let config = load_config()?;

        tracing_subscriber::fmt::init();

        Ok(Self::with_config(config)?)
    }

    /// Boots a node from an already-loaded config, without touching the
    /// global logging subscriber.
    pub fn with_config(config: Config) -> Result<Self, ChainError> {
        info!(
            "Starting emberchain node (difficulty = {})",
            config.chain.difficulty
        );

        // The genesis record pays the configured beneficiary from the zero
        // key; with no beneficiary it is the default self-payment.
        let beneficiary = if config.chain.genesis_beneficiary.is_empty() {
            ZERO_KEY
        } else {
            match public_key_from_hex(&config.chain.genesis_beneficiary) {
                Ok(key) => key,
                Err(reason) => {
                    warn!(
                        "Ignoring chain.genesis_beneficiary: {}. Using the zero key.",
                        reason
                    );
                    ZERO_KEY
                }
            }
        };
        let genesis = Transaction::new(ZERO_KEY, beneficiary, config.chain.genesis_funds);

        let chain = Arc::new(RwLock::new(Blockchain::with_genesis_payload(
            genesis.encode(),
            config.chain.difficulty,
        )?));
        let ledger = AsyncLedger::new(
            Arc::clone(&chain),
            vec![Box::new(LoggingObserver)],
            None,
        )?;

        Ok(Node {
            config,
            chain,
            ledger,
        })
    }

    /// Queues a serialized transaction payload; returns the job id. The
    /// accept/reject decision happens when the mining worker dequeues it.
    pub fn submit_payload(&self, payload: Vec<u8>) -> u64 {
        self.ledger.submit(payload)
    }

    /// Blocks until the given job and every job before it has been
    /// processed.
    pub fn wait_for(&self, job_id: u64) {
        self.ledger.wait_for(job_id);
    }

    /// The whole chain as its JSON document, for any consumer that wants to
    /// replay or re-serve it.
    pub fn serialized_chain(&self) -> Result<String, ChainError> {
        self.chain.read().serialize()
    }

    /// Balance of `key` as of the last processed job.
    pub fn balance(&self, key: &PublicKeyBytes) -> i64 {
        self.ledger.balance(key)
    }

    pub fn chain(&self) -> Arc<RwLock<Blockchain>> {
        Arc::clone(&self.chain)
    }

    /// Drains the mining queue and stops the worker.
    pub fn shutdown(self) {
        info!("Shutting down emberchain node");
        self.ledger.shutdown();
    }
}
