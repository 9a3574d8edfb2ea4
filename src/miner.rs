//! Proof-of-work nonce search and the background mining worker.
//!
//! [`BlockMiner`] owns a dedicated worker thread fed through an unbounded
//! FIFO channel. Payloads are mined onto the shared chain in strict
//! submission order; callers correlate submissions with completions through
//! 1-based job ids and [`BlockMiner::wait_for`].

use crate::blockchain::{Block, Blockchain};
use crate::crypto::Sha256Hash;
use crate::error::ChainError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex, RwLock};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Searches nonces from zero upward until the block content hash meets the
/// difficulty target. Returns [`ChainError::MiningExhausted`] if every nonce
/// fails, which at sane difficulties means the difficulty itself is absurd.
pub fn mine_nonce(
    payload: &[u8],
    parent_hash: Option<&Sha256Hash>,
    difficulty: u32,
) -> Result<u32, ChainError> {
    let target = Block::difficulty_target(difficulty);
    let mut nonce: u32 = 0;
    loop {
        let hash = Block::content_hash(parent_hash, payload, nonce);
        if Block::meets_target(&hash, &target) {
            return Ok(nonce);
        }
        nonce = match nonce.checked_add(1) {
            Some(next) => next,
            None => return Err(ChainError::MiningExhausted),
        };
    }
}

/// Admission gate evaluated on the worker thread right before mining.
pub trait PayloadValidator: Send {
    /// Returning `false` drops the job without extending the chain. The
    /// `chain_length` is the height the new block would be mined at.
    fn validate(&self, payload: &[u8], chain_length: usize) -> bool;

    /// Called when the nonce search exhausts the space without a solution.
    fn on_mining_failure(&self, payload: &[u8]);
}

/// Notified on the worker thread once a block has been mined, before it is
/// appended to the chain.
pub trait MiningObserver: Send {
    fn block_mined(&self, payload: &[u8]);
}

/// A queued unit of mining work.
pub struct HashJob {
    pub payload: Vec<u8>,
    pub difficulty: u32,
    pub validator: Option<Box<dyn PayloadValidator>>,
}

enum WorkerCommand {
    Mine(HashJob),
    EndOfQueue,
}

struct JobCounters {
    processed: Mutex<u64>,
    processed_changed: Condvar,
}

/// Owns the background worker that mines submitted payloads onto a shared
/// chain, one at a time, in submission order.
pub struct BlockMiner {
    chain: Arc<RwLock<Blockchain>>,
    jobs: Sender<WorkerCommand>,
    counters: Arc<JobCounters>,
    submitted: Mutex<u64>,
    worker: JoinHandle<()>,
}

impl BlockMiner {
    /// Spawns the worker thread over `chain`. The optional `observer` is
    /// invoked from the worker thread for every block it mines.
    pub fn new(chain: Arc<RwLock<Blockchain>>, observer: Option<Box<dyn MiningObserver>>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let counters = Arc::new(JobCounters {
            processed: Mutex::new(0),
            processed_changed: Condvar::new(),
        });

        let worker_chain = Arc::clone(&chain);
        let worker_counters = Arc::clone(&counters);
        let worker = std::thread::spawn(move || {
            worker_loop(worker_chain, receiver, worker_counters, observer);
        });

        BlockMiner {
            chain,
            jobs: sender,
            counters,
            submitted: Mutex::new(0),
            worker,
        }
    }

    /// Queues a payload for mining and returns its 1-based job id.
    ///
    /// Id assignment and enqueueing happen under one lock, so ids always
    /// match queue order even with concurrent submitters.
    pub fn submit(&self, payload: Vec<u8>, validator: Option<Box<dyn PayloadValidator>>) -> u64 {
        let difficulty = self.chain.read().difficulty;

        let mut submitted = self.submitted.lock();
        *submitted += 1;
        let job_id = *submitted;
        let job = HashJob {
            payload,
            difficulty,
            validator,
        };
        if self.jobs.send(WorkerCommand::Mine(job)).is_err() {
            warn!(
                "Mining worker is gone; job {} will never be processed",
                job_id
            );
        }
        job_id
    }

    /// Blocks until the job with the given id has been processed, whether it
    /// was mined or dropped by its validator.
    pub fn wait_for(&self, job_id: u64) {
        let mut processed = self.counters.processed.lock();
        while *processed < job_id {
            self.counters.processed_changed.wait(&mut processed);
        }
    }

    /// Number of jobs submitted so far; also the id of the latest job.
    pub fn submitted_jobs(&self) -> u64 {
        *self.submitted.lock()
    }

    /// Number of jobs the worker has finished with, mined or dropped.
    pub fn processed_jobs(&self) -> u64 {
        *self.counters.processed.lock()
    }

    /// Lets the worker drain every job submitted so far, then joins it.
    /// Taking `self` by value makes submit-after-shutdown unrepresentable.
    pub fn shutdown(self) {
        if self.jobs.send(WorkerCommand::EndOfQueue).is_err() {
            warn!("Mining worker is gone; nothing left to shut down");
        }
        if self.worker.join().is_err() {
            warn!("Mining worker panicked before shutdown");
        }
    }
}

fn worker_loop(
    chain: Arc<RwLock<Blockchain>>,
    queue: Receiver<WorkerCommand>,
    counters: Arc<JobCounters>,
    observer: Option<Box<dyn MiningObserver>>,
) {
    // Also exits when every sender is dropped without a sentinel.
    for command in queue.iter() {
        let job = match command {
            WorkerCommand::Mine(job) => job,
            WorkerCommand::EndOfQueue => break,
        };

        process_job(&chain, job, observer.as_deref());

        // The sentinel never reaches this point, so processed counts real
        // jobs only and wait_for(id) pairs exactly with submit's ids.
        let mut processed = counters.processed.lock();
        *processed += 1;
        counters.processed_changed.notify_all();
    }
}

fn process_job(chain: &RwLock<Blockchain>, job: HashJob, observer: Option<&dyn MiningObserver>) {
    let (parent_hash, chain_length) = {
        let chain = chain.read();
        (chain.tip_hash(), chain.length())
    };

    if let Some(validator) = &job.validator {
        if !validator.validate(&job.payload, chain_length) {
            debug!(
                "Dropping rejected payload ({} bytes) at height {}",
                job.payload.len(),
                chain_length
            );
            return;
        }
    }

    match mine_nonce(&job.payload, Some(&parent_hash), job.difficulty) {
        Ok(nonce) => {
            if let Some(observer) = observer {
                observer.block_mined(&job.payload);
            }
            chain
                .write()
                .append(Block::new(job.payload, nonce, Some(&parent_hash)));
        }
        Err(reason) => {
            warn!(
                "Mining failed for a {} byte payload: {}",
                job.payload.len(),
                reason
            );
            if let Some(validator) = &job.validator {
                validator.on_mining_failure(&job.payload);
            }
        }
    }
}
