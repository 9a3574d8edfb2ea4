//! emberchain - A minimal single-node proof-of-work coin engine
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Chain
//! - [`blockchain`] - Block structure, proof-of-work targets, and the
//!   append-only chain with its integrity checks
//! - [`transaction`] - Transaction records, the signed envelope, and
//!   admission checks
//!
//! ## Consensus & Mining
//! - [`miner`] - Nonce search and the background mining worker
//!
//! ## Ledger & Accounts
//! - [`ledger`] - Balance views replayed from the chain and the admission
//!   policy, synchronous and miner-backed
//! - [`history`] - Stock transaction observers and wallet-side balance
//!   queries
//!
//! ## Cryptography
//! - [`crypto`] - Hashing, key pairs, and signature verification (secp256k1)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`node`] - Composition root wiring the pieces into one node

#![forbid(unsafe_code)]

// ============================================================================
// Core Chain
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Ledger & Accounts
// ============================================================================
pub mod history;
pub mod ledger;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod node;
