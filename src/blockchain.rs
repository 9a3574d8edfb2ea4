// Thin re-export module: block structure and proof-of-work targets live in
// `blockchain/block.rs`, the append-only chain container and its integrity
// checks in `blockchain/chain.rs`.

pub mod block;
pub mod chain;

pub use block::*;
pub use chain::*;
