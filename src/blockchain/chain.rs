use crate::blockchain::block::Block;
use crate::crypto::Sha256Hash;
use crate::error::ChainError;
use crate::miner::mine_nonce;
use crate::transaction::{Transaction, ZERO_KEY};

/// Funds created by the default self-paying genesis record.
pub const GENESIS_FUNDS: i64 = 50;

/// An append-only list of mined blocks plus the difficulty every block on
/// this chain must satisfy. The difficulty is fixed at construction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub difficulty: u32,
}

impl Blockchain {
    /// Create a new chain seeded with the default self-paying genesis record
    /// (the zero key paying itself [`GENESIS_FUNDS`]).
    pub fn new(difficulty: u32) -> Result<Self, ChainError> {
        let genesis = Transaction::new(ZERO_KEY, ZERO_KEY, GENESIS_FUNDS);
        Self::with_genesis_payload(genesis.encode(), difficulty)
    }

    /// Create a new chain whose genesis block carries a caller-supplied
    /// payload. The genesis block is mined like any other block.
    pub fn with_genesis_payload(payload: Vec<u8>, difficulty: u32) -> Result<Self, ChainError> {
        let mut chain = Blockchain {
            blocks: Vec::new(),
            difficulty,
        };
        chain.append_payload(payload)?;
        Ok(chain)
    }

    /// Mines a nonce for `payload` against the current tip, then appends the
    /// resulting block. This is the synchronous mining path; the background
    /// worker in [`crate::miner`] goes through [`Blockchain::append`] instead.
    pub fn append_payload(&mut self, payload: Vec<u8>) -> Result<(), ChainError> {
        let parent_hash = self.blocks.last().map(|block| block.hash);
        let nonce = mine_nonce(&payload, parent_hash.as_ref(), self.difficulty)?;
        self.blocks.push(Block::new(payload, nonce, parent_hash.as_ref()));
        Ok(())
    }

    /// Appends a block with no validation. Callers guarantee linkage and
    /// proof-of-work; [`Blockchain::validate`] is the safety net.
    pub fn append(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Hash of the block preceding `index`: `None` for the genesis block and
    /// for indexes beyond the chain.
    pub fn parent_hash(&self, index: usize) -> Option<Sha256Hash> {
        if index == 0 {
            return None;
        }
        self.blocks.get(index - 1).map(|block| block.hash)
    }

    /// Hash of the last block.
    ///
    /// # Panics
    ///
    /// Panics if the chain has no blocks. Every constructor seeds a genesis
    /// block, so an empty chain means an internal invariant was broken.
    pub fn tip_hash(&self) -> Sha256Hash {
        self.blocks
            .last()
            .map(|block| block.hash)
            .expect("chain has no blocks; every constructor seeds a genesis block")
    }

    pub fn length(&self) -> usize {
        self.blocks.len()
    }

    /// Invokes `visitor` with `(index, block)` from genesis to tip. A visitor
    /// error aborts the walk and propagates as [`ChainError::WalkFailed`]
    /// wrapping the cause.
    pub fn walk<V>(&self, mut visitor: V) -> Result<(), ChainError>
    where
        V: FnMut(usize, &Block) -> Result<(), ChainError>,
    {
        for (index, block) in self.blocks.iter().enumerate() {
            if let Err(cause) = visitor(index, block) {
                return Err(match cause {
                    ChainError::WalkFailed(_) => cause,
                    other => ChainError::WalkFailed(Box::new(other)),
                });
            }
        }
        Ok(())
    }

    /// Checks every block's stored hash against the hash recomputed from its
    /// parent, payload, and nonce, and independently checks that the stored
    /// hash meets the difficulty target. The independence matters: a block
    /// whose nonce was reset and hash dutifully recomputed still fails.
    pub fn validate(&self) -> Result<(), ChainError> {
        let target = Block::difficulty_target(self.difficulty);
        for (index, block) in self.blocks.iter().enumerate() {
            let parent_hash = self.parent_hash(index);
            let expected = Block::content_hash(parent_hash.as_ref(), &block.payload, block.nonce);

            if block.hash != expected {
                return Err(ChainError::IntegrityFailure(format!(
                    "Block {} ({} byte payload): expected hash {}, but the stored hash was instead {}",
                    index,
                    block.payload.len(),
                    hex::encode(expected),
                    hex::encode(block.hash)
                )));
            }

            if !Block::meets_target(&block.hash, &target) {
                return Err(ChainError::IntegrityFailure(format!(
                    "Block {} ({} byte payload): hash {} does not meet the difficulty {} target {}",
                    index,
                    block.payload.len(),
                    hex::encode(block.hash),
                    self.difficulty,
                    hex::encode(target)
                )));
            }
        }
        Ok(())
    }

    /// Serializes the chain as a JSON document of blocks plus difficulty.
    pub fn serialize(&self) -> Result<String, ChainError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a chain from its JSON document and re-validates it. A document
    /// that parses but fails [`Blockchain::validate`] never reaches callers.
    pub fn deserialize(document: &str) -> Result<Self, ChainError> {
        let chain: Blockchain = serde_json::from_str(document)?;
        chain.validate()?;
        Ok(chain)
    }
}
