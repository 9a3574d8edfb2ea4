use crate::crypto::{self, Sha256Hash};
use crate::error::ChainError;

/// Width of the big-endian nonce field on the wire.
pub const NONCE_SIZE: usize = 4;

/// Width of a block's content hash on the wire.
pub const HASH_SIZE: usize = 32;

/// One mined unit of the chain: an opaque payload, the nonce that satisfied
/// the difficulty target, and the content hash binding both to the parent.
///
/// Fields are public so test fixtures can corrupt blocks deliberately;
/// [`Blockchain::validate`](crate::blockchain::Blockchain::validate) is what
/// catches the corruption.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
    pub nonce: u32,
    pub hash: Sha256Hash,
}

impl Block {
    /// Builds a block whose hash is computed from the given parent, payload,
    /// and nonce. Whether the hash meets any target is the caller's business.
    pub fn new(payload: Vec<u8>, nonce: u32, parent_hash: Option<&Sha256Hash>) -> Self {
        let hash = Self::content_hash(parent_hash, &payload, nonce);
        Block {
            payload,
            nonce,
            hash,
        }
    }

    /// The one content hash: `parent_hash ‖ payload ‖ nonce`, with an empty
    /// parent contribution for the genesis block.
    pub fn content_hash(parent_hash: Option<&Sha256Hash>, payload: &[u8], nonce: u32) -> Sha256Hash {
        let parent_len = parent_hash.map_or(0, |hash| hash.len());
        let mut message = Vec::with_capacity(parent_len + payload.len() + NONCE_SIZE);
        if let Some(parent) = parent_hash {
            message.extend_from_slice(parent);
        }
        message.extend_from_slice(payload);
        message.extend_from_slice(&nonce.to_be_bytes());
        crypto::sha256(&message)
    }

    /// Derives the proof-of-work target for a difficulty: the largest hash
    /// value still acceptable, read as an unsigned 256-bit big-endian
    /// integer. Difficulty 0 is the trivial all-0xFF target that every hash
    /// meets; difficulty 256 and beyond admit only the all-zero hash.
    pub fn difficulty_target(difficulty: u32) -> [u8; 32] {
        let mut target = [0xFF; 32];
        let leading_zeros = difficulty / 8;
        let partial_bits = difficulty % 8;

        for item in target.iter_mut().take(leading_zeros as usize) {
            *item = 0;
        }

        if leading_zeros < 32 && partial_bits > 0 {
            target[leading_zeros as usize] = 0xFF >> partial_bits;
        }
        target
    }

    /// Big-endian unsigned comparison against a derived target.
    pub fn meets_target(hash: &Sha256Hash, target: &[u8; 32]) -> bool {
        hash <= target
    }

    /// Encodes the block as `payload ‖ nonce ‖ hash`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut contents = Vec::with_capacity(self.payload.len() + NONCE_SIZE + HASH_SIZE);
        contents.extend_from_slice(&self.payload);
        contents.extend_from_slice(&self.nonce.to_be_bytes());
        contents.extend_from_slice(&self.hash);
        contents
    }

    /// Decodes a block from its wire form; the payload is whatever precedes
    /// the fixed-width nonce and hash tail.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() < NONCE_SIZE + HASH_SIZE {
            return Err(ChainError::MalformedRecord(format!(
                "Block record must be at least {} bytes, got {}",
                NONCE_SIZE + HASH_SIZE,
                bytes.len()
            )));
        }

        let payload_len = bytes.len() - NONCE_SIZE - HASH_SIZE;
        let payload = bytes[..payload_len].to_vec();

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(&bytes[payload_len..payload_len + NONCE_SIZE]);
        let nonce = u32::from_be_bytes(nonce_bytes);

        let mut hash: Sha256Hash = [0; HASH_SIZE];
        hash.copy_from_slice(&bytes[payload_len + NONCE_SIZE..]);

        Ok(Block {
            payload,
            nonce,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_target_shapes() {
        assert_eq!(Block::difficulty_target(0), [0xFF; 32]);

        let byte_aligned = Block::difficulty_target(8);
        assert_eq!(byte_aligned[0], 0x00);
        assert_eq!(byte_aligned[1], 0xFF);

        let partial = Block::difficulty_target(12);
        assert_eq!(partial[0], 0x00);
        assert_eq!(partial[1], 0x0F);
        assert_eq!(partial[2], 0xFF);

        assert_eq!(Block::difficulty_target(256), [0x00; 32]);
        assert_eq!(Block::difficulty_target(300), [0x00; 32]);
    }

    #[test]
    fn test_meets_target_is_big_endian_comparison() {
        let target = Block::difficulty_target(8);

        let mut passing = [0u8; 32];
        passing[1] = 0xFF;
        assert!(Block::meets_target(&passing, &target));

        let mut failing = [0u8; 32];
        failing[0] = 0x01;
        assert!(!Block::meets_target(&failing, &target));

        // Every hash meets the trivial target, even the largest
        assert!(Block::meets_target(&[0xFF; 32], &Block::difficulty_target(0)));
        // Only the all-zero hash meets the hardest one
        assert!(Block::meets_target(&[0x00; 32], &Block::difficulty_target(256)));
        let mut almost_zero = [0u8; 32];
        almost_zero[31] = 0x01;
        assert!(!Block::meets_target(&almost_zero, &Block::difficulty_target(256)));
    }

    #[test]
    fn test_content_hash_depends_on_every_input() {
        let parent = [0x42; 32];
        let base = Block::content_hash(Some(&parent), b"payload", 7);

        assert_eq!(base, Block::content_hash(Some(&parent), b"payload", 7));
        assert_ne!(base, Block::content_hash(None, b"payload", 7));
        assert_ne!(base, Block::content_hash(Some(&parent), b"payloae", 7));
        assert_ne!(base, Block::content_hash(Some(&parent), b"payload", 8));
    }

    #[test]
    fn test_wire_round_trip() {
        let block = Block::new(b"the payload".to_vec(), 99, None);
        let contents = block.to_bytes();
        assert_eq!(contents.len(), block.payload.len() + NONCE_SIZE + HASH_SIZE);

        let reread = Block::from_bytes(&contents).unwrap();
        assert_eq!(reread, block);
    }

    #[test]
    fn test_wire_rejects_short_buffer() {
        let result = Block::from_bytes(&[0u8; NONCE_SIZE + HASH_SIZE - 1]);
        assert!(matches!(result, Err(ChainError::MalformedRecord(_))));
    }

    #[test]
    fn test_empty_payload_block_survives_the_wire() {
        let block = Block::new(Vec::new(), 3, Some(&[0x42; 32]));
        let reread = Block::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(reread, block);
        assert!(reread.payload.is_empty());
    }
}
