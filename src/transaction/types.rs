/// Transaction record and its fixed-width wire codec
use crate::crypto::{KeyPair, PublicKeyBytes, SignatureBytes};
use crate::error::ChainError;
use secp256k1::constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE};
use std::fmt;

/// Width of the big-endian amount field.
pub const AMOUNT_SIZE: usize = 8;

/// Size of a transaction record without its optional trailing signature:
/// `sender ‖ receiver ‖ amount`.
pub const UNSIGNED_RECORD_SIZE: usize = 2 * PUBLIC_KEY_SIZE + AMOUNT_SIZE;

/// Size of a transaction record with the embedded signature appended.
pub const SIGNED_RECORD_SIZE: usize = UNSIGNED_RECORD_SIZE + COMPACT_SIGNATURE_SIZE;

/// Conventional sender of the money-creating genesis record.
pub const ZERO_KEY: PublicKeyBytes = [0; PUBLIC_KEY_SIZE];

const RECEIVER_OFFSET: usize = PUBLIC_KEY_SIZE;
const AMOUNT_OFFSET: usize = 2 * PUBLIC_KEY_SIZE;

/// A single transfer of coins between two public keys.
///
/// The wire form is `sender[33] ‖ receiver[33] ‖ amount[8]`, all integers
/// big-endian, optionally followed by a 64-byte compact signature over the
/// unsigned prefix. Fields are public so test fixtures can corrupt records
/// deliberately; [`Transaction::with_mutated`] packages that pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sender: PublicKeyBytes,
    pub receiver: PublicKeyBytes,
    pub amount: i64,
    pub signature: Option<SignatureBytes>,
}

impl Transaction {
    pub fn new(sender: PublicKeyBytes, receiver: PublicKeyBytes, amount: i64) -> Self {
        Transaction {
            sender,
            receiver,
            amount,
            signature: None,
        }
    }

    /// The byte string a signature commits to: the unsigned wire prefix.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(UNSIGNED_RECORD_SIZE);
        message.extend_from_slice(&self.sender);
        message.extend_from_slice(&self.receiver);
        message.extend_from_slice(&self.amount.to_be_bytes());
        message
    }

    /// Signs the record with `keypair` and embeds the signature.
    ///
    /// The keypair should match [`Transaction::sender`]; a mismatched key
    /// produces a record the ledger will reject.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), ChainError> {
        let signature = keypair.sign(&self.signable_message())?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Encodes the record, appending the embedded signature when present.
    pub fn encode(&self) -> Vec<u8> {
        let mut contents = self.signable_message();
        if let Some(signature) = &self.signature {
            contents.extend_from_slice(signature);
        }
        contents
    }

    /// Decodes a record from its wire form.
    ///
    /// Buffers shorter than [`UNSIGNED_RECORD_SIZE`] are malformed; buffers of
    /// at least [`SIGNED_RECORD_SIZE`] carry an embedded signature.
    pub fn decode(bytes: &[u8]) -> Result<Self, ChainError> {
        if bytes.len() < UNSIGNED_RECORD_SIZE {
            return Err(ChainError::MalformedRecord(format!(
                "Transaction record must be at least {} bytes, got {}",
                UNSIGNED_RECORD_SIZE,
                bytes.len()
            )));
        }

        let mut sender: PublicKeyBytes = [0; PUBLIC_KEY_SIZE];
        sender.copy_from_slice(&bytes[..PUBLIC_KEY_SIZE]);

        let mut receiver: PublicKeyBytes = [0; PUBLIC_KEY_SIZE];
        receiver.copy_from_slice(&bytes[RECEIVER_OFFSET..RECEIVER_OFFSET + PUBLIC_KEY_SIZE]);

        let mut amount_bytes = [0u8; AMOUNT_SIZE];
        amount_bytes.copy_from_slice(&bytes[AMOUNT_OFFSET..AMOUNT_OFFSET + AMOUNT_SIZE]);
        let amount = i64::from_be_bytes(amount_bytes);

        let signature = if bytes.len() >= SIGNED_RECORD_SIZE {
            let mut signature: SignatureBytes = [0; COMPACT_SIGNATURE_SIZE];
            signature.copy_from_slice(
                &bytes[UNSIGNED_RECORD_SIZE..UNSIGNED_RECORD_SIZE + COMPACT_SIGNATURE_SIZE],
            );
            Some(signature)
        } else {
            None
        };

        Ok(Transaction {
            sender,
            receiver,
            amount,
            signature,
        })
    }

    /// Decodes `bytes`, lets `mutate` edit the record, and re-encodes it.
    /// Test fixtures use this to build deliberately corrupted payloads.
    pub fn with_mutated<F>(bytes: &[u8], mutate: F) -> Result<Vec<u8>, ChainError>
    where
        F: FnOnce(&mut Transaction),
    {
        let mut transaction = Self::decode(bytes)?;
        mutate(&mut transaction);
        Ok(transaction.encode())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} -({})-> {}",
            hex::encode(self.sender),
            self.amount,
            hex::encode(self.receiver)
        )
    }
}
