/// Envelope binding an opaque payload to a detached signature over it
use crate::crypto::{self, KeyPair, SignatureBytes};
use crate::error::ChainError;
use secp256k1::constants::COMPACT_SIGNATURE_SIZE;

/// An opaque byte payload plus a compact signature over those bytes.
///
/// The wire form is `payload ‖ signature[64]`; the payload length is whatever
/// remains once the trailing signature is split off. Wrapping a transaction's
/// unsigned encoding yields exactly the transaction's embedded-signature wire
/// form, which is how signed submissions travel to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedObject {
    pub payload: Vec<u8>,
    pub signature: SignatureBytes,
}

impl SignedObject {
    /// Signs `payload` with `keypair`.
    pub fn sign(payload: Vec<u8>, keypair: &KeyPair) -> Result<Self, ChainError> {
        let signature = keypair.sign(&payload)?;
        Ok(SignedObject { payload, signature })
    }

    /// Wraps a payload and a signature computed elsewhere.
    pub fn from_parts(payload: Vec<u8>, signature: SignatureBytes) -> Self {
        SignedObject { payload, signature }
    }

    /// Splits a combined wire blob into payload and trailing signature.
    pub fn from_bytes(blob: &[u8]) -> Result<Self, ChainError> {
        if blob.len() <= COMPACT_SIGNATURE_SIZE {
            return Err(ChainError::MalformedRecord(format!(
                "Signed blob must be longer than the {} byte signature, got {}",
                COMPACT_SIGNATURE_SIZE,
                blob.len()
            )));
        }

        let split = blob.len() - COMPACT_SIGNATURE_SIZE;
        let mut signature: SignatureBytes = [0; COMPACT_SIGNATURE_SIZE];
        signature.copy_from_slice(&blob[split..]);

        Ok(SignedObject {
            payload: blob[..split].to_vec(),
            signature,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut contents = Vec::with_capacity(self.payload.len() + COMPACT_SIGNATURE_SIZE);
        contents.extend_from_slice(&self.payload);
        contents.extend_from_slice(&self.signature);
        contents
    }

    /// Whether the signature verifies against `public_key`.
    ///
    /// A well-formed signature that does not match is `Ok(false)`;
    /// unparsable key or signature material is still an error.
    pub fn verify(&self, public_key: &[u8]) -> Result<bool, ChainError> {
        match crypto::verify_signature(public_key, &self.payload, &self.signature) {
            Ok(()) => Ok(true),
            Err(ChainError::SignatureInvalid(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    /// Decodes `blob`, lets `mutate` edit the envelope, and re-encodes it.
    pub fn with_mutated<F>(blob: &[u8], mutate: F) -> Result<Vec<u8>, ChainError>
    where
        F: FnOnce(&mut SignedObject),
    {
        let mut signed = Self::from_bytes(blob)?;
        mutate(&mut signed);
        Ok(signed.to_bytes())
    }
}
