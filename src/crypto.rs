//! Cryptographic primitives for emberchain

use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
/// This prevents repeated, unnecessary context creation.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Type alias for a SHA-256 digest. Block hashes and signing digests are
/// always this one fixed hash; nothing in the crate picks a hash per call.
pub type Sha256Hash = [u8; 32];

/// Type alias for a compressed secp256k1 public key. Parties on the wire and
/// in the ledger are identified by these raw bytes, compared exactly.
pub type PublicKeyBytes = [u8; PUBLIC_KEY_SIZE];

/// Type alias for a compact ECDSA signature.
pub type SignatureBytes = [u8; COMPACT_SIGNATURE_SIZE];

/// Computes the SHA-256 digest of a message.
pub fn sha256(message: &[u8]) -> Sha256Hash {
    Sha256::digest(message).into()
}

/// Convert a hex string to public key bytes.
pub fn public_key_from_hex(hex_str: &str) -> Result<PublicKeyBytes, ChainError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ChainError::CryptoError(format!("Invalid hex public key: {}", e)))?;
    if bytes.len() != PUBLIC_KEY_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Public key must be {} bytes, got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        )));
    }
    bytes
        .try_into()
        .map_err(|_| ChainError::CryptoError("Failed to convert bytes into public key".to_string()))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        // Using the context from the static Lazy
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Creates a KeyPair from an existing SecretKey.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        // Using the context from the static Lazy
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        // Use standard error message for length check
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        Ok(Self::from_secret_key(secret_key))
    }

    /// Returns the KeyPair's public key as a compressed byte array.
    pub fn public_key_bytes(&self) -> PublicKeyBytes {
        self.public_key.serialize()
    }

    /// Signs a message (which is first hashed using SHA-256) and returns the compact signature bytes.
    pub fn sign(&self, message: &[u8]) -> Result<SignatureBytes, ChainError> {
        let digest = sha256(message);

        // Create message from digest; propagate any error
        let message = Message::from_digest_slice(&digest)
            .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

        // Using the context from the static Lazy
        let signature = SECP256K1_CONTEXT.sign_ecdsa(&message, &self.secret_key);

        let compact_sig_bytes: SignatureBytes = signature.serialize_compact();
        Ok(compact_sig_bytes)
    }
}

/// Verifies an ECDSA signature given the raw public key bytes, message, and signature bytes.
///
/// Unparsable key or signature material is a [`ChainError::CryptoError`]; a
/// well-formed signature that simply does not verify against the key is a
/// [`ChainError::SignatureInvalid`]. Callers that need a yes/no answer can
/// treat the latter as "no" and still surface the former.
pub fn verify_signature(
    public_key_bytes: &[u8],
    message: &[u8],
    signature_bytes: &[u8],
) -> Result<(), ChainError> {
    // Input validation: prefer using constant sizes in error messages for clarity
    if public_key_bytes.len() != PUBLIC_KEY_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Public key must be exactly {} bytes (compressed), got {}",
            PUBLIC_KEY_SIZE,
            public_key_bytes.len()
        )));
    }
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(ChainError::CryptoError(format!(
            "Signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }

    // Using the context from the static Lazy
    let public_key = PublicKey::from_slice(public_key_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))?;

    // Hash the message
    let digest = sha256(message);

    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ChainError::CryptoError(format!("Failed to create message: {}", e)))?;

    let signature = Signature::from_compact(signature_bytes)
        .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

    SECP256K1_CONTEXT
        .verify_ecdsa(&message, &signature, &public_key)
        .map_err(|e| match e {
            secp256k1::Error::IncorrectSignature => ChainError::SignatureInvalid(
                "signature does not match the signing key".to_string(),
            ),
            other => ChainError::CryptoError(format!("Signature verification failed: {}", other)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex;

    #[test]
    fn test_key_generation() {
        let keypair = KeyPair::generate().unwrap();
        // Check compressed public key size
        assert_eq!(keypair.public_key_bytes().len(), PUBLIC_KEY_SIZE);
        // Check secret key size
        assert_eq!(keypair.secret_key.as_ref().len(), SECRET_KEY_SIZE);
    }

    #[test]
    fn test_from_secret_bytes_is_deterministic() {
        let first = KeyPair::from_secret_bytes(&[0x11; SECRET_KEY_SIZE]).unwrap();
        let second = KeyPair::from_secret_bytes(&[0x11; SECRET_KEY_SIZE]).unwrap();
        assert_eq!(first.public_key_bytes(), second.public_key_bytes());
    }

    #[test]
    fn test_signing_and_verification() {
        let keypair = KeyPair::generate().unwrap();
        let message = b"Hello, emberchain!";

        let signature = keypair.sign(message).unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        let result = verify_signature(&pubkey_bytes, message, &signature);
        assert!(result.is_ok());
        // Check signature size
        assert_eq!(signature.len(), COMPACT_SIGNATURE_SIZE);
    }

    #[test]
    fn test_wrong_key_is_signature_invalid() {
        let keypair1 = KeyPair::generate().unwrap();
        let keypair2 = KeyPair::generate().unwrap();

        let message = b"Test message";
        let signature = keypair1.sign(message).unwrap();
        let pubkey2_bytes = keypair2.public_key_bytes();

        let result = verify_signature(&pubkey2_bytes, message, &signature);
        assert!(matches!(result, Err(ChainError::SignatureInvalid(_))));
        // Assert on the concrete error string for robust testing
        assert_eq!(
            result.unwrap_err().to_string(),
            "Signature invalid: signature does not match the signing key"
        );
    }

    #[test]
    fn test_tampered_message() {
        let keypair = KeyPair::generate().unwrap();
        let message = b"Original message";
        let tampered = b"Tampered message";

        let signature = keypair.sign(message).unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        let result = verify_signature(&pubkey_bytes, tampered, &signature);
        assert!(matches!(result, Err(ChainError::SignatureInvalid(_))));
    }

    #[test]
    fn test_invalid_key_or_sig_length_check() {
        let keypair = KeyPair::generate().unwrap();
        let message = b"Test";
        let signature = keypair.sign(message).unwrap();
        let pubkey_bytes = keypair.public_key_bytes();

        // Invalid pubkey length: a crypto error, not a failed verification
        let result = verify_signature(&pubkey_bytes[1..], message, &signature);
        assert!(matches!(result, Err(ChainError::CryptoError(_))));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Public key must be exactly"));

        // Invalid signature length
        let result = verify_signature(&pubkey_bytes, message, &signature[1..]);
        assert!(matches!(result, Err(ChainError::CryptoError(_))));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Signature must be exactly"));
    }

    #[test]
    fn test_from_secret_bytes_invalid_length() {
        let short_bytes = [0u8; SECRET_KEY_SIZE - 1];
        let result = KeyPair::from_secret_bytes(&short_bytes);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Secret key must be"));
    }

    #[test]
    fn test_sha256_is_stable() {
        let digest = sha256(b"emberchain");
        assert_eq!(digest, sha256(b"emberchain"));
        assert_ne!(digest, sha256(b"emberchain!"));
        assert_eq!(hex::encode(digest).len(), 64);
    }

    #[test]
    fn test_public_key_hex_round_trip() {
        let keypair = KeyPair::generate().unwrap();
        let encoded = hex::encode(keypair.public_key_bytes());
        let decoded = public_key_from_hex(&encoded).unwrap();
        assert_eq!(decoded, keypair.public_key_bytes());

        assert!(public_key_from_hex("zz").is_err());
        assert!(public_key_from_hex("ab").is_err());
    }
}
