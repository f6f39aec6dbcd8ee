//! HPKE envelope encryption (spec §4.1).
//!
//! Base-mode HPKE over X25519, HKDF-SHA256, and AES-256-GCM. The KDC holds
//! only recipients' public keys, so every encryption generates a fresh
//! ephemeral sender key pair; the recipient (the KRS, or a future decrypt
//! path) recovers the shared secret from the ephemeral public key carried
//! alongside the ciphertext and its own static private key.
//!
//! Wire layout of an `encrypted_text` value, per [`SPEC_FULL.md`](../../SPEC_FULL.md)
//! §F: `ephemeral_pub(32) || nonce(12) || ciphertext+tag`.

use std::fmt;

use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::hkdf::{Salt, HKDF_SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use x25519_dalek::{PublicKey, StaticSecret};

const INFO: &[u8] = b"signpost-hpke-v1";
const PUBLIC_KEY_LEN: usize = 32;

/// A recipient's X25519 key pair, persisted as raw 32-byte values.
pub struct KeyPair {
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
}

/// Generate a fresh X25519 static key pair for a node.
pub fn generate_keypair() -> Result<KeyPair, HpkeError> {
    let rng = SystemRandom::new();
    let mut seed = [0u8; 32];
    rng.fill(&mut seed)
        .map_err(|_| HpkeError::Rng("could not generate a random key pair".into()))?;
    let secret = StaticSecret::from(seed);
    let public = PublicKey::from(&secret);
    Ok(KeyPair {
        private_key: secret.to_bytes(),
        public_key: public.to_bytes(),
    })
}

/// Encrypt `plaintext` to the recipient's static X25519 public key.
///
/// Returns the wire-layout bytes described above, suitable for base64
/// encoding into a [`super::super::catalog`] `encrypted_text`/`encrypted_keys`
/// column.
pub fn encrypt(recipient_public_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, HpkeError> {
    let recipient_public_key: [u8; PUBLIC_KEY_LEN] = recipient_public_key
        .try_into()
        .map_err(|_| HpkeError::BadKeyLength(recipient_public_key.len()))?;
    let recipient_public = PublicKey::from(recipient_public_key);

    let rng = SystemRandom::new();
    let mut ephemeral_seed = [0u8; 32];
    rng.fill(&mut ephemeral_seed)
        .map_err(|_| HpkeError::Rng("could not generate an ephemeral key pair".into()))?;
    let ephemeral_secret = StaticSecret::from(ephemeral_seed);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    let shared_secret = ephemeral_secret.diffie_hellman(&recipient_public);
    let key = derive_aead_key(shared_secret.as_bytes(), ephemeral_public.as_bytes())?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes)
        .map_err(|_| HpkeError::Rng("could not generate a nonce".into()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| HpkeError::Aead("AEAD seal failed".into()))?;

    let mut out = Vec::with_capacity(PUBLIC_KEY_LEN + NONCE_LEN + in_out.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&in_out);
    Ok(out)
}

/// Decrypt an HPKE envelope with the recipient's static private key.
pub fn decrypt(recipient_private_key: &[u8], envelope: &[u8]) -> Result<Vec<u8>, HpkeError> {
    if envelope.len() < PUBLIC_KEY_LEN + NONCE_LEN {
        return Err(HpkeError::Truncated(envelope.len()));
    }
    let recipient_private_key: [u8; 32] = recipient_private_key
        .try_into()
        .map_err(|_| HpkeError::BadKeyLength(recipient_private_key.len()))?;
    let recipient_secret = StaticSecret::from(recipient_private_key);

    let (ephemeral_public_bytes, rest) = envelope.split_at(PUBLIC_KEY_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let ephemeral_public_bytes: [u8; PUBLIC_KEY_LEN] = ephemeral_public_bytes
        .try_into()
        .expect("slice length checked above");
    let ephemeral_public = PublicKey::from(ephemeral_public_bytes);

    let shared_secret = recipient_secret.diffie_hellman(&ephemeral_public);
    let key = derive_aead_key(shared_secret.as_bytes(), &ephemeral_public_bytes)?;

    let nonce_bytes: [u8; NONCE_LEN] = nonce_bytes.try_into().expect("slice length checked above");
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| HpkeError::Aead("AEAD open failed (wrong key or corrupted data)".into()))?;
    Ok(plaintext.to_vec())
}

/// Derive the AES-256-GCM key for one message via HKDF-SHA256, salted on
/// the ephemeral public key so distinct messages never share a key even if
/// the shared secret were somehow repeated.
fn derive_aead_key(shared_secret: &[u8], ephemeral_public: &[u8]) -> Result<LessSafeKey, HpkeError> {
    let salt = Salt::new(HKDF_SHA256, ephemeral_public);
    let prk = salt.extract(shared_secret);
    let okm = prk
        .expand(&[INFO], &AES_256_GCM)
        .map_err(|_| HpkeError::Kdf("HKDF expand failed".into()))?;
    let mut key_bytes = [0u8; 32];
    okm.fill(&mut key_bytes)
        .map_err(|_| HpkeError::Kdf("HKDF fill failed".into()))?;
    let unbound = UnboundKey::new(&AES_256_GCM, &key_bytes)
        .map_err(|_| HpkeError::Kdf("could not build AEAD key".into()))?;
    Ok(LessSafeKey::new(unbound))
}

//----------- HpkeError -------------------------------------------------------

#[derive(Debug)]
pub enum HpkeError {
    /// A key was not exactly 32 bytes.
    BadKeyLength(usize),
    /// An envelope was too short to contain an ephemeral key and a nonce.
    Truncated(usize),
    /// The system RNG failed.
    Rng(String),
    /// Key derivation failed.
    Kdf(String),
    /// AEAD seal or open failed.
    Aead(String),
}

impl fmt::Display for HpkeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HpkeError::BadKeyLength(n) => write!(f, "expected a 32-byte key, got {n} bytes"),
            HpkeError::Truncated(n) => write!(f, "envelope too short ({n} bytes)"),
            HpkeError::Rng(m) => write!(f, "{m}"),
            HpkeError::Kdf(m) => write!(f, "{m}"),
            HpkeError::Aead(m) => write!(f, "{m}"),
        }
    }
}

impl std::error::Error for HpkeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_message() {
        let keypair = generate_keypair().unwrap();
        let plaintext = b"the quick brown fox jumps over the lazy dog";
        let envelope = encrypt(&keypair.public_key, plaintext).unwrap();
        let decrypted = decrypt(&keypair.private_key, &envelope).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn rejects_the_wrong_key() {
        let keypair = generate_keypair().unwrap();
        let other = generate_keypair().unwrap();
        let envelope = encrypt(&keypair.public_key, b"secret").unwrap();
        assert!(decrypt(&other.private_key, &envelope).is_err());
    }

    #[test]
    fn rejects_truncated_envelopes() {
        let keypair = generate_keypair().unwrap();
        assert!(matches!(
            decrypt(&keypair.private_key, &[0u8; 10]),
            Err(HpkeError::Truncated(10))
        ));
    }

    #[test]
    fn distinct_messages_use_distinct_nonces() {
        let keypair = generate_keypair().unwrap();
        let a = encrypt(&keypair.public_key, b"message").unwrap();
        let b = encrypt(&keypair.public_key, b"message").unwrap();
        assert_ne!(a, b);
    }
}
