//! DNSSEC key pair generation (spec §4.2).
//!
//! Builds PKCS#8-wrapped key material for the five algorithms spec §3 names
//! (Ed25519, ECDSA P-256/P-384, RSA-SHA256/512) and the values needed to
//! render a DNSKEY RR: flags, protocol, algorithm, and the keytag computed
//! per RFC 4034 appendix B.

use std::fmt;

use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, Ed25519KeyPair, KeyPair as _, ECDSA_P256_SHA256_ASN1_SIGNING, ECDSA_P384_SHA384_ASN1_SIGNING};
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;

use signpost_api::Algorithm;

const DNSKEY_PROTOCOL: u8 = 3;

/// A freshly generated DNSSEC key pair.
pub struct GeneratedKey {
    /// PKCS#8 DER, suitable for storage and for reloading a signer.
    pub pkcs8: Vec<u8>,
    /// The DNSKEY public key field, in the RR-specific encoding (raw point
    /// for Ed25519/ECDSA, modulus+exponent for RSA).
    pub public_key: Vec<u8>,
    /// The IANA DNSSEC algorithm number.
    pub algorithm_number: u8,
    pub keytag: u16,
}

/// Generate a key pair for `algorithm`, carrying `flags` (256 for a ZSK, 257
/// for a KSK) into the keytag computation.
pub fn generate(algorithm: Algorithm, flags: u16) -> Result<GeneratedKey, KeygenError> {
    let rng = SystemRandom::new();
    let (pkcs8, public_key, algorithm_number) = match algorithm {
        Algorithm::Ed25519 => {
            let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
                .map_err(|_| KeygenError::Generation("Ed25519 key generation failed".into()))?;
            let key_pair = Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
                .map_err(|_| KeygenError::Generation("Ed25519 key parsing failed".into()))?;
            (pkcs8.as_ref().to_vec(), key_pair.public_key().as_ref().to_vec(), 15)
        }
        Algorithm::EcdsaP256 => {
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
                .map_err(|_| KeygenError::Generation("ECDSA P-256 key generation failed".into()))?;
            let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|_| KeygenError::Generation("ECDSA P-256 key parsing failed".into()))?;
            (pkcs8.as_ref().to_vec(), uncompressed_point_xy(key_pair.public_key().as_ref()), 13)
        }
        Algorithm::EcdsaP384 => {
            let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, &rng)
                .map_err(|_| KeygenError::Generation("ECDSA P-384 key generation failed".into()))?;
            let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|_| KeygenError::Generation("ECDSA P-384 key parsing failed".into()))?;
            (pkcs8.as_ref().to_vec(), uncompressed_point_xy(key_pair.public_key().as_ref()), 14)
        }
        Algorithm::RsaSha256 | Algorithm::RsaSha512 => {
            // 'ring' only verifies RSA signatures, it cannot generate RSA
            // key pairs; use the 'rsa' crate, PKCS#8-encoded via 'pkcs8'.
            let mut os_rng = rand_from_ring(&rng);
            let private_key = RsaPrivateKey::new(&mut os_rng, 2048)
                .map_err(|e| KeygenError::Generation(format!("RSA key generation failed: {e}")))?;
            let pkcs8 = private_key
                .to_pkcs8_der()
                .map_err(|e| KeygenError::Generation(format!("RSA PKCS#8 encoding failed: {e}")))?
                .as_bytes()
                .to_vec();
            let public_key = rsa_dnskey_public_key(&private_key);
            let algorithm_number = if algorithm == Algorithm::RsaSha256 { 8 } else { 10 };
            (pkcs8, public_key, algorithm_number)
        }
    };

    let keytag = calculate_keytag(flags, algorithm_number, &public_key);
    Ok(GeneratedKey {
        pkcs8,
        public_key,
        algorithm_number,
        keytag,
    })
}

/// Strip the ring/SEC1 `0x04` uncompressed-point tag, leaving the bare X||Y
/// DNSKEY encoding RFC 6605 expects for ECDSA keys.
fn uncompressed_point_xy(point: &[u8]) -> Vec<u8> {
    point.get(1..).unwrap_or(point).to_vec()
}

/// DNSKEY RDATA for RSA per RFC 3110: a one- or three-byte exponent length
/// prefix, the exponent, then the modulus, all big-endian.
fn rsa_dnskey_public_key(key: &RsaPrivateKey) -> Vec<u8> {
    let exponent = key.e().to_bytes_be();
    let modulus = key.n().to_bytes_be();

    let mut out = Vec::with_capacity(1 + exponent.len() + modulus.len());
    if exponent.len() < 256 {
        out.push(exponent.len() as u8);
    } else {
        out.push(0);
        out.extend_from_slice(&(exponent.len() as u16).to_be_bytes());
    }
    out.extend_from_slice(&exponent);
    out.extend_from_slice(&modulus);
    out
}

/// Bridge `ring`'s `SecureRandom` to `rsa`'s expected `rand_core::CryptoRng`.
fn rand_from_ring(rng: &SystemRandom) -> RingRng<'_> {
    RingRng(rng)
}

struct RingRng<'a>(&'a SystemRandom);

impl rand_core::RngCore for RingRng<'_> {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        rand_core::RngCore::fill_bytes(self, &mut buf);
        u32::from_ne_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        rand_core::RngCore::fill_bytes(self, &mut buf);
        u64::from_ne_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        use ring::rand::SecureRandom;
        self.0.fill(dest).expect("system RNG failure");
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for RingRng<'_> {}

/// RFC 4034 appendix B keytag algorithm.
pub fn calculate_keytag(flags: u16, algorithm: u8, public_key: &[u8]) -> u16 {
    let mut rdata = Vec::with_capacity(4 + public_key.len());
    rdata.extend_from_slice(&flags.to_be_bytes());
    rdata.push(DNSKEY_PROTOCOL);
    rdata.push(algorithm);
    rdata.extend_from_slice(public_key);

    let mut ac: u32 = 0;
    for (i, byte) in rdata.iter().enumerate() {
        if i % 2 == 0 {
            ac += (*byte as u32) << 8;
        } else {
            ac += *byte as u32;
        }
    }
    ac += (ac >> 16) & 0xFFFF;
    (ac & 0xFFFF) as u16
}

//----------- KeygenError ------------------------------------------------------

#[derive(Debug)]
pub enum KeygenError {
    Generation(String),
}

impl fmt::Display for KeygenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeygenError::Generation(m) => write!(f, "{m}"),
        }
    }
}

impl std::error::Error for KeygenError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_keys_have_a_32_byte_public_key() {
        let key = generate(Algorithm::Ed25519, 257).unwrap();
        assert_eq!(key.public_key.len(), 32);
        assert_eq!(key.algorithm_number, 15);
    }

    #[test]
    fn ecdsa_p256_keys_have_a_64_byte_public_key() {
        let key = generate(Algorithm::EcdsaP256, 256).unwrap();
        assert_eq!(key.public_key.len(), 64);
        assert_eq!(key.algorithm_number, 13);
    }

    #[test]
    fn ksk_and_zsk_flags_yield_different_keytags() {
        let ksk = generate(Algorithm::Ed25519, 257).unwrap();
        let zsk_tag = calculate_keytag(256, ksk.algorithm_number, &ksk.public_key);
        assert_ne!(ksk.keytag, zsk_tag);
    }
}
