//! Detached signatures with CHRP-selected schemes
//!
//! - `a`: Ed25519 (32-byte keys, 64-byte signatures)
//! - `b`: ECDSA over secp256k1 with SHA-256 (32-byte private key, 33-byte
//!   compressed public key, 64-byte compact `r || s` signature)
//!
//! Private keys can be derived from a passphrase with scrypt. Each scheme
//! has its own fixed salt, so one passphrase yields unrelated keys per
//! scheme. Salts and default cost match the keys already in circulation.
//!
//! Every verification failure is reported as the same `InvalidSignature`
//! error, whatever the cause.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::chrp::split_chrp_str;
use crate::codec::{lb32decode, lb32encode};

/// Salt for Ed25519 key derivation
pub const ED25519_SALT: [u8; 32] = [
    0xe2, 0xee, 0xf4, 0xe1, 0x3a, 0x40, 0x41, 0xb2, 0xa5, 0xf3, 0x36, 0x1f, 0x25, 0x00, 0x17,
    0x02, 0x4f, 0x5a, 0xc0, 0x15, 0x56, 0x88, 0x23, 0xb3, 0x99, 0xca, 0x0d, 0x3f, 0xfa, 0xd0,
    0x41, 0x11,
];

/// Salt for secp256k1 key derivation
pub const SECP256K1_SALT: [u8; 32] = [
    0x5d, 0x90, 0x77, 0xcb, 0xa4, 0xa8, 0x44, 0xca, 0x88, 0xa2, 0xbd, 0xac, 0xe6, 0x99, 0xba,
    0xce, 0xb9, 0xdc, 0x84, 0x68, 0x27, 0xbd, 0x45, 0xb0, 0x0a, 0xaf, 0xac, 0xe7, 0x5e, 0x4d,
    0x9f, 0xb3,
];

/// Derived private key length
pub const PRIVATE_KEY_LEN: usize = 32;

/// Signature error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("not a supported signature type: {0:?}")]
    UnsupportedSignatureType(String),
    #[error("signature appears to be corrupt or forged")]
    InvalidSignature,
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("invalid author address: {0}")]
    InvalidAddress(String),
}

/// scrypt cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// log2 of the CPU/memory cost N
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl Default for KdfParams {
    /// N = 65536, r = 8, p = 1 (64 MiB)
    fn default() -> Self {
        Self {
            log_n: 16,
            r: 8,
            p: 1,
        }
    }
}

impl KdfParams {
    pub fn new(log_n: u8, r: u32, p: u32) -> Self {
        Self { log_n, r, p }
    }
}

/// Signature schemes, tagged by CHRP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureType {
    Ed25519,
    Secp256k1,
}

impl SignatureType {
    pub const ALL: [SignatureType; 2] = [SignatureType::Ed25519, SignatureType::Secp256k1];

    pub fn from_chrp(tag: &str) -> Result<Self, SignatureError> {
        match tag {
            "a" => Ok(SignatureType::Ed25519),
            "b" => Ok(SignatureType::Secp256k1),
            _ => Err(SignatureError::UnsupportedSignatureType(tag.to_string())),
        }
    }

    pub fn chrp(self) -> &'static str {
        match self {
            SignatureType::Ed25519 => "a",
            SignatureType::Secp256k1 => "b",
        }
    }

    fn salt(self) -> &'static [u8; 32] {
        match self {
            SignatureType::Ed25519 => &ED25519_SALT,
            SignatureType::Secp256k1 => &SECP256K1_SALT,
        }
    }

    pub fn public_key_len(self) -> usize {
        match self {
            SignatureType::Ed25519 => 32,
            SignatureType::Secp256k1 => 33,
        }
    }

    /// Random private key
    pub fn generate_private_key(self) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; PRIVATE_KEY_LEN];
        loop {
            rng.fill_bytes(&mut key);
            // Not every 32-byte string is a valid secp256k1 scalar
            if self != SignatureType::Secp256k1 || SecretKey::from_slice(&key).is_ok() {
                return key.to_vec();
            }
        }
    }

    /// Deterministic private key from a passphrase
    pub fn derive_private_key(self, passphrase: &str, kdf: &KdfParams) -> Result<Vec<u8>, SignatureError> {
        let params = scrypt::Params::new(kdf.log_n, kdf.r, kdf.p, PRIVATE_KEY_LEN)
            .map_err(|e| SignatureError::KeyDerivation(e.to_string()))?;
        let mut key = vec![0u8; PRIVATE_KEY_LEN];
        scrypt::scrypt(passphrase.as_bytes(), self.salt(), &params, &mut key)
            .map_err(|e| SignatureError::KeyDerivation(e.to_string()))?;
        if self == SignatureType::Secp256k1 {
            SecretKey::from_slice(&key).map_err(|_| SignatureError::InvalidPrivateKey)?;
        }
        Ok(key)
    }

    pub fn derive_public_key(self, private_key: &[u8]) -> Result<Vec<u8>, SignatureError> {
        match self {
            SignatureType::Ed25519 => Ok(ed25519_key(private_key)?.verifying_key().to_bytes().to_vec()),
            SignatureType::Secp256k1 => {
                let secp = Secp256k1::signing_only();
                let sk = secp256k1_key(private_key)?;
                Ok(PublicKey::from_secret_key(&secp, &sk).serialize().to_vec())
            }
        }
    }

    pub fn sign(self, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, SignatureError> {
        match self {
            SignatureType::Ed25519 => Ok(ed25519_key(private_key)?.sign(message).to_bytes().to_vec()),
            SignatureType::Secp256k1 => {
                let secp = Secp256k1::signing_only();
                let sk = secp256k1_key(private_key)?;
                let msg = sha256_message(message)?;
                Ok(secp.sign_ecdsa(&msg, &sk).serialize_compact().to_vec())
            }
        }
    }

    /// Check a signature; the public key must also be in its canonical encoding
    pub fn verify(self, public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<(), SignatureError> {
        let result = match self {
            SignatureType::Ed25519 => verify_ed25519(public_key, signature, message),
            SignatureType::Secp256k1 => verify_secp256k1(public_key, signature, message),
        };
        if let Err(reason) = result {
            debug!(scheme = self.chrp(), "signature rejected: {}", reason);
            return Err(SignatureError::InvalidSignature);
        }
        Ok(())
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chrp())
    }
}

impl FromStr for SignatureType {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_chrp(s)
    }
}

fn ed25519_key(private_key: &[u8]) -> Result<SigningKey, SignatureError> {
    let bytes: [u8; 32] = private_key
        .try_into()
        .map_err(|_| SignatureError::InvalidPrivateKey)?;
    Ok(SigningKey::from_bytes(&bytes))
}

fn secp256k1_key(private_key: &[u8]) -> Result<SecretKey, SignatureError> {
    SecretKey::from_slice(private_key).map_err(|_| SignatureError::InvalidPrivateKey)
}

fn sha256_message(message: &[u8]) -> Result<Message, SignatureError> {
    Message::from_digest_slice(&Sha256::digest(message)).map_err(|_| SignatureError::InvalidSignature)
}

fn verify_ed25519(public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<(), &'static str> {
    let key_bytes: [u8; 32] = public_key.try_into().map_err(|_| "public key length")?;
    let vk = VerifyingKey::from_bytes(&key_bytes).map_err(|_| "public key encoding")?;
    let sig = ed25519_dalek::Signature::from_slice(signature).map_err(|_| "signature encoding")?;
    vk.verify_strict(message, &sig).map_err(|_| "signature mismatch")?;
    if vk.to_bytes() != key_bytes {
        return Err("non-canonical public key");
    }
    Ok(())
}

fn verify_secp256k1(public_key: &[u8], signature: &[u8], message: &[u8]) -> Result<(), &'static str> {
    let secp = Secp256k1::verification_only();
    let pk = PublicKey::from_slice(public_key).map_err(|_| "public key encoding")?;
    let mut sig = ecdsa::Signature::from_compact(signature).map_err(|_| "signature encoding")?;
    // Signers that do not normalise S are accepted
    sig.normalize_s();
    let msg = sha256_message(message).map_err(|_| "message digest")?;
    secp.verify_ecdsa(&msg, &sig, &pk).map_err(|_| "signature mismatch")?;
    if pk.serialize()[..] != *public_key {
        return Err("non-canonical public key");
    }
    Ok(())
}

/// Random private key for the scheme named by `chrp`
pub fn generate_private_key(chrp: &str) -> Result<Vec<u8>, SignatureError> {
    Ok(SignatureType::from_chrp(chrp)?.generate_private_key())
}

/// Passphrase-derived private key, default scrypt cost
pub fn derive_private_key(chrp: &str, passphrase: &str) -> Result<Vec<u8>, SignatureError> {
    SignatureType::from_chrp(chrp)?.derive_private_key(passphrase, &KdfParams::default())
}

pub fn derive_public_key(chrp: &str, private_key: &[u8]) -> Result<Vec<u8>, SignatureError> {
    SignatureType::from_chrp(chrp)?.derive_public_key(private_key)
}

/// Public key for a passphrase, default scrypt cost
pub fn public_key_from_passphrase(chrp: &str, passphrase: &str) -> Result<Vec<u8>, SignatureError> {
    let scheme = SignatureType::from_chrp(chrp)?;
    let private_key = scheme.derive_private_key(passphrase, &KdfParams::default())?;
    scheme.derive_public_key(&private_key)
}

pub fn sign_bytes(chrp: &str, private_key: &[u8], message: &[u8]) -> Result<Vec<u8>, SignatureError> {
    SignatureType::from_chrp(chrp)?.sign(private_key, message)
}

/// Sign with a passphrase-derived key, default scrypt cost
pub fn sign_with_passphrase(chrp: &str, passphrase: &str, message: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let scheme = SignatureType::from_chrp(chrp)?;
    let private_key = scheme.derive_private_key(passphrase, &KdfParams::default())?;
    scheme.sign(&private_key, message)
}

pub fn verify_bytes(
    chrp: &str,
    public_key: &[u8],
    signature: &[u8],
    message: &[u8],
) -> Result<(), SignatureError> {
    SignatureType::from_chrp(chrp)?.verify(public_key, signature, message)
}

/// Author address: scheme CHRP followed by the lb32 public key
pub fn format_address(scheme: SignatureType, public_key: &[u8]) -> String {
    format!("{}{}", scheme.chrp(), lb32encode(public_key))
}

/// Split an author address into scheme and public key
pub fn parse_address(address: &str) -> Result<(SignatureType, Vec<u8>), SignatureError> {
    let (tag, key) =
        split_chrp_str(address).map_err(|_| SignatureError::InvalidAddress(address.to_string()))?;
    let scheme = SignatureType::from_chrp(tag)?;
    let public_key = lb32decode(key).map_err(|_| SignatureError::InvalidAddress(address.to_string()))?;
    if public_key.len() != scheme.public_key_len() {
        return Err(SignatureError::InvalidAddress(address.to_string()));
    }
    Ok((scheme, public_key))
}
