//! Hash function registry
//!
//! Every block record carries a numeric function code so readers can pick
//! the right digest without out-of-band agreement. Codes are spread over
//! 0..=127 to vary the first byte of encoded records; they are part of the
//! wire format and must not change.
//!
//! Digests can be requested at any length. Shorter requests truncate;
//! longer requests repeat the native digest until it is long enough.
//! Repetition only adds wire-format flexibility: a 64-byte MD5 digest is
//! exactly as weak as a 16-byte one.

use blake2::{Blake2bVar, Blake2sVar};
use digest::{Digest, Update, VariableOutput};

use crate::chrp::split_chrp_str;

/// Hash error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashError {
    #[error("unsupported hash function code {0}")]
    UnsupportedHashFunction(u64),
    #[error("unsupported hash function code {0}")]
    UnsupportedHashChrp(String),
    #[error("digest size must be at least one byte")]
    ZeroDigestSize,
    #[error("invalid hash config: {0}")]
    InvalidHashConfig(String),
}

/// Digest algorithms addressable by function code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Md5,
    Sha1,
    Sha256,
    Sha512,
    Sha224,
    Sha384,
    Sha3_256,
    Sha3_512,
    Sha3_224,
    Sha3_384,
    Blake2b,
    Blake2s,
}

impl HashFunction {
    pub const ALL: [HashFunction; 12] = [
        HashFunction::Md5,
        HashFunction::Sha1,
        HashFunction::Sha256,
        HashFunction::Sha512,
        HashFunction::Sha224,
        HashFunction::Sha384,
        HashFunction::Sha3_256,
        HashFunction::Sha3_512,
        HashFunction::Sha3_224,
        HashFunction::Sha3_384,
        HashFunction::Blake2b,
        HashFunction::Blake2s,
    ];

    pub fn from_code(code: u64) -> Result<Self, HashError> {
        match code {
            1 => Ok(HashFunction::Md5),
            2 => Ok(HashFunction::Sha1),
            3 => Ok(HashFunction::Sha256),
            14 => Ok(HashFunction::Sha512),
            28 => Ok(HashFunction::Sha224),
            42 => Ok(HashFunction::Sha384),
            56 => Ok(HashFunction::Sha3_256),
            70 => Ok(HashFunction::Sha3_512),
            84 => Ok(HashFunction::Sha3_224),
            98 => Ok(HashFunction::Sha3_384),
            112 => Ok(HashFunction::Blake2b),
            126 => Ok(HashFunction::Blake2s),
            _ => Err(HashError::UnsupportedHashFunction(code)),
        }
    }

    pub fn code(self) -> u64 {
        match self {
            HashFunction::Md5 => 1,
            HashFunction::Sha1 => 2,
            HashFunction::Sha256 => 3,
            HashFunction::Sha512 => 14,
            HashFunction::Sha224 => 28,
            HashFunction::Sha384 => 42,
            HashFunction::Sha3_256 => 56,
            HashFunction::Sha3_512 => 70,
            HashFunction::Sha3_224 => 84,
            HashFunction::Sha3_384 => 98,
            HashFunction::Blake2b => 112,
            HashFunction::Blake2s => 126,
        }
    }

    /// Resolve a CHRP hash tag as used by the text post format
    pub fn from_chrp(tag: &str) -> Result<Self, HashError> {
        match tag {
            "a" => Ok(HashFunction::Sha256),
            "b" => Ok(HashFunction::Sha3_256),
            "1a" => Ok(HashFunction::Md5),
            "1b" => Ok(HashFunction::Sha1),
            _ => Err(HashError::UnsupportedHashChrp(tag.to_string())),
        }
    }

    /// CHRP tag, for the functions the text format can name
    pub fn chrp(self) -> Option<&'static str> {
        match self {
            HashFunction::Sha256 => Some("a"),
            HashFunction::Sha3_256 => Some("b"),
            HashFunction::Md5 => Some("1a"),
            HashFunction::Sha1 => Some("1b"),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Md5 => "MD5",
            HashFunction::Sha1 => "SHA1",
            HashFunction::Sha256 => "SHA256",
            HashFunction::Sha512 => "SHA512",
            HashFunction::Sha224 => "SHA224",
            HashFunction::Sha384 => "SHA384",
            HashFunction::Sha3_256 => "SHA3-256",
            HashFunction::Sha3_512 => "SHA3-512",
            HashFunction::Sha3_224 => "SHA3-224",
            HashFunction::Sha3_384 => "SHA3-384",
            HashFunction::Blake2b => "BLAKE2b",
            HashFunction::Blake2s => "BLAKE2s",
        }
    }

    /// Native output size in bytes (maximum for BLAKE2)
    pub fn native_size(self) -> usize {
        match self {
            HashFunction::Md5 => 16,
            HashFunction::Sha1 => 20,
            HashFunction::Sha224 | HashFunction::Sha3_224 => 28,
            HashFunction::Sha256 | HashFunction::Sha3_256 | HashFunction::Blake2s => 32,
            HashFunction::Sha384 | HashFunction::Sha3_384 => 48,
            HashFunction::Sha512 | HashFunction::Sha3_512 | HashFunction::Blake2b => 64,
        }
    }

    /// Start a streaming hash producing `digest_size` bytes
    pub fn hasher(self, digest_size: usize) -> Result<Hasher, HashError> {
        Hasher::new(self, digest_size)
    }

    /// Hash `data` to exactly `digest_size` bytes
    pub fn digest(self, data: &[u8], digest_size: usize) -> Result<Vec<u8>, HashError> {
        let mut hasher = self.hasher(digest_size)?;
        hasher.update(data);
        Ok(hasher.finalize())
    }
}

impl std::fmt::Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

enum HasherState {
    Md5(md5::Md5),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha512(sha2::Sha512),
    Sha224(sha2::Sha224),
    Sha384(sha2::Sha384),
    Sha3_256(sha3::Sha3_256),
    Sha3_512(sha3::Sha3_512),
    Sha3_224(sha3::Sha3_224),
    Sha3_384(sha3::Sha3_384),
    // BLAKE2 is parameterised with the requested length (capped at its
    // maximum), so a 32-byte BLAKE2b is not a truncated 64-byte one.
    Blake2b(Blake2bVar),
    Blake2s(Blake2sVar),
}

/// Incremental hasher for one block
pub struct Hasher {
    state: HasherState,
    digest_size: usize,
}

impl Hasher {
    pub fn new(function: HashFunction, digest_size: usize) -> Result<Self, HashError> {
        if digest_size == 0 {
            return Err(HashError::ZeroDigestSize);
        }
        let native = function.native_size().min(digest_size);
        let state = match function {
            HashFunction::Md5 => HasherState::Md5(md5::Md5::new()),
            HashFunction::Sha1 => HasherState::Sha1(sha1::Sha1::new()),
            HashFunction::Sha256 => HasherState::Sha256(sha2::Sha256::new()),
            HashFunction::Sha512 => HasherState::Sha512(sha2::Sha512::new()),
            HashFunction::Sha224 => HasherState::Sha224(sha2::Sha224::new()),
            HashFunction::Sha384 => HasherState::Sha384(sha2::Sha384::new()),
            HashFunction::Sha3_256 => HasherState::Sha3_256(sha3::Sha3_256::new()),
            HashFunction::Sha3_512 => HasherState::Sha3_512(sha3::Sha3_512::new()),
            HashFunction::Sha3_224 => HasherState::Sha3_224(sha3::Sha3_224::new()),
            HashFunction::Sha3_384 => HasherState::Sha3_384(sha3::Sha3_384::new()),
            HashFunction::Blake2b => HasherState::Blake2b(
                Blake2bVar::new(native).map_err(|_| HashError::ZeroDigestSize)?,
            ),
            HashFunction::Blake2s => HasherState::Blake2s(
                Blake2sVar::new(native).map_err(|_| HashError::ZeroDigestSize)?,
            ),
        };
        Ok(Self { state, digest_size })
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Md5(h) => Digest::update(h, data),
            HasherState::Sha1(h) => Digest::update(h, data),
            HasherState::Sha256(h) => Digest::update(h, data),
            HasherState::Sha512(h) => Digest::update(h, data),
            HasherState::Sha224(h) => Digest::update(h, data),
            HasherState::Sha384(h) => Digest::update(h, data),
            HasherState::Sha3_256(h) => Digest::update(h, data),
            HasherState::Sha3_512(h) => Digest::update(h, data),
            HasherState::Sha3_224(h) => Digest::update(h, data),
            HasherState::Sha3_384(h) => Digest::update(h, data),
            HasherState::Blake2b(h) => Update::update(h, data),
            HasherState::Blake2s(h) => Update::update(h, data),
        }
    }

    /// Finish and return exactly the requested number of bytes
    pub fn finalize(self) -> Vec<u8> {
        let native = match self.state {
            HasherState::Md5(h) => h.finalize().to_vec(),
            HasherState::Sha1(h) => h.finalize().to_vec(),
            HasherState::Sha256(h) => h.finalize().to_vec(),
            HasherState::Sha512(h) => h.finalize().to_vec(),
            HasherState::Sha224(h) => h.finalize().to_vec(),
            HasherState::Sha384(h) => h.finalize().to_vec(),
            HasherState::Sha3_256(h) => h.finalize().to_vec(),
            HasherState::Sha3_512(h) => h.finalize().to_vec(),
            HasherState::Sha3_224(h) => h.finalize().to_vec(),
            HasherState::Sha3_384(h) => h.finalize().to_vec(),
            HasherState::Blake2b(h) => h.finalize_boxed().into_vec(),
            HasherState::Blake2s(h) => h.finalize_boxed().into_vec(),
        };
        stretch_digest(native, self.digest_size)
    }
}

/// Repeat `digest` until it covers `size` bytes, then truncate
pub fn stretch_digest(mut digest: Vec<u8>, size: usize) -> Vec<u8> {
    if digest.is_empty() {
        return vec![0; size];
    }
    while digest.len() < size {
        digest.extend_from_within(..);
    }
    digest.truncate(size);
    digest
}

/// Hash `data` with the function registered under `code`
pub fn digest(code: u64, data: &[u8], digest_size: usize) -> Result<Vec<u8>, HashError> {
    HashFunction::from_code(code)?.digest(data, digest_size)
}

/// Verify that `data` hashes to `expected` under `code`
pub fn verify(code: u64, expected: &[u8], data: &[u8]) -> Result<bool, HashError> {
    if expected.is_empty() {
        return Ok(false);
    }
    Ok(digest(code, data, expected.len())? == expected)
}

/// Parse a text hash config such as `b32` (CHRP tag, then digest length)
pub fn parse_hash_config(text: &str) -> Result<(HashFunction, usize), HashError> {
    let (tag, length) =
        split_chrp_str(text).map_err(|_| HashError::InvalidHashConfig(text.to_string()))?;
    let function = HashFunction::from_chrp(tag)?;
    let digest_size = length
        .parse::<usize>()
        .map_err(|_| HashError::InvalidHashConfig(text.to_string()))?;
    Ok((function, digest_size))
}
