//! Shared configuration for blocktree tools
//!
//! Reads from ~/.blocktree/config.toml

use anyhow::{bail, Context, Result};
use blocktree_core::{
    parse_hash_config, split_chrp_str, BuilderConfig, DigestLimits, HashFunction, KdfParams,
    SignatureType, Store, TreeParams, TreeReader, DEFAULT_BLOCK_SIZE, DEFAULT_DIGEST_SIZE,
    MAX_DIGEST_SIZE, MIN_DIGEST_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Top-level config structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub signing: SigningConfig,
}

/// Tree building configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Hash function: CHRP tag ("a", "b", "1a") or numeric code ("56")
    #[serde(default = "default_hash")]
    pub hash: String,
    /// Hash config such as "b32"; overrides `hash` and `digest_size`
    #[serde(default)]
    pub hash_config: Option<String>,
    #[serde(default = "default_digest_size")]
    pub digest_size: usize,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    #[serde(default = "default_min_digest_size")]
    pub min_digest_size: usize,
    #[serde(default = "default_max_digest_size")]
    pub max_digest_size: usize,
    /// Check fetched blocks against their digests
    #[serde(default = "default_true")]
    pub verify_reads: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            hash: default_hash(),
            hash_config: None,
            digest_size: default_digest_size(),
            block_size: default_block_size(),
            min_digest_size: default_min_digest_size(),
            max_digest_size: default_max_digest_size(),
            verify_reads: true,
        }
    }
}

fn default_hash() -> String {
    "b".to_string()
}

fn default_digest_size() -> usize {
    DEFAULT_DIGEST_SIZE
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_min_digest_size() -> usize {
    MIN_DIGEST_SIZE
}

fn default_max_digest_size() -> usize {
    MAX_DIGEST_SIZE
}

fn default_true() -> bool {
    true
}

impl TreeConfig {
    /// Resolve the configured hash function
    pub fn hash_function(&self) -> Result<HashFunction> {
        if let Some(text) = &self.hash_config {
            let (function, _) = parse_hash_config(text)
                .with_context(|| format!("Invalid hash_config {:?}", text))?;
            return Ok(function);
        }
        if let Ok(code) = self.hash.parse::<u64>() {
            return HashFunction::from_code(code)
                .with_context(|| format!("Invalid hash {:?}", self.hash));
        }
        HashFunction::from_chrp(&self.hash).with_context(|| format!("Invalid hash {:?}", self.hash))
    }

    pub fn limits(&self) -> DigestLimits {
        DigestLimits::new(self.min_digest_size, self.max_digest_size)
    }

    /// Tree parameters, checked against the configured digest limits
    pub fn params(&self) -> Result<TreeParams> {
        let digest_size = match &self.hash_config {
            Some(text) => parse_hash_config(text)?.1,
            None => self.digest_size,
        };
        let params = TreeParams::new(self.hash_function()?, digest_size, self.block_size);
        params
            .validate(&self.limits())
            .context("Invalid tree configuration")?;
        Ok(params)
    }

    /// Builder configuration over `store` with these parameters and limits
    pub fn builder_config<S: Store + ?Sized>(&self, store: Arc<S>) -> Result<BuilderConfig<S>> {
        Ok(BuilderConfig::new(store)
            .with_params(self.params()?)
            .with_digest_limits(self.limits()))
    }

    /// Reader over `store` honouring `verify_reads`
    pub fn reader<S: Store + ?Sized>(&self, store: Arc<S>) -> TreeReader<S> {
        TreeReader::new(store).with_verification(self.verify_reads)
    }
}

/// Signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Signature scheme CHRP: "a" (Ed25519) or "b" (secp256k1)
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// scrypt cost as log2(N)
    #[serde(default = "default_kdf_log_n")]
    pub kdf_log_n: u8,
    #[serde(default = "default_kdf_r")]
    pub kdf_r: u32,
    #[serde(default = "default_kdf_p")]
    pub kdf_p: u32,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            kdf_log_n: default_kdf_log_n(),
            kdf_r: default_kdf_r(),
            kdf_p: default_kdf_p(),
        }
    }
}

fn default_scheme() -> String {
    "a".to_string()
}

fn default_kdf_log_n() -> u8 {
    KdfParams::default().log_n
}

fn default_kdf_r() -> u32 {
    KdfParams::default().r
}

fn default_kdf_p() -> u32 {
    KdfParams::default().p
}

impl SigningConfig {
    pub fn signature_type(&self) -> Result<SignatureType> {
        SignatureType::from_chrp(&self.scheme)
            .with_context(|| format!("Invalid signing scheme {:?}", self.scheme))
    }

    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::new(self.kdf_log_n, self.kdf_r, self.kdf_p)
    }
}

impl Config {
    /// Load config from file, or create default if doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load config, returning default on any error (no panic)
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path())
    }

    /// Save config to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }
}

/// Get the blocktree directory (~/.blocktree)
pub fn get_blocktree_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BLOCKTREE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blocktree")
}

/// Get the config file path (~/.blocktree/config.toml)
pub fn get_config_path() -> PathBuf {
    get_blocktree_dir().join("config.toml")
}

/// Get the keys file path (~/.blocktree/keys)
pub fn get_keys_path() -> PathBuf {
    get_blocktree_dir().join("keys")
}

/// A stored key entry from the keys file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEntry {
    pub scheme: SignatureType,
    pub private_key: Vec<u8>,
    /// Optional alias/petname
    pub alias: Option<String>,
}

/// Parse the keys file content into key entries
/// Format: `<scheme chrp><hex private key> [alias]` per line, e.g. `a05a1... self`
/// Lines starting with # are comments
pub fn parse_keys_file(content: &str) -> Result<Vec<KeyEntry>> {
    let mut entries = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, ' ');
        let key = parts.next().unwrap_or_default();
        let alias = parts.next().map(|s| s.trim().to_string());

        let Ok((tag, key_hex)) = split_chrp_str(key) else {
            bail!("keys file line {}: incomplete scheme tag", number + 1);
        };
        let scheme = SignatureType::from_chrp(tag)
            .with_context(|| format!("keys file line {}", number + 1))?;
        let private_key = hex::decode(key_hex)
            .with_context(|| format!("keys file line {}: key is not hex", number + 1))?;
        // Rejects keys the scheme cannot use
        scheme
            .derive_public_key(&private_key)
            .with_context(|| format!("keys file line {}", number + 1))?;
        entries.push(KeyEntry {
            scheme,
            private_key,
            alias,
        });
    }
    Ok(entries)
}

/// Read and parse keys file, returning the first entry
/// Returns None if file doesn't exist, is empty or unreadable
pub fn read_first_key() -> Option<KeyEntry> {
    let content = fs::read_to_string(get_keys_path()).ok()?;
    parse_keys_file(&content).ok()?.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        let params = config.tree.params().unwrap();
        assert_eq!(params, TreeParams::default());
        assert_eq!(config.signing.signature_type().unwrap(), SignatureType::Ed25519);
        assert_eq!(config.signing.kdf_params(), KdfParams::default());
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tree.block_size, DEFAULT_BLOCK_SIZE);
        assert!(config.tree.verify_reads);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[tree]
hash = "a"
block_size = 4096
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let params = config.tree.params().unwrap();
        assert_eq!(params.hash_function, HashFunction::Sha256);
        assert_eq!(params.block_size, 4096);
        assert_eq!(params.digest_size, DEFAULT_DIGEST_SIZE);
        assert_eq!(config.signing.scheme, "a");
    }

    #[test]
    fn test_hash_by_code() {
        let toml = r#"
[tree]
hash = "112"
digest_size = 64
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.tree.hash_function().unwrap(), HashFunction::Blake2b);
        assert_eq!(config.tree.params().unwrap().digest_size, 64);
    }

    #[test]
    fn test_hash_config_overrides() {
        let toml = r#"
[tree]
hash = "a"
hash_config = "1b20"
digest_size = 32
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let params = config.tree.params().unwrap();
        assert_eq!(params.hash_function, HashFunction::Sha1);
        assert_eq!(params.digest_size, 20);
    }

    #[test]
    fn test_invalid_tree_config() {
        let mut tree = TreeConfig::default();
        tree.hash = "q".to_string();
        assert!(tree.params().is_err());

        let mut tree = TreeConfig::default();
        tree.digest_size = 8;
        assert!(tree.params().is_err());
        tree.min_digest_size = 8;
        assert_eq!(tree.params().unwrap().digest_size, 8);

        let mut tree = TreeConfig::default();
        tree.block_size = 0;
        assert!(tree.params().is_err());
    }

    #[test]
    fn test_signing_config() {
        let toml = r#"
[signing]
scheme = "b"
kdf_log_n = 4
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.signing.signature_type().unwrap(), SignatureType::Secp256k1);
        assert_eq!(config.signing.kdf_params(), KdfParams::new(4, 8, 1));

        let mut signing = SigningConfig::default();
        signing.scheme = "c".to_string();
        assert!(signing.signature_type().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.tree.block_size = 1024;
        config.signing.scheme = "b".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.tree.block_size, 1024);
        assert_eq!(loaded.signing.scheme, "b");
    }

    #[test]
    fn test_load_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[tree\nblock_size = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_parse_keys_file() {
        let content = r#"
a05a1107a527319eb9a9da9e187ea63b0f83d8d35d8f660e024538aa52f6dac23 self
# comment line
b1d9d2bc60f0d748b1ca5d8b089fc324eed1c7556e15071bffa6e0edb95ab118d work

a7fd08452951587f482b831604ced6cf9c6408a6dada50bd6397bac772b929fa6
"#;
        let entries = parse_keys_file(content).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].scheme, SignatureType::Ed25519);
        assert_eq!(entries[0].alias, Some("self".to_string()));
        assert_eq!(entries[1].scheme, SignatureType::Secp256k1);
        assert_eq!(entries[1].alias, Some("work".to_string()));
        assert_eq!(entries[2].private_key.len(), 32);
        assert_eq!(entries[2].alias, None);
    }

    #[test]
    fn test_parse_keys_file_rejects_bad_lines() {
        assert!(parse_keys_file("zabcdef").is_err());
        assert!(parse_keys_file("axyz").is_err());
        assert!(parse_keys_file("a0102").is_err());
    }

    #[test]
    fn test_parse_keys_file_multi_char_tag() {
        // "2ab" declares a three-character tag, not scheme "2"
        let err = parse_keys_file("2ab05a1107a527319eb9a9da9e187ea63b0f83d8d35d8f660e024538aa52f6dac23")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("\"2ab\""));
        assert!(parse_keys_file("3ab").is_err());
    }

    #[test]
    fn test_reader_follows_verify_reads() {
        use blocktree_core::{MemoryStore, TreeBuilder};

        let store = Arc::new(MemoryStore::new());
        let mut tree = TreeConfig::default();
        tree.block_size = 64;
        let data = vec![7u8; 100];
        let result = TreeBuilder::new(tree.builder_config(store.clone()).unwrap())
            .put(&data)
            .unwrap();

        let first_leaf = blocktree_core::BlockHash::create(HashFunction::Sha3_256, 32, &data[..64]).unwrap();
        assert!(store.replace(&first_leaf, vec![8u8; 64]));

        assert!(tree.reader(store.clone()).read_all(&result.tree_hash, result.size).is_err());
        tree.verify_reads = false;
        let unchecked = tree.reader(store).read_all(&result.tree_hash, result.size).unwrap();
        assert_eq!(unchecked[..64], [8u8; 64]);
    }
}
