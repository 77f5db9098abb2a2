//! Interoperability tests
//!
//! Fixed vectors for records, digests and trees that other implementations
//! produce; any change here breaks existing tree hashes.

use blocktree_core::{
    digest, from_hex, hash_blocktree, lb32encode, parse_hash_config, split_blockhash, to_hex,
    BlockHash, HashFunction, TreeHash, TreeParams,
};

#[test]
fn test_blockhash_vectors() {
    let hello = BlockHash::create(HashFunction::Sha3_256, 32, b"Hello, world!").unwrap();
    assert_eq!(
        hello.to_lb32(),
        "hag7grncdhnaaxv6tqnb5kwzpo7triimqrz6ihik675wc7fkbrvkoiq"
    );

    let empty = BlockHash::create(HashFunction::Sha3_256, 16, b"").unwrap();
    assert_eq!(empty.to_lb32(), "haakp76g7c7r5v3gkhauovvamhlge");
    assert_eq!(lb32encode(&empty.to_bytes()), empty.to_string());

    let blake = BlockHash::create(HashFunction::Blake2b, 16, b"abc").unwrap();
    assert_eq!(blake.to_hex(), "7003cf4ab791c62b8d2b2109c90275287816");
}

#[test]
fn test_digest_vectors() {
    let cases: &[(u64, &[u8], usize, &str)] = &[
        (3, b"abc", 32, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"),
        (1, b"", 20, "d41d8cd98f00b204e9800998ecf8427ed41d8cd9"),
        (70, b"abc", 24, "b751850b1a57168a5693cd924b6b096e08f621827444f70d"),
        (126, b"abc", 20, "5ae3b99be29b01834c3b508521ede60438f8de17"),
    ];
    for (code, data, size, expected) in cases {
        assert_eq!(to_hex(&digest(*code, data, *size).unwrap()), *expected, "code {}", code);
    }
}

#[test]
fn test_tree_hash_vectors() {
    let data: Vec<u8> = (0..167).map(|i| (i % 251) as u8).collect();
    let params = TreeParams::new(HashFunction::Sha3_256, 32, 64);
    assert_eq!(
        hash_blocktree(&params, &data).unwrap().tree_hash.to_hex(),
        "3840e13212fcb5205137b24dc80e9c59298f09af354fae7c2f018d08ce9d1b17a9fa"
    );

    let data: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
    let params = TreeParams::new(HashFunction::Sha256, 16, 64);
    assert_eq!(
        hash_blocktree(&params, &data).unwrap().tree_hash.to_hex(),
        "03408d9b74ae38e4313f95aa59f293bfc832"
    );

    let params = TreeParams::default().with_block_size(256);
    assert_eq!(
        hash_blocktree(&params, b"").unwrap().tree_hash.to_hex(),
        "388100a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
    );
}

#[test]
fn test_tree_hash_decodes() {
    let bytes =
        from_hex("388100a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a").unwrap();
    let tree_hash = TreeHash::from_bytes(&bytes).unwrap();
    assert_eq!(tree_hash.function().unwrap(), HashFunction::Sha3_256);
    assert_eq!(tree_hash.block_size, 256);
    assert_eq!(tree_hash.digest_size(), 32);

    let (code, block_size, digest) = split_blockhash(&bytes).unwrap();
    assert_eq!((code, block_size, digest.len()), (56, 256, 32));
}

#[test]
fn test_hash_config_vectors() {
    assert_eq!(parse_hash_config("b32").unwrap(), (HashFunction::Sha3_256, 32));
    assert_eq!(parse_hash_config("a16").unwrap(), (HashFunction::Sha256, 16));
    assert_eq!(parse_hash_config("1a16").unwrap(), (HashFunction::Md5, 16));
}
