//! Digest computation over the fixed set of supported algorithms.

use std::fmt;
use std::str::FromStr;

use blake2::digest::consts::U32;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use sha3::digest::{ExtendableOutput, Update, XofReader};

type Blake2b256 = blake2::Blake2b<U32>;

/// Errors raised by the digest function.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DigestError {
    /// The requested algorithm is not in the supported set.
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Supported hash algorithms.
///
/// Wire names are lowercase with `-` separators (`sha512-256`, `sha3-224`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// BLAKE2b with a 256-bit output.
    #[serde(rename = "blake2b256")]
    Blake2b256,
    /// BLAKE2b with a 512-bit output.
    #[serde(rename = "blake2b512")]
    Blake2b512,
    /// MD4.
    #[serde(rename = "md4")]
    Md4,
    /// MD5.
    #[serde(rename = "md5")]
    Md5,
    /// RIPEMD-160.
    #[serde(rename = "ripemd160")]
    Ripemd160,
    /// SHA-1.
    #[serde(rename = "sha1")]
    Sha1,
    /// SHA-224.
    #[serde(rename = "sha224")]
    Sha224,
    /// SHA-256.
    #[serde(rename = "sha256")]
    Sha256,
    /// SHA-384.
    #[serde(rename = "sha384")]
    Sha384,
    /// SHA-512.
    #[serde(rename = "sha512")]
    Sha512,
    /// SHA-512/224.
    #[serde(rename = "sha512-224")]
    Sha512_224,
    /// SHA-512/256.
    #[serde(rename = "sha512-256")]
    Sha512_256,
    /// SHA3-224.
    #[serde(rename = "sha3-224")]
    Sha3_224,
    /// SHA3-256.
    #[serde(rename = "sha3-256")]
    Sha3_256,
    /// SHA3-384.
    #[serde(rename = "sha3-384")]
    Sha3_384,
    /// SHA3-512.
    #[serde(rename = "sha3-512")]
    Sha3_512,
    /// SHAKE128, 128-bit output.
    #[serde(rename = "shake128")]
    Shake128,
    /// SHAKE256, 256-bit output.
    #[serde(rename = "shake256")]
    Shake256,
}

impl HashAlgorithm {
    /// Every supported algorithm, in advertised order.
    pub const ALL: [Self; 18] = [
        Self::Blake2b256,
        Self::Blake2b512,
        Self::Md4,
        Self::Md5,
        Self::Ripemd160,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha512_224,
        Self::Sha512_256,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
        Self::Shake128,
        Self::Shake256,
    ];

    /// Wire name of the algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blake2b256 => "blake2b256",
            Self::Blake2b512 => "blake2b512",
            Self::Md4 => "md4",
            Self::Md5 => "md5",
            Self::Ripemd160 => "ripemd160",
            Self::Sha1 => "sha1",
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha512_224 => "sha512-224",
            Self::Sha512_256 => "sha512-256",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            Self::Shake128 => "shake128",
            Self::Shake256 => "shake256",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Self::Md4 | Self::Md5 | Self::Shake128 => 16,
            Self::Ripemd160 | Self::Sha1 => 20,
            Self::Sha224 | Self::Sha512_224 | Self::Sha3_224 => 28,
            Self::Blake2b256 | Self::Sha256 | Self::Sha512_256 | Self::Sha3_256 | Self::Shake256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Blake2b512 | Self::Sha512 | Self::Sha3_512 => 64,
        }
    }

    /// Wire names of every supported algorithm.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|a| a.as_str()).collect()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| DigestError::UnsupportedAlgorithm(s.to_owned()))
    }
}

/// Hash `input` (as UTF-8 bytes) and return the lowercase hex digest.
pub fn digest_hex(algorithm: HashAlgorithm, input: &str) -> String {
    let data = input.as_bytes();
    match algorithm {
        HashAlgorithm::Blake2b256 => fixed::<Blake2b256>(data),
        HashAlgorithm::Blake2b512 => fixed::<blake2::Blake2b512>(data),
        HashAlgorithm::Md4 => fixed::<md4::Md4>(data),
        HashAlgorithm::Md5 => fixed::<md5::Md5>(data),
        HashAlgorithm::Ripemd160 => fixed::<ripemd::Ripemd160>(data),
        HashAlgorithm::Sha1 => fixed::<sha1::Sha1>(data),
        HashAlgorithm::Sha224 => fixed::<sha2::Sha224>(data),
        HashAlgorithm::Sha256 => fixed::<sha2::Sha256>(data),
        HashAlgorithm::Sha384 => fixed::<sha2::Sha384>(data),
        HashAlgorithm::Sha512 => fixed::<sha2::Sha512>(data),
        HashAlgorithm::Sha512_224 => fixed::<sha2::Sha512_224>(data),
        HashAlgorithm::Sha512_256 => fixed::<sha2::Sha512_256>(data),
        HashAlgorithm::Sha3_224 => fixed::<sha3::Sha3_224>(data),
        HashAlgorithm::Sha3_256 => fixed::<sha3::Sha3_256>(data),
        HashAlgorithm::Sha3_384 => fixed::<sha3::Sha3_384>(data),
        HashAlgorithm::Sha3_512 => fixed::<sha3::Sha3_512>(data),
        HashAlgorithm::Shake128 => xof::<sha3::Shake128>(data, algorithm.output_len()),
        HashAlgorithm::Shake256 => xof::<sha3::Shake256>(data, algorithm.output_len()),
    }
}

/// Parse `algorithm` and hash `input`.
pub fn digest_named(algorithm: &str, input: &str) -> Result<String, DigestError> {
    let algorithm = algorithm.parse::<HashAlgorithm>()?;
    Ok(digest_hex(algorithm, input))
}

fn fixed<D: Digest>(data: &[u8]) -> String {
    hex::encode(D::digest(data))
}

fn xof<X: Default + Update + ExtendableOutput>(data: &[u8], len: usize) -> String {
    let mut hasher = X::default();
    hasher.update(data);
    let mut out = vec![0u8; len];
    hasher.finalize_xof().read(&mut out);
    hex::encode(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn md5_hello() {
        assert_eq!(
            digest_hex(HashAlgorithm::Md5, "hello"),
            "5d41402abc4b2a76b9719d911017c592"
        );
    }

    #[test]
    fn sha1_hello() {
        assert_eq!(
            digest_hex(HashAlgorithm::Sha1, "hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[test]
    fn sha256_vectors() {
        assert_eq!(
            digest_hex(HashAlgorithm::Sha256, "hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(
            digest_hex(HashAlgorithm::Sha256, ""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn empty_input_vectors() {
        assert_eq!(digest_hex(HashAlgorithm::Md4, ""), "31d6cfe0d16ae931b73c59d7e0c089c0");
        assert_eq!(
            digest_hex(HashAlgorithm::Ripemd160, ""),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
        assert_eq!(
            digest_hex(HashAlgorithm::Sha3_256, ""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
        assert_eq!(
            digest_hex(HashAlgorithm::Blake2b512, ""),
            "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
             d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce"
        );
    }

    #[test]
    fn shake_default_lengths() {
        assert_eq!(
            digest_hex(HashAlgorithm::Shake128, ""),
            "7f9c2ba4e88f827d616045507605853e"
        );
        assert_eq!(
            digest_hex(HashAlgorithm::Shake256, ""),
            "46b9dd2b0ba88d13233b3feb743eeb243fcd52ea62b81b82b50c27646ed5762f"
        );
    }

    #[test]
    fn every_algorithm_has_expected_hex_length() {
        for algorithm in HashAlgorithm::ALL {
            let hex = digest_hex(algorithm, "abc");
            assert_eq!(hex.len(), algorithm.output_len() * 2, "{algorithm}");
            assert!(hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        }
    }

    #[test]
    fn names_parse_back() {
        for name in HashAlgorithm::names() {
            let parsed: HashAlgorithm = name.parse().unwrap();
            assert_eq!(parsed.as_str(), name);
        }
        assert_eq!(HashAlgorithm::names().len(), 18);
    }

    #[test]
    fn unsupported_algorithm_fails() {
        assert_matches!(
            digest_named("crc32", "hello"),
            Err(DigestError::UnsupportedAlgorithm(name)) if name == "crc32"
        );
        assert!("SHA256".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&HashAlgorithm::Sha512_256).unwrap();
        assert_eq!(json, r#""sha512-256""#);
        let back: HashAlgorithm = serde_json::from_str(r#""sha3-384""#).unwrap();
        assert_eq!(back, HashAlgorithm::Sha3_384);
    }
}
