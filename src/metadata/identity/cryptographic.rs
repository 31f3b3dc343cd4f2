//! Strong-name keys and the public key token derived from them (II.6.2.1.3).

use std::fmt;

use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::{Error::UnsupportedHashAlgorithm, Result};

/// The hash algorithm of an assembly's `HashAlgId` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssemblyHashAlgorithm {
    /// No algorithm declared; tokens are computed with SHA-1
    None,
    /// MD5
    MD5,
    /// SHA-1
    SHA1,
    /// SHA-256
    SHA256,
    /// SHA-384
    SHA384,
    /// SHA-512
    SHA512,
}

impl AssemblyHashAlgorithm {
    /// Map an `ALG_ID` value.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedHashAlgorithm`] for any other value.
    pub fn from_u32(value: u32) -> Result<Self> {
        Ok(match value {
            0x0000 => AssemblyHashAlgorithm::None,
            0x8003 => AssemblyHashAlgorithm::MD5,
            0x8004 => AssemblyHashAlgorithm::SHA1,
            0x800C => AssemblyHashAlgorithm::SHA256,
            0x800D => AssemblyHashAlgorithm::SHA384,
            0x800E => AssemblyHashAlgorithm::SHA512,
            other => return Err(UnsupportedHashAlgorithm(other)),
        })
    }

    /// The `ALG_ID` value
    #[must_use]
    pub fn to_u32(self) -> u32 {
        match self {
            AssemblyHashAlgorithm::None => 0x0000,
            AssemblyHashAlgorithm::MD5 => 0x8003,
            AssemblyHashAlgorithm::SHA1 => 0x8004,
            AssemblyHashAlgorithm::SHA256 => 0x800C,
            AssemblyHashAlgorithm::SHA384 => 0x800D,
            AssemblyHashAlgorithm::SHA512 => 0x800E,
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            AssemblyHashAlgorithm::MD5 => Md5::digest(data).to_vec(),
            AssemblyHashAlgorithm::None | AssemblyHashAlgorithm::SHA1 => Sha1::digest(data).to_vec(),
            AssemblyHashAlgorithm::SHA256 => Sha256::digest(data).to_vec(),
            AssemblyHashAlgorithm::SHA384 => Sha384::digest(data).to_vec(),
            AssemblyHashAlgorithm::SHA512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// An 8-byte public key token, in display order
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyToken(pub [u8; 8]);

impl PublicKeyToken {
    /// The token bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Parse 16 hex digits.
    ///
    /// # Errors
    /// Returns an error if `text` is not exactly 16 hex digits.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() != 16 || !text.is_ascii() {
            return Err(malformed_error!(
                "PublicKeyToken must be 16 hex characters, got '{}'",
                text
            ));
        }

        let mut bytes = [0u8; 8];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&text[index * 2..index * 2 + 2], 16)
                .map_err(|e| malformed_error!("Invalid hex in PublicKeyToken '{}': {}", text, e))?;
        }
        Ok(PublicKeyToken(bytes))
    }
}

impl fmt::Display for PublicKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for PublicKeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyToken({self})")
    }
}

/// Derive the public key token: the last 8 bytes of the key's digest, in reverse order.
#[must_use]
pub fn public_key_token(public_key: &[u8], algorithm: AssemblyHashAlgorithm) -> PublicKeyToken {
    let digest = algorithm.digest(public_key);

    let mut token = [0u8; 8];
    for (slot, byte) in token.iter_mut().zip(digest.iter().rev()) {
        *slot = *byte;
    }
    PublicKeyToken(token)
}

/// The strong-name part of an assembly identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// The full public key
    PublicKey(Vec<u8>),
    /// A token standing for a key that is not stored
    Token(PublicKeyToken),
}

impl Identity {
    /// Interpret a `PublicKey` / `PublicKeyOrToken` blob; `is_public_key` comes from the
    /// `PublicKey` assembly flag. An empty blob means no strong name.
    ///
    /// # Errors
    /// Returns an error if a token blob is not 8 bytes long.
    pub fn from_blob(data: &[u8], is_public_key: bool) -> Result<Option<Self>> {
        if data.is_empty() {
            return Ok(None);
        }
        if is_public_key {
            return Ok(Some(Identity::PublicKey(data.to_vec())));
        }

        let token: [u8; 8] = data
            .try_into()
            .map_err(|_| malformed_error!("Public key token has {} bytes", data.len()))?;
        Ok(Some(Identity::Token(PublicKeyToken(token))))
    }

    /// The token, hashing a full key with `algorithm`
    #[must_use]
    pub fn token(&self, algorithm: AssemblyHashAlgorithm) -> PublicKeyToken {
        match self {
            Identity::PublicKey(key) => public_key_token(key, algorithm),
            Identity::Token(token) => *token,
        }
    }
}
