//! Assembly identity: names, versions, strong-name keys and public key tokens.
//!
//! A public key token is an 8-byte summary of an assembly's public key: the key is hashed
//! with the assembly's hash algorithm (SHA-1 when none is declared) and the last 8 bytes of
//! the digest, reversed, form the token.
//!
//! ```rust
//! use cilgraph::metadata::identity::{public_key_token, AssemblyHashAlgorithm};
//!
//! let ecma_key = [0u8, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];
//! let token = public_key_token(&ecma_key, AssemblyHashAlgorithm::SHA1);
//! assert_eq!(token.to_string(), "b77a5c561934e089");
//! ```

pub use assembly::{AssemblyIdentity, AssemblyVersion};
pub use cryptographic::{public_key_token, AssemblyHashAlgorithm, Identity, PublicKeyToken};

mod assembly;
mod cryptographic;
