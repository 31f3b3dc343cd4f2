//! Assembly names: simple name, version, culture and strong name.

use std::{fmt, str::FromStr};

use crate::{
    metadata::{
        identity::{AssemblyHashAlgorithm, Identity, PublicKeyToken},
        typesystem::AssemblyFlags,
    },
    Error, Result,
};

/// Four-part assembly version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssemblyVersion {
    /// Major component
    pub major: u16,
    /// Minor component
    pub minor: u16,
    /// Build component
    pub build: u16,
    /// Revision component
    pub revision: u16,
}

impl AssemblyVersion {
    /// Create a version from its components
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse one to four dotted components; missing components are zero.
    ///
    /// # Errors
    /// Returns an error if a component is not a 16-bit number.
    pub fn parse(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", text));
        }

        let mut components = [0u16; 4];
        for (component, part) in components.iter_mut().zip(&parts) {
            *component = part
                .trim()
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The identity of an assembly definition or reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssemblyIdentity {
    /// Simple name
    pub name: String,
    /// Version
    pub version: AssemblyVersion,
    /// Culture, `None` when neutral
    pub culture: Option<String>,
    /// `AssemblyFlags`
    pub flags: AssemblyFlags,
    /// Algorithm a full public key is hashed with to form the token
    pub hash_algorithm: AssemblyHashAlgorithm,
    /// Public key or token, `None` if the assembly is not strong-named
    pub strong_name: Option<Identity>,
}

impl AssemblyIdentity {
    /// A weakly named, culture-neutral identity
    #[must_use]
    pub fn new(name: impl Into<String>, version: AssemblyVersion) -> Self {
        AssemblyIdentity {
            name: name.into(),
            version,
            culture: None,
            flags: AssemblyFlags::empty(),
            hash_algorithm: AssemblyHashAlgorithm::None,
            strong_name: None,
        }
    }

    /// The full public key, if the identity carries one
    #[must_use]
    pub fn public_key(&self) -> Option<&[u8]> {
        match &self.strong_name {
            Some(Identity::PublicKey(key)) => Some(key),
            _ => None,
        }
    }

    /// The public key token, stored or derived from the public key
    #[must_use]
    pub fn public_key_token(&self) -> Option<PublicKeyToken> {
        self.strong_name
            .as_ref()
            .map(|identity| identity.token(self.hash_algorithm))
    }

    /// `Name, Version=a.b.c.d, Culture=neutral, PublicKeyToken=xxxxxxxxxxxxxxxx`
    #[must_use]
    pub fn display_name(&self) -> String {
        let token = match self.public_key_token() {
            Some(token) => token.to_string(),
            None => "null".to_string(),
        };

        format!(
            "{}, Version={}, Culture={}, PublicKeyToken={}",
            self.name,
            self.version,
            self.culture.as_deref().unwrap_or("neutral"),
            token
        )
    }

    /// Parse a display name; unknown components are ignored.
    ///
    /// # Errors
    /// Returns an error if the name is empty or a known component is malformed.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut parts = display_name.split(',').map(str::trim);

        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        let mut identity = AssemblyIdentity::new(name, AssemblyVersion::default());
        for part in parts {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };

            match key.trim() {
                "Version" => identity.version = AssemblyVersion::parse(value.trim())?,
                "Culture" => {
                    let value = value.trim();
                    if !value.eq_ignore_ascii_case("neutral") && !value.is_empty() {
                        identity.culture = Some(value.to_string());
                    }
                }
                "PublicKeyToken" => {
                    let value = value.trim();
                    if !value.eq_ignore_ascii_case("null") && !value.is_empty() {
                        identity.strong_name = Some(Identity::Token(PublicKeyToken::parse(value)?));
                    }
                }
                _ => {}
            }
        }

        Ok(identity)
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions() {
        assert_eq!(
            AssemblyVersion::parse("4.0.3").unwrap(),
            AssemblyVersion::new(4, 0, 3, 0)
        );
        assert!(AssemblyVersion::parse("1.2.3.4.5").is_err());
        assert!(AssemblyVersion::parse("1.x").is_err());
        assert!(AssemblyVersion::new(2, 0, 0, 0) > AssemblyVersion::new(1, 9, 9, 9));
    }

    #[test]
    fn display_names() {
        let mscorlib: AssemblyIdentity =
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
                .parse()
                .unwrap();
        assert_eq!(mscorlib.name, "mscorlib");
        assert_eq!(mscorlib.culture, None);
        assert_eq!(
            mscorlib.display_name(),
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
        );

        let mut weak = AssemblyIdentity::new("Sample", AssemblyVersion::new(1, 2, 3, 4));
        weak.culture = Some("de-DE".to_string());
        assert_eq!(
            weak.to_string(),
            "Sample, Version=1.2.3.4, Culture=de-DE, PublicKeyToken=null"
        );
        assert!(AssemblyIdentity::parse(", Version=1.0").is_err());
    }

    #[test]
    fn derived_token() {
        let mut identity = AssemblyIdentity::new("System.Private.CoreLib", AssemblyVersion::new(8, 0, 0, 0));
        identity.flags = AssemblyFlags::PUBLIC_KEY;
        identity.hash_algorithm = AssemblyHashAlgorithm::SHA1;
        identity.strong_name = Some(Identity::PublicKey(vec![0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0]));

        assert_eq!(
            identity.public_key_token().unwrap().to_string(),
            "b77a5c561934e089"
        );
        assert_eq!(identity.public_key().map(<[u8]>::len), Some(16));
    }
}
