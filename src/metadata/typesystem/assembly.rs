//! Assembly-level entities: the assembly definition, assembly references and module
//! references.

use std::sync::Arc;

use crate::{
    metadata::{
        customattributes::CustomAttribute,
        identity::{AssemblyHashAlgorithm, AssemblyIdentity, AssemblyVersion, Identity, PublicKeyToken},
        reader::MetadataReader,
        tables::{AssemblyRefRow, AssemblyRow, ModuleRefRow, TableId},
        token::Token,
        typesystem::{AssemblyFlags, Module, TypeDefinition},
    },
    Result,
};

fn culture(reader: &MetadataReader, offset: u32) -> Result<Option<String>> {
    let culture = reader.string(offset)?;
    Ok((!culture.is_empty()).then(|| culture.to_string()))
}

/// An assembly: one manifest module plus the identity declared in its `Assembly` row
#[derive(Debug)]
pub struct Assembly {
    module: Arc<Module>,
    identity: AssemblyIdentity,
}

impl Assembly {
    /// Wrap `module` if it declares an assembly identity.
    ///
    /// # Errors
    /// Returns an error if the `Assembly` row, its heaps or its hash algorithm are invalid.
    pub(crate) fn load(module: Arc<Module>) -> Result<Option<Arc<Assembly>>> {
        let reader = module.metadata();
        if reader.row_count(TableId::Assembly) == 0 {
            return Ok(None);
        }

        let row: AssemblyRow = reader.row(1)?;
        let flags = AssemblyFlags::from_bits_retain(row.flags);
        let identity = AssemblyIdentity {
            name: reader.string(row.name)?.to_string(),
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture: culture(reader, row.culture)?,
            flags,
            hash_algorithm: AssemblyHashAlgorithm::from_u32(row.hash_alg_id)?,
            // A definition always stores the full key
            strong_name: Identity::from_blob(reader.blob(row.public_key)?, true)?,
        };

        Ok(Some(Arc::new(Assembly { module, identity })))
    }

    /// The `Assembly` token
    #[must_use]
    pub fn token(&self) -> Token {
        Token::from_parts(TableId::Assembly, 1)
    }

    /// The manifest module
    #[must_use]
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Name, version, culture and strong name
    #[must_use]
    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }

    /// Simple name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Version
    #[must_use]
    pub fn version(&self) -> AssemblyVersion {
        self.identity.version
    }

    /// Token of the public key, hashed with the declared algorithm
    #[must_use]
    pub fn public_key_token(&self) -> Option<PublicKeyToken> {
        self.identity.public_key_token()
    }

    /// `Name, Version=a.b.c.d, Culture=neutral, PublicKeyToken=xxxxxxxxxxxxxxxx`
    #[must_use]
    pub fn display_name(&self) -> String {
        self.identity.display_name()
    }

    /// Custom attributes applied to the assembly.
    ///
    /// # Errors
    /// Returns an error if an attribute row cannot be read.
    pub fn custom_attributes(&self) -> Result<Vec<Arc<CustomAttribute>>> {
        self.module.custom_attributes_of(self.token())
    }

    /// Every type definition of the manifest module.
    ///
    /// # Errors
    /// Returns an error if a type row cannot be read.
    pub fn types(&self) -> Result<Vec<Arc<TypeDefinition>>> {
        self.module.types()
    }
}

/// A dependency on another assembly
#[derive(Debug)]
pub struct AssemblyReference {
    token: Token,
    identity: AssemblyIdentity,
    hash_value: Vec<u8>,
}

impl AssemblyReference {
    pub(crate) fn read(rid: u32, reader: &MetadataReader) -> Result<AssemblyReference> {
        let row: AssemblyRefRow = reader.row(rid)?;
        let flags = AssemblyFlags::from_bits_retain(row.flags);
        let identity = AssemblyIdentity {
            name: reader.string(row.name)?.to_string(),
            version: AssemblyVersion::new(
                row.major_version,
                row.minor_version,
                row.build_number,
                row.revision_number,
            ),
            culture: culture(reader, row.culture)?,
            flags,
            // References carry no algorithm; tokens of full keys use SHA-1
            hash_algorithm: AssemblyHashAlgorithm::None,
            strong_name: Identity::from_blob(
                reader.blob(row.public_key_or_token)?,
                flags.contains(AssemblyFlags::PUBLIC_KEY),
            )?,
        };

        Ok(AssemblyReference {
            token: Token::from_parts(TableId::AssemblyRef, rid),
            identity,
            hash_value: reader.blob(row.hash_value)?.to_vec(),
        })
    }

    /// The `AssemblyRef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Name, version, culture and strong name
    #[must_use]
    pub fn identity(&self) -> &AssemblyIdentity {
        &self.identity
    }

    /// Simple name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// The public key token, stored or derived from the stored key
    #[must_use]
    pub fn public_key_token(&self) -> Option<PublicKeyToken> {
        self.identity.public_key_token()
    }

    /// Hash of the referenced file, usually empty
    #[must_use]
    pub fn hash_value(&self) -> &[u8] {
        &self.hash_value
    }

    /// `Name, Version=a.b.c.d, Culture=neutral, PublicKeyToken=xxxxxxxxxxxxxxxx`
    #[must_use]
    pub fn display_name(&self) -> String {
        self.identity.display_name()
    }
}

/// A reference to another module of the same assembly or a native library
#[derive(Debug)]
pub struct ModuleReference {
    token: Token,
    name: String,
}

impl ModuleReference {
    pub(crate) fn read(rid: u32, reader: &MetadataReader) -> Result<ModuleReference> {
        let row: ModuleRefRow = reader.row(rid)?;
        Ok(ModuleReference {
            token: Token::from_parts(TableId::ModuleRef, rid),
            name: reader.string(row.name)?.to_string(),
        })
    }

    /// The `ModuleRef` token
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Referenced module or library name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
