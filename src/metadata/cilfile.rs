//! Opening images: PE files with a CLR header, or bare metadata roots.
//!
//! Input that is not in one of these formats opens as `Ok(None)`; only I/O failures and
//! images that claim the format but are malformed are errors.

use std::{path::Path, sync::Arc};

use tracing::debug;

use crate::{
    file::File,
    metadata::{
        config::LoaderConfig,
        diagnostics::Diagnostics,
        reader::MetadataReader,
        typesystem::{Assembly, Module},
    },
    Error::{Empty, GoblinErr, NotSupported},
    Result,
};

/// An opened image: an assembly when it declares an identity, otherwise a bare module
#[derive(Debug, Clone)]
pub enum CilFile {
    /// A manifest module with an `Assembly` row
    Assembly(Arc<Assembly>),
    /// A module without assembly identity
    Module(Arc<Module>),
}

impl CilFile {
    /// Open the image at `path` with the default configuration.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, or an error if a
    /// recognized image is malformed.
    pub fn from_file(path: &Path) -> Result<Option<CilFile>> {
        Self::from_file_with_config(path, LoaderConfig::default())
    }

    /// Open the image at `path`.
    ///
    /// # Errors
    /// See [`CilFile::from_file`].
    pub fn from_file_with_config(path: &Path, config: LoaderConfig) -> Result<Option<CilFile>> {
        match recognized(File::from_file(path))? {
            Some(file) => Self::open(file, config, Arc::new(Diagnostics::new())),
            None => Ok(None),
        }
    }

    /// Open an image held in memory with the default configuration.
    ///
    /// # Errors
    /// Returns an error if a recognized image is malformed.
    pub fn from_mem(data: Vec<u8>) -> Result<Option<CilFile>> {
        Self::from_mem_with_config(data, LoaderConfig::default())
    }

    /// Open an image held in memory.
    ///
    /// # Errors
    /// See [`CilFile::from_mem`].
    pub fn from_mem_with_config(data: Vec<u8>, config: LoaderConfig) -> Result<Option<CilFile>> {
        match recognized(File::from_mem(data))? {
            Some(file) => Self::open(file, config, Arc::new(Diagnostics::new())),
            None => Ok(None),
        }
    }

    /// Open a loaded image, reporting decoding faults to `diagnostics`.
    ///
    /// # Errors
    /// Returns an error if the metadata root, table stream or `Module` row is malformed.
    pub fn open(
        file: File,
        config: LoaderConfig,
        diagnostics: Arc<Diagnostics>,
    ) -> Result<Option<CilFile>> {
        let Some(reader) = MetadataReader::new(file)? else {
            debug!("no metadata root, image not recognized");
            return Ok(None);
        };

        let module = Module::new(reader, config, diagnostics)?;
        let opened = match Assembly::load(module.clone())? {
            Some(assembly) => CilFile::Assembly(assembly),
            None => CilFile::Module(module),
        };
        debug!(module = opened.module().name(), assembly = opened.is_assembly(), "image opened");
        Ok(Some(opened))
    }

    /// The (manifest) module
    #[must_use]
    pub fn module(&self) -> &Arc<Module> {
        match self {
            CilFile::Assembly(assembly) => assembly.module(),
            CilFile::Module(module) => module,
        }
    }

    /// The assembly, if the image declares one
    #[must_use]
    pub fn assembly(&self) -> Option<&Arc<Assembly>> {
        match self {
            CilFile::Assembly(assembly) => Some(assembly),
            CilFile::Module(_) => None,
        }
    }

    /// True if the image declares an assembly identity
    #[must_use]
    pub fn is_assembly(&self) -> bool {
        matches!(self, CilFile::Assembly(_))
    }

    /// Decoding faults collected while reading the image
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        self.module().diagnostics()
    }
}

/// Map the "not this format" errors of loading to `None`
fn recognized(file: Result<File>) -> Result<Option<File>> {
    match file {
        Ok(file) => Ok(Some(file)),
        Err(Empty | NotSupported) => Ok(None),
        Err(GoblinErr(error)) => {
            debug!(%error, "not a PE image");
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::MetadataBuilder;

    #[test]
    fn unrecognized_input() {
        assert!(CilFile::from_mem(Vec::new()).unwrap().is_none());
        assert!(CilFile::from_mem(b"hello, world".to_vec()).unwrap().is_none());
        assert!(CilFile::from_mem(b"MZ\x00\x00garbage".to_vec()).unwrap().is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = CilFile::from_file(Path::new("/nonexistent/cilgraph/image.dll"));
        assert!(matches!(result, Err(crate::Error::FileError(_))));
    }

    #[test]
    fn bare_metadata_opens_as_module() {
        let file = CilFile::from_mem(MetadataBuilder::new("Bare").build())
            .unwrap()
            .unwrap();
        assert!(!file.is_assembly());
        assert_eq!(file.module().name(), "Bare");
        assert!(file.assembly().is_none());
    }

    #[test]
    fn assembly_row_opens_as_assembly() {
        let mut builder = MetadataBuilder::new("Lib");
        builder.assembly("Lib", (1, 2, 3, 4), &[]);
        let file = CilFile::from_mem(builder.build()).unwrap().unwrap();

        let assembly = file.assembly().unwrap();
        assert_eq!(assembly.name(), "Lib");
        assert_eq!(
            assembly.display_name(),
            "Lib, Version=1.2.3.4, Culture=neutral, PublicKeyToken=null"
        );
        assert!(Arc::ptr_eq(file.module(), assembly.module()));
    }
}
