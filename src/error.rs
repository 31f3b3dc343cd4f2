use thiserror::Error;

use crate::metadata::{tables::TableId, token::Token};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Two subsystems never surface these to their callers: custom attribute value decoding and
/// instruction decoding both degrade to empty or truncated results and report through
/// [`crate::metadata::diagnostics::Diagnostics`] instead.
///
/// # Error Categories
///
/// ## File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid metadata structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a buffer
/// - [`Error::NotSupported`] - Input is not an image this crate recognizes
/// - [`Error::Empty`] - Empty input provided
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::GoblinErr`] - PE parsing errors from the goblin crate
///
/// ## Graph Errors
/// - [`Error::TypeNotFound`] - A token does not name a type this module can produce
/// - [`Error::RowNotFound`] - A row id is outside of its table
/// - [`Error::RecursionLimit`] - Maximum signature nesting depth exceeded
/// - [`Error::Disposed`] - The owning module was dropped before a lazy value was computed
///
/// # Examples
///
/// ```rust,no_run
/// use cilgraph::{CilFile, Error};
/// use std::path::Path;
///
/// match CilFile::from_file(Path::new("assembly.dll")) {
///     Ok(Some(file)) => println!("loaded {}", file.module().name()),
///     Ok(None) => eprintln!("not a CLI image"),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    ///
    /// Raised internally when the input carries neither a PE image with a CLR header nor a
    /// bare metadata root. [`crate::CilFile`] turns it into `Ok(None)`.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// The token does not identify a type in this module.
    #[error("Failed to resolve type - {0}")]
    TypeNotFound(Token),

    /// A row id was requested that the table does not contain.
    #[error("Row {rid} does not exist in table {table:?}")]
    RowNotFound {
        /// The table that was queried
        table: TableId,
        /// The requested 1-based row id
        rid: u32,
    },

    /// Recursion limit reached.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The module owning an entity has been dropped, and the requested value had not been
    /// computed before that happened.
    #[error("The owning module has been released")]
    Disposed,

    /// The assembly declares a hash algorithm that public-key-token derivation does not know.
    #[error("Unsupported assembly hash algorithm - 0x{0:04x}")]
    UnsupportedHashAlgorithm(u32),
}
