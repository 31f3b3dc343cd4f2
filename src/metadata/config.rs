//! Loader configuration
//!
//! Bounds for the recursive and heuristic parts of decoding. None of these change what a
//! well-formed image decodes to; they only decide how much work hostile or unusual input may
//! cause before the affected value is abandoned.

/// Limits applied while decoding an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum nesting of a type signature (generic arguments, arrays, pointers, modifiers)
    /// before [`crate::Error::RecursionLimit`] is raised
    pub max_signature_depth: usize,

    /// Maximum nesting of boxed and array values inside a custom attribute blob
    pub max_attribute_nesting: usize,

    /// Maximum number of full decode attempts spent guessing enum widths for one attribute
    pub max_enum_width_attempts: usize,

    /// Whether method bodies are read at all; when false every method reports no body
    pub decode_method_bodies: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_signature_depth: 64,
            max_attribute_nesting: 16,
            max_enum_width_attempts: 64,
            decode_method_bodies: true,
        }
    }
}

impl LoaderConfig {
    /// Tight limits for untrusted input
    ///
    /// Enough enum guesses to cover one unknown enum type per attribute.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_signature_depth: 32,
            max_attribute_nesting: 8,
            max_enum_width_attempts: 8,
            decode_method_bodies: true,
        }
    }

    /// Generous limits for heavily generic or obfuscated images
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            max_signature_depth: 256,
            max_attribute_nesting: 64,
            max_enum_width_attempts: 4096,
            decode_method_bodies: true,
        }
    }

    /// Metadata only: the same limits as [`LoaderConfig::default`], without method bodies
    #[must_use]
    pub fn metadata_only() -> Self {
        Self {
            decode_method_bodies: false,
            ..Self::default()
        }
    }
}
