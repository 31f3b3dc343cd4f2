//! Publish-once cells for derived entity fields.

use std::{fmt, sync::OnceLock};

use crate::Result;

/// A value computed on first access and published exactly once.
///
/// Racing callers may each run the computation; the first value stored wins and every caller
/// observes that value afterwards. Computations must therefore be pure functions of
/// immutable inputs. A failed computation publishes nothing, so the next access retries.
pub struct Lazy<T> {
    cell: OnceLock<T>,
}

impl<T> Lazy<T> {
    /// An empty cell
    #[must_use]
    pub const fn new() -> Self {
        Lazy {
            cell: OnceLock::new(),
        }
    }

    /// A cell that already holds `value`
    #[must_use]
    pub fn with_value(value: T) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value);
        Lazy { cell }
    }

    /// The published value, if any
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// True once a value has been published
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Return the published value, computing and publishing it first if needed.
    ///
    /// # Errors
    /// Returns the error of `init` if no value was published yet and the computation failed.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<&T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value);
        }

        let value = init()?;
        Ok(self.cell.get_or_init(move || value))
    }

    /// Infallible form of [`Lazy::get_or_try_init`]
    pub fn get_or_init<F>(&self, init: F) -> &T
    where
        F: FnOnce() -> T,
    {
        if let Some(value) = self.cell.get() {
            return value;
        }

        let value = init();
        self.cell.get_or_init(move || value)
    }
}

impl<T> Default for Lazy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.get() {
            Some(value) => f.debug_tuple("Lazy").field(value).finish(),
            None => f.write_str("Lazy(<pending>)"),
        }
    }
}
