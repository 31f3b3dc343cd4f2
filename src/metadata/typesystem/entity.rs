//! Non-owning entity handles.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, Weak},
};

use crate::{Error::Disposed, Result};

/// A weak handle to an entity owned by a module.
///
/// Upward and sideways links in the graph (member to declaring type, signature to named type)
/// use this handle, so the graph holds no reference cycles. Equality and hashing are by
/// identity.
pub struct EntityRef<T> {
    weak_ref: Weak<T>,
}

impl<T> EntityRef<T> {
    /// Create a handle from a strong reference
    #[must_use]
    pub fn new(strong_ref: &Arc<T>) -> Self {
        EntityRef {
            weak_ref: Arc::downgrade(strong_ref),
        }
    }

    /// Get a strong reference to the entity.
    ///
    /// # Errors
    /// Returns [`crate::Error::Disposed`] if the owning module and every other holder are gone.
    pub fn upgrade(&self) -> Result<Arc<T>> {
        self.weak_ref.upgrade().ok_or(Disposed)
    }

    /// Check if the referenced entity is still alive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.weak_ref.strong_count() > 0
    }

    /// True if this handle refers to `entity`
    #[must_use]
    pub fn is(&self, entity: &Arc<T>) -> bool {
        std::ptr::eq(self.weak_ref.as_ptr(), Arc::as_ptr(entity))
    }
}

impl<T> Clone for EntityRef<T> {
    fn clone(&self) -> Self {
        EntityRef {
            weak_ref: self.weak_ref.clone(),
        }
    }
}

impl<T> PartialEq for EntityRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.weak_ref, &other.weak_ref)
    }
}

impl<T> Eq for EntityRef<T> {}

impl<T> Hash for EntityRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.weak_ref.as_ptr().hash(state);
    }
}

impl<T> fmt::Debug for EntityRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({:p})", self.weak_ref.as_ptr())
    }
}

impl<T> From<&Arc<T>> for EntityRef<T> {
    fn from(strong_ref: &Arc<T>) -> Self {
        Self::new(strong_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_and_disposal() {
        let first = Arc::new(1u32);
        let second = Arc::new(1u32);

        let handle = EntityRef::new(&first);
        assert_eq!(handle, EntityRef::from(&first));
        assert_ne!(handle, EntityRef::new(&second));
        assert!(handle.is(&first));
        assert_eq!(*handle.upgrade().unwrap(), 1);

        drop(first);
        assert!(!handle.is_valid());
        assert!(matches!(handle.upgrade(), Err(crate::Error::Disposed)));
    }
}
