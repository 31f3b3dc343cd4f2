//! The namespace tree of a module.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    metadata::typesystem::{Module, TypeDefinition},
    Result,
};

/// A namespace with its nested namespaces and top-level types.
///
/// The root namespace has an empty name and no parent.
pub struct Namespace {
    name: String,
    parent: Weak<Namespace>,
    namespaces: Vec<Arc<Namespace>>,
    types: Vec<Arc<TypeDefinition>>,
}

#[derive(Default)]
struct Node {
    types: Vec<u32>,
    children: BTreeMap<String, Node>,
}

impl Namespace {
    /// Build the tree from the module's top-level types; `<Module>` is not a member of any
    /// namespace.
    pub(crate) fn build(module: &Module) -> Result<Arc<Namespace>> {
        let mut root = Node::default();
        for (namespace, rids) in &module.index()?.namespaces {
            let mut node = &mut root;
            if !namespace.is_empty() {
                for segment in namespace.split('.') {
                    node = node.children.entry(segment.to_string()).or_default();
                }
            }
            node.types.extend(rids.iter().copied());
        }

        Self::create(module, String::new(), Weak::new(), root)
    }

    fn create(module: &Module, name: String, parent: Weak<Namespace>, node: Node) -> Result<Arc<Namespace>> {
        let mut types = Vec::with_capacity(node.types.len());
        for rid in node.types {
            let ty = module.type_definition(rid)?;
            if ty.name() != "<Module>" {
                types.push(ty);
            }
        }

        // Children need the parent's Weak before the parent exists
        let mut failure = None;
        let namespace = Arc::new_cyclic(|this: &Weak<Namespace>| {
            let mut namespaces = Vec::with_capacity(node.children.len());
            for (child_name, child) in node.children {
                match Self::create(module, child_name, this.clone(), child) {
                    Ok(namespace) => namespaces.push(namespace),
                    Err(error) => {
                        failure = Some(error);
                        break;
                    }
                }
            }

            Namespace {
                name,
                parent,
                namespaces,
                types,
            }
        });

        match failure {
            Some(error) => Err(error),
            None => Ok(namespace),
        }
    }

    /// The last segment of the namespace name; empty for the root
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for the root namespace
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// The enclosing namespace, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Namespace>> {
        self.parent.upgrade()
    }

    /// The dotted name, computed by walking the parent links
    #[must_use]
    pub fn full_name(&self) -> String {
        let mut segments = vec![self.name.clone()];
        let mut current = self.parent.upgrade();
        while let Some(parent) = current {
            if !parent.name.is_empty() {
                segments.push(parent.name.clone());
            }
            current = parent.parent.upgrade();
        }
        segments.reverse();
        segments.join(".")
    }

    /// Directly nested namespaces, sorted by name
    #[must_use]
    pub fn namespaces(&self) -> &[Arc<Namespace>] {
        &self.namespaces
    }

    /// Top-level types declared directly in this namespace
    #[must_use]
    pub fn types(&self) -> &[Arc<TypeDefinition>] {
        &self.types
    }

    /// The nested namespace with dotted name `full_name`, relative to this one
    #[must_use]
    pub fn find(self: &Arc<Self>, full_name: &str) -> Option<Arc<Namespace>> {
        if full_name.is_empty() {
            return Some(self.clone());
        }

        let mut current = self.clone();
        for segment in full_name.split('.') {
            let next = current
                .namespaces
                .iter()
                .find(|namespace| namespace.name == segment)?
                .clone();
            current = next;
        }
        Some(current)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.full_name())
            .field("namespaces", &self.namespaces.len())
            .field("types", &self.types.len())
            .finish()
    }
}
