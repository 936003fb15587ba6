//! Inheritance table of the simulated framework.
//!
//! The framework's class definitions are supplied from outside the
//! harness; this table only records each type's direct parent so shadow
//! resolution can walk from the most-derived type upward.

use std::collections::BTreeMap;

use umbra_types::RealType;

use crate::error::ShadowError;

/// Single-inheritance parent table.
///
/// Types that were never declared are treated as roots: their ancestor
/// chain is just themselves.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    parents: BTreeMap<RealType, RealType>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `parent` as the direct supertype of `real_type`.
    ///
    /// Redeclaring a type replaces its parent. Declarations that would make
    /// a type its own ancestor are rejected.
    pub fn declare(
        &mut self,
        real_type: impl Into<RealType>,
        parent: impl Into<RealType>,
    ) -> Result<(), ShadowError> {
        let real_type = real_type.into();
        let parent = parent.into();

        if self.ancestors(&parent).any(|ancestor| *ancestor == real_type) {
            return Err(ShadowError::HierarchyCycle { real_type, parent });
        }
        self.parents.insert(real_type, parent);
        Ok(())
    }

    /// Builder form of [`declare`](Self::declare).
    pub fn with(
        mut self,
        real_type: impl Into<RealType>,
        parent: impl Into<RealType>,
    ) -> Result<Self, ShadowError> {
        self.declare(real_type, parent)?;
        Ok(self)
    }

    pub fn parent_of(&self, real_type: &RealType) -> Option<&RealType> {
        self.parents.get(real_type)
    }

    /// Iterates `real_type` and then each ancestor, most-derived first.
    pub fn ancestors<'a>(&'a self, real_type: &'a RealType) -> Ancestors<'a> {
        Ancestors {
            hierarchy: self,
            next: Some(real_type),
        }
    }

    /// Returns true if `ancestor` appears in the chain of `real_type`
    /// (a type is a subtype of itself).
    pub fn is_subtype_of(&self, real_type: &RealType, ancestor: &RealType) -> bool {
        self.ancestors(real_type).any(|ty| ty == ancestor)
    }

    /// Number of declared parent links.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Iterator over an ancestor chain.
pub struct Ancestors<'a> {
    hierarchy: &'a ClassHierarchy,
    next: Option<&'a RealType>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a RealType;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.hierarchy.parents.get(current);
        Some(current)
    }
}
