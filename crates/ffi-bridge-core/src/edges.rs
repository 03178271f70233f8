//! Lifetime edges between wrapper objects.
//!
//! An edge records that one wrapper's foreign data is only valid while
//! another wrapper is alive: an iterator walking a set, a struct holding a
//! string slice that points into the object it was read from, a borrowed
//! view of an owned object. The dependent stores a strong, non-owning
//! reference to each dependency, so the dependency's drop (and with it the
//! foreign destructor) cannot happen before the dependent's.
//!
//! Edges never carry destruction responsibility: dropping an edge only
//! releases the retention.
//!
//! Edge sets are handed to a wrapper when it is constructed and are frozen
//! inside it from then on. A wrapper can therefore only retain objects that
//! already existed when it was built, which keeps the retention graph
//! acyclic.

use std::any::Any;
use std::sync::Arc;

/// A type-erased strong reference that keeps a wrapper's state alive.
pub type Retained = Arc<dyn Any + Send + Sync>;

/// Wrappers that other wrappers can depend on.
pub trait Retain {
    /// A strong reference to the state whose lifetime the foreign data is tied to.
    fn retainer(&self) -> Retained;
}

/// An ordered set of dependencies held by one wrapper.
#[derive(Clone, Default)]
pub struct Edges {
    retained: Vec<Retained>,
}

impl Edges {
    /// No dependencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single dependency.
    pub fn of(dependency: &(impl Retain + ?Sized)) -> Self {
        let mut edges = Self::new();
        edges.record(dependency);
        edges
    }

    /// Start declaring dependencies for a wrapper under construction.
    pub fn builder() -> EdgesBuilder {
        EdgesBuilder {
            edges: Self::new(),
        }
    }

    /// Retain `dependency`.
    pub fn record(&mut self, dependency: &(impl Retain + ?Sized)) {
        self.retained.push(dependency.retainer());
    }

    /// Retain everything `other` retains.
    pub fn record_all(&mut self, other: &Edges) {
        self.retained.extend(other.retained.iter().cloned());
    }

    /// Returns `true` if `dependency` is retained by this set.
    pub fn retains(&self, dependency: &(impl Retain + ?Sized)) -> bool {
        let target = Arc::as_ptr(&dependency.retainer()).cast::<()>();
        self.retained
            .iter()
            .any(|held| Arc::as_ptr(held).cast::<()>() == target)
    }

    /// Number of recorded edges.
    pub fn len(&self) -> usize {
        self.retained.len()
    }

    /// Returns `true` if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }
}

impl std::fmt::Debug for Edges {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edges")
            .field("len", &self.retained.len())
            .finish()
    }
}

/// Builder declaring a wrapper's dependencies before it exists.
#[derive(Debug)]
pub struct EdgesBuilder {
    edges: Edges,
}

impl EdgesBuilder {
    /// Depend on `dependency`.
    #[must_use]
    pub fn depends_on(mut self, dependency: &(impl Retain + ?Sized)) -> Self {
        self.edges.record(dependency);
        self
    }

    /// Depend on everything `edges` depends on.
    #[must_use]
    pub fn inherit(mut self, edges: &Edges) -> Self {
        self.edges.record_all(edges);
        self
    }

    /// Finish the edge set.
    pub fn build(self) -> Edges {
        self.edges
    }
}
