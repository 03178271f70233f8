//! Opaque handle lifecycle.
//!
//! An [`Opaque`] wraps one foreign pointer to an object whose layout the host
//! never sees. A handle is either *owned* (it is responsible for running the
//! foreign destructor exactly once) or *borrowed* (a view into an object
//! owned elsewhere, kept alive through its self edges).
//!
//! The destructor runs on explicit [`Opaque::dispose`], or after the last
//! reference to the handle is dropped, through the library's finalization
//! queue. The pointer is swapped to null before the destructor runs, so
//! both paths together still release the object exactly once.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use crate::edges::{Edges, Retain, Retained};
use crate::finalize::{Finalization, FinalizationQueue};
use crate::foreign::Foreign;
use crate::memory::ForeignPtr;
use ffi_bridge_common::RuntimeError;

/// Static description of a foreign opaque type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueType {
    /// Type name, for errors and tracing.
    pub name: &'static str,
    /// Export releasing an instance.
    pub destructor: &'static str,
}

impl OpaqueType {
    /// Describe a foreign type.
    pub const fn new(name: &'static str, destructor: &'static str) -> Self {
        Self { name, destructor }
    }
}

/// Where a handle is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Constructed around a null pointer; every use fails.
    Unbound,
    /// Owns its pointer and will destroy it.
    Owned,
    /// Views a pointer owned elsewhere; never destroys it.
    Borrowed,
    /// The destructor has run.
    Disposed,
}

struct HandleNode {
    ty: OpaqueType,
    ptr: AtomicU32,
    bound: bool,
    owned: bool,
    // Dropped after the node is finalized, which keeps owners alive until
    // their dependents' destructors are queued.
    self_edges: Edges,
    edges: Edges,
    finalizers: FinalizationQueue,
}

impl Drop for HandleNode {
    fn drop(&mut self) {
        let ptr = *self.ptr.get_mut();
        if self.owned && ptr != 0 {
            self.finalizers.push(Finalization {
                type_name: self.ty.name,
                destructor: self.ty.destructor,
                ptr: ForeignPtr::new(ptr),
            });
        }
    }
}

/// A host wrapper around a foreign opaque object.
pub struct Opaque {
    node: Arc<HandleNode>,
}

impl Opaque {
    /// Wrap `ptr`, as returned by a foreign factory or accessor.
    ///
    /// An empty `self_edges` makes the handle owning. A non-empty set
    /// makes it a borrow of the objects in that set, and no destructor is
    /// ever run for it. `edges` lists other objects the foreign data refers
    /// into. A null `ptr` yields an unbound handle.
    pub fn from_raw<F: Foreign + ?Sized>(
        foreign: &F,
        ty: OpaqueType,
        ptr: ForeignPtr,
        self_edges: Edges,
        edges: Edges,
    ) -> Self {
        let bound = !ptr.is_null();
        let owned = bound && self_edges.is_empty();

        debug!(
            type_name = ty.name,
            ptr = %ptr,
            owned,
            edges = edges.len(),
            "Opaque handle created"
        );

        Self {
            node: Arc::new(HandleNode {
                ty,
                ptr: AtomicU32::new(ptr.addr()),
                bound,
                owned,
                self_edges,
                edges,
                finalizers: foreign.finalizers().clone(),
            }),
        }
    }

    /// Wrap an owned pointer with no dependencies.
    pub fn owned<F: Foreign + ?Sized>(foreign: &F, ty: OpaqueType, ptr: ForeignPtr) -> Self {
        Self::from_raw(foreign, ty, ptr, Edges::new(), Edges::new())
    }

    /// The current lifecycle state.
    pub fn state(&self) -> HandleState {
        if !self.node.bound {
            HandleState::Unbound
        } else if self.node.ptr.load(Ordering::Acquire) == 0 {
            HandleState::Disposed
        } else if self.node.owned {
            HandleState::Owned
        } else {
            HandleState::Borrowed
        }
    }

    /// The live pointer, to pass to foreign methods.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the handle is unbound or disposed.
    pub fn ptr(&self) -> Result<ForeignPtr, RuntimeError> {
        match self.state() {
            HandleState::Owned | HandleState::Borrowed => {
                Ok(ForeignPtr::new(self.node.ptr.load(Ordering::Acquire)))
            }
            HandleState::Unbound => Err(RuntimeError::invalid_argument(format!(
                "{} handle is unbound",
                self.node.ty.name
            ))),
            HandleState::Disposed => Err(RuntimeError::invalid_argument(format!(
                "{} handle used after dispose",
                self.node.ty.name
            ))),
        }
    }

    /// Name of the foreign type.
    pub fn type_name(&self) -> &'static str {
        self.node.ty.name
    }

    /// Returns `true` if this handle runs the destructor.
    pub fn is_owned(&self) -> bool {
        self.node.owned
    }

    /// Number of live wrappers holding an edge to this handle.
    pub fn dependents(&self) -> usize {
        Arc::strong_count(&self.node) - 1
    }

    /// Objects this handle borrows from.
    pub fn self_edges(&self) -> &Edges {
        &self.node.self_edges
    }

    /// Objects this handle's foreign data refers into.
    pub fn edges(&self) -> &Edges {
        &self.node.edges
    }

    /// Run the destructor now.
    ///
    /// Returns `Ok(true)` if the destructor ran, `Ok(false)` if there was
    /// nothing to do (already disposed, borrowed, or unbound).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if other wrappers still depend on this one, and
    /// whatever the destructor call itself reports.
    pub fn dispose<F: Foreign + ?Sized>(&self, foreign: &mut F) -> Result<bool, RuntimeError> {
        if !self.node.owned || self.node.ptr.load(Ordering::Acquire) == 0 {
            return Ok(false);
        }

        let dependents = self.dependents();
        if dependents > 0 {
            return Err(RuntimeError::invalid_argument(format!(
                "cannot dispose {}: {dependents} dependent object(s) still alive",
                self.node.ty.name
            )));
        }

        let ptr = self.node.ptr.swap(0, Ordering::AcqRel);
        if ptr == 0 {
            return Ok(false);
        }

        debug!(type_name = self.node.ty.name, ptr = %ForeignPtr::new(ptr), "Opaque handle disposed");
        foreign.destroy(self.node.ty.destructor, ForeignPtr::new(ptr))?;
        Ok(true)
    }
}

impl Retain for Opaque {
    fn retainer(&self) -> Retained {
        self.node.clone()
    }
}

impl std::fmt::Debug for Opaque {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Opaque")
            .field("type_name", &self.node.ty.name)
            .field("ptr", &ForeignPtr::new(self.node.ptr.load(Ordering::Acquire)))
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeForeign;

    const THING: OpaqueType = OpaqueType::new("Thing", "thing_destroy");
    const VIEW: OpaqueType = OpaqueType::new("ThingView", "thing_view_destroy");

    #[test]
    fn test_dispose_is_idempotent() {
        let mut foreign = FakeForeign::new(64);
        let handle = Opaque::owned(&foreign, THING, ForeignPtr::new(16));

        assert_eq!(handle.state(), HandleState::Owned);
        assert!(handle.dispose(&mut foreign).unwrap());
        assert!(!handle.dispose(&mut foreign).unwrap());
        assert_eq!(handle.state(), HandleState::Disposed);
        assert!(handle.ptr().is_err());

        drop(handle);
        assert_eq!(foreign.collect().unwrap(), 0);
        assert_eq!(foreign.destroyed.len(), 1);
    }

    #[test]
    fn test_drop_enqueues_finalization() {
        let mut foreign = FakeForeign::new(64);
        let handle = Opaque::owned(&foreign, THING, ForeignPtr::new(24));

        drop(handle);
        assert_eq!(foreign.finalizers().len(), 1);
        assert!(foreign.destroyed.is_empty());

        assert_eq!(foreign.collect().unwrap(), 1);
        assert_eq!(
            foreign.destroyed,
            vec![("thing_destroy".to_string(), ForeignPtr::new(24))]
        );
    }

    #[test]
    fn test_unbound_handle() {
        let mut foreign = FakeForeign::new(64);
        let handle = Opaque::owned(&foreign, THING, ForeignPtr::NULL);

        assert_eq!(handle.state(), HandleState::Unbound);
        assert!(matches!(
            handle.ptr(),
            Err(RuntimeError::InvalidArgument { .. })
        ));
        assert!(!handle.dispose(&mut foreign).unwrap());

        drop(handle);
        assert!(foreign.finalizers().is_empty());
    }

    #[test]
    fn test_borrowed_handle_never_destroys() {
        let mut foreign = FakeForeign::new(64);
        let owner = Opaque::owned(&foreign, THING, ForeignPtr::new(32));
        let view = Opaque::from_raw(
            &foreign,
            VIEW,
            ForeignPtr::new(40),
            Edges::of(&owner),
            Edges::new(),
        );

        assert_eq!(view.state(), HandleState::Borrowed);
        assert!(!view.is_owned());
        assert!(!view.dispose(&mut foreign).unwrap());

        drop(view);
        drop(owner);
        foreign.collect().unwrap();

        assert_eq!(
            foreign.destroyed,
            vec![("thing_destroy".to_string(), ForeignPtr::new(32))]
        );
    }

    #[test]
    fn test_dependents_block_dispose() {
        let mut foreign = FakeForeign::new(64);
        let owner = Opaque::owned(&foreign, THING, ForeignPtr::new(32));
        let dependent = Opaque::from_raw(
            &foreign,
            THING,
            ForeignPtr::new(48),
            Edges::new(),
            Edges::of(&owner),
        );

        assert_eq!(owner.dependents(), 1);
        assert!(dependent.edges().retains(&owner));
        assert!(matches!(
            owner.dispose(&mut foreign),
            Err(RuntimeError::InvalidArgument { .. })
        ));
        assert_eq!(owner.state(), HandleState::Owned);

        assert!(dependent.dispose(&mut foreign).unwrap());
        drop(dependent);
        assert!(owner.dispose(&mut foreign).unwrap());
    }

    #[test]
    fn test_owner_outlives_dependent() {
        let mut foreign = FakeForeign::new(64);
        let owner = Opaque::owned(&foreign, THING, ForeignPtr::new(32));
        let dependent = Opaque::from_raw(
            &foreign,
            THING,
            ForeignPtr::new(48),
            Edges::new(),
            Edges::of(&owner),
        );

        // Dropping the owner first only releases the host reference.
        drop(owner);
        foreign.collect().unwrap();
        assert!(foreign.destroyed.is_empty());

        drop(dependent);
        foreign.collect().unwrap();

        // Dependent first, then the owner it referred into.
        let ptrs: Vec<u32> = foreign.destroyed.iter().map(|(_, p)| p.addr()).collect();
        assert_eq!(ptrs, vec![48, 32]);
    }

    #[test]
    fn test_collect_continues_after_failure() {
        let mut foreign = FakeForeign::new(64);
        drop(Opaque::owned(&foreign, THING, ForeignPtr::new(8)));
        drop(Opaque::owned(&foreign, THING, ForeignPtr::new(12)));

        foreign.fail_destroy = true;
        assert!(matches!(foreign.collect(), Err(RuntimeError::Trap { .. })));
        assert!(foreign.finalizers().is_empty());
    }
}
