//! Foreign iterators exposed as host iterators.
//!
//! A foreign iterator is an opaque object that yields one item per call of
//! its advance export, with an end marker after the last item. The wrapper
//! owns the iterator handle, which holds an edge to the collection it
//! walks, so the collection outlives the iteration even if the caller drops
//! every other reference to it.

use crate::arena::CallScope;
use crate::edges::{Edges, Retain, Retained};
use crate::foreign::Foreign;
use crate::handle::Opaque;
use crate::memory::ForeignPtr;
use ffi_bridge_common::RuntimeError;

/// One step of a foreign iterator: `Ok(None)` is the end marker.
///
/// Receives the iterator pointer and the iterator's own edges, so items that
/// borrow from the iterated collection can retain it too.
pub type Advance<F, T> = fn(&mut CallScope<'_, F>, ForeignPtr, &Edges) -> Result<Option<T>, RuntimeError>;

/// A fused, forward-only iterator over a foreign iterator object.
pub struct ForeignIter<F: Foreign + ?Sized, T> {
    handle: Opaque,
    advance: Advance<F, T>,
    finished: bool,
    yielded: usize,
}

impl<F: Foreign + ?Sized, T> ForeignIter<F, T> {
    /// Wrap an iterator handle and its advance step.
    pub fn new(handle: Opaque, advance: Advance<F, T>) -> Self {
        Self {
            handle,
            advance,
            finished: false,
            yielded: 0,
        }
    }

    /// Fetch the next item with exactly one foreign call.
    ///
    /// Returns `None` after the end marker, and after the first error.
    pub fn next(&mut self, foreign: &mut F) -> Option<Result<T, RuntimeError>> {
        if self.finished {
            return None;
        }

        let step = self.handle.ptr().and_then(|ptr| {
            let mut scope = CallScope::new(foreign);
            let item = (self.advance)(&mut scope, ptr, self.handle.edges())?;
            scope.release()?;
            Ok(item)
        });

        match step {
            Ok(Some(item)) => {
                self.yielded += 1;
                Some(Ok(item))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    /// Adapt to [`Iterator`] for as long as `foreign` is borrowed.
    pub fn by_ref_iter<'a>(&'a mut self, foreign: &'a mut F) -> Steps<'a, F, T> {
        Steps { iter: self, foreign }
    }

    /// Returns `true` once the end marker or an error was seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of items produced so far.
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// The iterator handle.
    pub fn handle(&self) -> &Opaque {
        &self.handle
    }
}

impl<F: Foreign + ?Sized, T> Retain for ForeignIter<F, T> {
    fn retainer(&self) -> Retained {
        self.handle.retainer()
    }
}

impl<F: Foreign + ?Sized, T> std::fmt::Debug for ForeignIter<F, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignIter")
            .field("handle", &self.handle)
            .field("finished", &self.finished)
            .field("yielded", &self.yielded)
            .finish()
    }
}

/// [`Iterator`] view of a [`ForeignIter`] bound to its library.
pub struct Steps<'a, F: Foreign + ?Sized, T> {
    iter: &'a mut ForeignIter<F, T>,
    foreign: &'a mut F,
}

impl<F: Foreign + ?Sized, T> Iterator for Steps<'_, F, T> {
    type Item = Result<T, RuntimeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next(self.foreign)
    }
}

impl<F: Foreign + ?Sized, T> std::iter::FusedIterator for Steps<'_, F, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::OpaqueType;
    use crate::memory::LinearMemory;
    use crate::testing::FakeForeign;

    const SET: OpaqueType = OpaqueType::new("Set", "set_destroy");
    const CURSOR: OpaqueType = OpaqueType::new("Cursor", "cursor_destroy");

    /// Cursor state: a remaining count at the handle address. Each step
    /// stages a receive buffer, which the scope frees again.
    fn countdown(
        scope: &mut CallScope<'_, FakeForeign>,
        cursor: ForeignPtr,
        _: &Edges,
    ) -> Result<Option<u32>, RuntimeError> {
        let out = scope.receive::<u32>()?;
        let remaining: u32 = scope.read(cursor)?;
        if remaining == 0 {
            return Ok(None);
        }
        scope.write(cursor, remaining - 1)?;
        scope.write(out.ptr(), remaining)?;
        out.read(&**scope).map(Some)
    }

    fn failing(_: &mut CallScope<'_, FakeForeign>, _: ForeignPtr, _: &Edges) -> Result<Option<u32>, RuntimeError> {
        Err(RuntimeError::trap("unreachable"))
    }

    #[test]
    fn test_iterates_to_end_without_repeating() {
        let mut foreign = FakeForeign::new(256);
        foreign.write(ForeignPtr::new(200), 3u32).unwrap();

        let cursor = Opaque::owned(&foreign, CURSOR, ForeignPtr::new(200));
        let mut iter = ForeignIter::new(cursor, countdown);

        let items: Vec<u32> = iter
            .by_ref_iter(&mut foreign)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(items, vec![3, 2, 1]);
        assert!(iter.is_finished());
        assert_eq!(iter.yielded(), 3);

        // Fused: no further foreign calls after the end marker.
        let allocs = foreign.allocs;
        assert!(iter.next(&mut foreign).is_none());
        assert_eq!(foreign.allocs, allocs);
        assert_eq!(foreign.allocs, foreign.frees);
    }

    #[test]
    fn test_error_ends_iteration() {
        let mut foreign = FakeForeign::new(64);
        let cursor = Opaque::owned(&foreign, CURSOR, ForeignPtr::new(16));
        let mut iter = ForeignIter::new(cursor, failing);

        assert!(matches!(
            iter.next(&mut foreign),
            Some(Err(RuntimeError::Trap { .. }))
        ));
        assert!(iter.next(&mut foreign).is_none());
    }

    #[test]
    fn test_iterator_retains_collection() {
        let mut foreign = FakeForeign::new(256);
        foreign.write(ForeignPtr::new(200), 1u32).unwrap();

        let set = Opaque::owned(&foreign, SET, ForeignPtr::new(100));
        let cursor = Opaque::from_raw(
            &foreign,
            CURSOR,
            ForeignPtr::new(200),
            Edges::new(),
            Edges::of(&set),
        );
        let mut iter = ForeignIter::new(cursor, countdown);

        drop(set);
        foreign.collect().unwrap();
        assert!(foreign.destroyed.is_empty());

        assert_eq!(iter.next(&mut foreign).unwrap().unwrap(), 1);
        assert!(iter.next(&mut foreign).is_none());

        drop(iter);
        foreign.collect().unwrap();
        let destroyed: Vec<&str> = foreign.destroyed.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(destroyed, vec!["cursor_destroy", "set_destroy"]);
    }

    #[test]
    fn test_disposed_handle_ends_iteration() {
        let mut foreign = FakeForeign::new(64);
        let cursor = Opaque::owned(&foreign, CURSOR, ForeignPtr::new(16));
        let mut iter = ForeignIter::new(cursor, countdown);

        iter.handle().dispose(&mut foreign).unwrap();
        assert!(matches!(
            iter.next(&mut foreign),
            Some(Err(RuntimeError::InvalidArgument { .. }))
        ));
        assert!(iter.is_finished());
    }
}
