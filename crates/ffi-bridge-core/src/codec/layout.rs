//! Size and alignment arithmetic for foreign layouts.

/// Round `offset` up to the next multiple of `align`.
///
/// `align` must be a power of two.
///
/// # Panics
///
/// If the rounded offset does not fit in `u32`. Layout constants are
/// evaluated at compile time, so there this is a build error.
pub const fn align_up(offset: u32, align: u32) -> u32 {
    match checked_align_up(offset, align) {
        Some(aligned) => aligned,
        None => panic!("aligned offset exceeds the foreign address space"),
    }
}

/// Like [`align_up`], but `None` when the result does not fit in `u32`.
pub const fn checked_align_up(offset: u32, align: u32) -> Option<u32> {
    let mask = align - 1;
    match offset.checked_add(mask) {
        Some(sum) => Some(sum & !mask),
        None => None,
    }
}

/// Size and alignment of a foreign value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    /// Size in bytes.
    pub size: u32,
    /// Alignment in bytes, a power of two.
    pub align: u32,
}

impl Layout {
    /// The layout of `()`.
    pub const ZERO: Self = Self { size: 0, align: 1 };

    /// A layout of `size` bytes aligned to `align`.
    pub const fn new(size: u32, align: u32) -> Self {
        Self { size, align }
    }

    /// This layout with its size rounded up to a multiple of its alignment.
    #[must_use]
    pub const fn pad_to_align(self) -> Self {
        Self {
            size: align_up(self.size, self.align),
            align: self.align,
        }
    }

    /// Lay out `fields` in declaration order, C style.
    pub fn for_struct(fields: &[Layout]) -> StructLayout {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut size = 0;
        let mut align = 1;

        for field in fields {
            let offset = align_up(size, field.align);
            offsets.push(offset);
            size = offset + field.size;
            align = align.max(field.align);
        }

        StructLayout {
            offsets,
            layout: Layout::new(size, align).pad_to_align(),
        }
    }

    /// The union of two layouts: the larger size and the stricter alignment.
    pub const fn union(self, other: Self) -> Self {
        let size = if self.size > other.size {
            self.size
        } else {
            other.size
        };
        let align = if self.align > other.align {
            self.align
        } else {
            other.align
        };
        Self { size, align }
    }
}

/// Field offsets and overall layout of a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    /// Offset of each field, in declaration order.
    pub offsets: Vec<u32>,
    /// Size (padded) and alignment of the whole struct.
    pub layout: Layout,
}
