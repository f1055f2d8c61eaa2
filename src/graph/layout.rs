//! Layout planning for one graph instance.
//!
//! Every array and bitmap of a graph lives at a fixed byte offset inside a
//! single arena slice. The offsets are computed once from the key count and
//! shared read-only by all workers.

use serde::Serialize;

use crate::alloc::syscall::page_size;
use crate::error::{Result, SolveError};
use crate::graph::hash::MaskingType;

/// Sentinel for "no edge" / "no neighbour". Zero is a valid vertex and edge id.
pub const EMPTY: u32 = u32::MAX;

/// Every array and bitmap size is rounded up to this many bytes.
pub const ARRAY_ALIGNMENT: usize = 16;

/// Rounds `value` up to the next multiple of `align` (a power of two).
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    if align == 0 {
        value
    } else {
        (value + (align - 1)) & !(align - 1)
    }
}

#[inline]
fn checked_align_up(value: u64, align: u64) -> Option<u64> {
    Some(value.checked_add(align - 1)? & !(align - 1))
}

/// Edge and vertex counts of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    /// E: one edge per key.
    pub num_edges: u32,
    /// 2E: each edge is stored as two directed halves.
    pub total_edges: u32,
    /// V: number of vertices (and the lookup modulus).
    pub num_vertices: u32,
    /// Reduction applied to raw hashes and lookup sums.
    pub masking: MaskingType,
}

impl Dimensions {
    /// Reduces a raw vertex hash into `[0, V)`.
    #[inline]
    pub fn mask(&self, value: u32) -> u32 {
        self.masking.apply(value, self.num_vertices)
    }

    /// Reduces a lookup sum into `[0, V)`.
    #[inline]
    pub fn mask_index(&self, value: u32) -> u32 {
        self.masking.apply_index(value, self.num_vertices)
    }
}

/// A byte range inside a graph slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Offset from the start of the slice.
    pub offset: usize,
    /// Size in bytes, a multiple of [`ARRAY_ALIGNMENT`].
    pub len: usize,
}

impl Region {
    /// One past the last byte of the region.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Byte offsets of every array and bitmap within one graph-sized slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLayout {
    /// Edge and vertex counts the layout was planned for.
    pub dims: Dimensions,
    /// `edges[2E]`.
    pub edges: Region,
    /// `next[2E]`.
    pub next: Region,
    /// `first[V]`.
    pub first: Region,
    /// `assigned[V]`.
    pub assigned: Region,
    /// `deleted_edges` bitmap, 2E bits.
    pub deleted_edges: Region,
    /// `visited_vertices` bitmap, V bits.
    pub visited_vertices: Region,
    /// `assigned_verify` bitmap, E bits.
    pub assigned_verify: Region,
    /// Sum of all regions.
    pub graph_bytes: usize,
    /// `graph_bytes` rounded up to the page size; the stride of arena slices.
    pub slice_bytes: usize,
}

impl GraphLayout {
    /// Plans the layout for `num_keys` keys.
    ///
    /// V is 2.5 × E, computed as `(E << 1) + (E >> 1)`. With
    /// [`MaskingType::And`] or [`MaskingType::XorAnd`] it is rounded up to a
    /// power of two.
    ///
    /// # Errors
    /// [`SolveError::NoKeys`] for an empty key set and
    /// [`SolveError::LayoutOverflow`] if any count or size exceeds 32 bits.
    pub fn plan(num_keys: usize, masking: MaskingType) -> Result<Self> {
        if num_keys == 0 {
            return Err(SolveError::NoKeys);
        }

        let num_keys = num_keys as u64;
        let overflow = || SolveError::LayoutOverflow { num_keys };
        let limit = u64::from(u32::MAX);

        // 2E must stay below the sentinel so that every edge id is distinguishable.
        let total_edges = num_keys.checked_mul(2).filter(|&t| t <= limit).ok_or_else(overflow)?;

        let mut num_vertices = (num_keys << 1) + (num_keys >> 1);
        if masking.needs_power_of_two() {
            num_vertices = num_vertices.checked_next_power_of_two().ok_or_else(overflow)?;
        }
        if num_vertices > limit {
            return Err(overflow());
        }

        let word = core::mem::size_of::<u32>() as u64;
        let align = ARRAY_ALIGNMENT as u64;
        let array = |count: u64| checked_align_up(count.checked_mul(word)?, align);
        let bitmap = |bits: u64| checked_align_up(bits.div_ceil(8), align);

        let sizes = [
            array(total_edges),
            array(total_edges),
            array(num_vertices),
            array(num_vertices),
            bitmap(total_edges),
            bitmap(num_vertices),
            bitmap(num_keys),
        ];

        let mut regions = [Region { offset: 0, len: 0 }; 7];
        let mut cursor: u64 = 0;
        for (region, size) in regions.iter_mut().zip(sizes) {
            let size = size.filter(|&s| s <= limit).ok_or_else(overflow)?;
            *region = Region {
                offset: cursor as usize,
                len: size as usize,
            };
            cursor = cursor.checked_add(size).filter(|&c| c <= limit).ok_or_else(overflow)?;
        }

        let graph_bytes = cursor as usize;
        let slice_bytes = align_up(graph_bytes, page_size());
        let [
            edges,
            next,
            first,
            assigned,
            deleted_edges,
            visited_vertices,
            assigned_verify,
        ] = regions;

        let dims = Dimensions {
            num_edges: num_keys as u32,
            total_edges: total_edges as u32,
            num_vertices: num_vertices as u32,
            masking,
        };

        Ok(Self {
            dims,
            edges,
            next,
            first,
            assigned,
            deleted_edges,
            visited_vertices,
            assigned_verify,
            graph_bytes,
            slice_bytes,
        })
    }

    /// Regions in the order they are laid out in a slice.
    pub fn regions(&self) -> [Region; 7] {
        [
            self.edges,
            self.next,
            self.first,
            self.assigned,
            self.deleted_edges,
            self.visited_vertices,
            self.assigned_verify,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_keys_give_ten_vertices() {
        let layout = GraphLayout::plan(4, MaskingType::Modulus).unwrap();
        assert_eq!(layout.dims.num_edges, 4);
        assert_eq!(layout.dims.total_edges, 8);
        assert_eq!(layout.dims.num_vertices, 10);
    }

    #[test]
    fn and_masking_rounds_vertices_to_power_of_two() {
        let layout = GraphLayout::plan(4, MaskingType::And).unwrap();
        assert_eq!(layout.dims.num_vertices, 16);
        let layout = GraphLayout::plan(4, MaskingType::XorAnd).unwrap();
        assert_eq!(layout.dims.num_vertices, 16);
    }

    #[test]
    fn regions_are_contiguous_and_aligned() {
        let layout = GraphLayout::plan(1000, MaskingType::Modulus).unwrap();
        let mut expected = 0;
        for region in layout.regions() {
            assert_eq!(region.offset, expected);
            assert_eq!(region.len % ARRAY_ALIGNMENT, 0);
            expected = region.end();
        }
        assert_eq!(expected, layout.graph_bytes);
        assert!(layout.slice_bytes >= layout.graph_bytes);
        assert_eq!(layout.slice_bytes % page_size(), 0);
    }

    #[test]
    fn array_sizes_cover_element_counts() {
        let layout = GraphLayout::plan(7, MaskingType::Modulus).unwrap();
        // V = 14 + 3
        assert_eq!(layout.dims.num_vertices, 17);
        assert!(layout.edges.len >= 14 * 4);
        assert!(layout.first.len >= 17 * 4);
        assert!(layout.deleted_edges.len * 8 >= 14);
    }

    #[test]
    fn empty_key_set_is_rejected() {
        assert_eq!(GraphLayout::plan(0, MaskingType::Modulus), Err(SolveError::NoKeys));
    }

    #[test]
    fn oversized_key_set_overflows() {
        let too_many = (u32::MAX as usize / 2) + 1;
        assert!(matches!(
            GraphLayout::plan(too_many, MaskingType::Modulus),
            Err(SolveError::LayoutOverflow { .. })
        ));
        assert!(matches!(
            GraphLayout::plan(usize::MAX, MaskingType::And),
            Err(SolveError::LayoutOverflow { .. })
        ));
    }
}
