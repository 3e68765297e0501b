//! Derived transfer types: compact descriptions of structured memory layouts
//! that a single typed RMA operation can move.
//!
//! Mirrors the constructors of a message-passing type system: a type is
//! created, committed, used by typed primitives and released on drop.

use crate::error::{Result, StrataError};
use crate::types::DataType;

/// Dimension ordering of a subarray type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    /// First dimension is outermost (C order).
    RowMajor,
    /// First dimension is innermost (Fortran order).
    ColumnMajor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Layout {
    Contiguous {
        count: usize,
    },
    Subarray {
        sizes: Vec<usize>,
        subsizes: Vec<usize>,
        starts: Vec<usize>,
        order: Order,
    },
}

/// A derived datatype describing which bytes of a buffer take part in a
/// transfer, relative to the buffer's base address.
#[derive(Debug, PartialEq, Eq)]
pub struct TransferType {
    layout: Layout,
    elem: DataType,
    committed: bool,
}

impl TransferType {
    /// `count` consecutive elements of `elem`.
    pub fn contiguous(count: usize, elem: DataType) -> Self {
        Self {
            layout: Layout::Contiguous { count },
            elem,
            committed: false,
        }
    }

    /// An n-dimensional sub-block of an array of `sizes` elements, selecting
    /// `subsizes[d]` elements from `starts[d]` in every dimension.
    pub fn subarray(
        sizes: &[usize],
        subsizes: &[usize],
        starts: &[usize],
        order: Order,
        elem: DataType,
    ) -> Result<Self> {
        let ndims = sizes.len();
        if ndims == 0 {
            return Err(StrataError::InvalidType("subarray needs at least one dimension".into()));
        }
        if subsizes.len() != ndims || starts.len() != ndims {
            return Err(StrataError::InvalidType(format!(
                "subarray dimension mismatch: sizes={ndims}, subsizes={}, starts={}",
                subsizes.len(),
                starts.len()
            )));
        }
        for d in 0..ndims {
            if sizes[d] == 0 || subsizes[d] == 0 {
                return Err(StrataError::InvalidType(format!(
                    "subarray dimension {d} is empty (size={}, subsize={})",
                    sizes[d], subsizes[d]
                )));
            }
            if starts[d] + subsizes[d] > sizes[d] {
                return Err(StrataError::InvalidType(format!(
                    "subarray dimension {d}: start {} + subsize {} exceeds size {}",
                    starts[d], subsizes[d], sizes[d]
                )));
            }
        }
        Ok(Self {
            layout: Layout::Subarray {
                sizes: sizes.to_vec(),
                subsizes: subsizes.to_vec(),
                starts: starts.to_vec(),
                order,
            },
            elem,
            committed: false,
        })
    }

    /// Make the type usable by typed transfer primitives.
    pub fn commit(&mut self) {
        self.committed = true;
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Fails with `UncommittedType` if [`commit`](Self::commit) was never called.
    pub fn ensure_committed(&self) -> Result<()> {
        if self.committed {
            Ok(())
        } else {
            Err(StrataError::UncommittedType)
        }
    }

    pub fn element_type(&self) -> DataType {
        self.elem
    }

    /// Number of payload bytes the type selects.
    pub fn size(&self) -> usize {
        let elems: usize = match &self.layout {
            Layout::Contiguous { count } => *count,
            Layout::Subarray { subsizes, .. } => subsizes.iter().product(),
        };
        elems * self.elem.size_in_bytes()
    }

    /// Number of bytes from the base address to the end of the last
    /// selected byte. Trailing unselected elements of a subarray are not
    /// counted.
    pub fn true_extent(&self) -> usize {
        self.blocks()
            .last()
            .map(|&(off, len)| off + len)
            .unwrap_or(0)
    }

    /// The type map as `(byte_offset, byte_len)` runs in memory order, with
    /// adjacent runs merged.
    pub fn blocks(&self) -> Vec<(usize, usize)> {
        let es = self.elem.size_in_bytes();
        match &self.layout {
            Layout::Contiguous { count } => {
                if *count == 0 {
                    Vec::new()
                } else {
                    vec![(0, count * es)]
                }
            }
            Layout::Subarray {
                sizes,
                subsizes,
                starts,
                order,
            } => {
                let (sizes, subsizes, starts) = match order {
                    Order::RowMajor => (sizes.clone(), subsizes.clone(), starts.clone()),
                    Order::ColumnMajor => (
                        sizes.iter().rev().copied().collect(),
                        subsizes.iter().rev().copied().collect(),
                        starts.iter().rev().copied().collect(),
                    ),
                };
                subarray_blocks(&sizes, &subsizes, &starts, es)
            }
        }
    }
}

/// Walk a row-major subarray, outer dimensions as an odometer, emitting one
/// run per innermost row.
fn subarray_blocks(
    sizes: &[usize],
    subsizes: &[usize],
    starts: &[usize],
    es: usize,
) -> Vec<(usize, usize)> {
    let ndims = sizes.len();
    let inner = ndims - 1;

    let mut dim_stride = vec![es; ndims];
    for d in (0..inner).rev() {
        dim_stride[d] = dim_stride[d + 1] * sizes[d + 1];
    }

    let run_len = subsizes[inner] * es;
    let run_start = starts[inner] * es;
    let rows: usize = subsizes[..inner].iter().product();

    let mut out: Vec<(usize, usize)> = Vec::new();
    let mut idx = vec![0usize; inner];
    for _ in 0..rows {
        let offset = run_start
            + (0..inner)
                .map(|d| (starts[d] + idx[d]) * dim_stride[d])
                .sum::<usize>();

        match out.last_mut() {
            Some((prev_off, prev_len)) if *prev_off + *prev_len == offset => *prev_len += run_len,
            _ => out.push((offset, run_len)),
        }

        for d in (0..inner).rev() {
            idx[d] += 1;
            if idx[d] < subsizes[d] {
                break;
            }
            idx[d] = 0;
        }
    }
    out
}
