//! Stride descriptors and their two translations.
//!
//! A strided region is described by a `count` array and one stride array per
//! side, all in bytes:
//!
//! - `count[0]`: length of the contiguous run at the innermost level.
//! - `stride[i]`, `i < levels`: distance between consecutive blocks at level `i`.
//! - `count[i]`, `1 <= i <= levels`: number of blocks at level `i`; `count[levels]`
//!   is the outermost repeat count.
//!
//! `levels == 0` is a single contiguous run of `count[0]` bytes.
//!
//! The region can be flattened into an IO-vector ([`iov`]) or described as a
//! nested-block transfer type ([`dtype`]).

pub mod dtype;
pub mod iov;

pub use dtype::strided_to_type;
pub use iov::StridedIov;

use crate::error::{Result, StrataError};

/// Shape of one strided transfer: the shared `count` array plus the physical
/// strides of the source and destination sides.
///
/// The logical shape is the same on both sides; only the strides differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StrideDescriptor {
    src_strides: Vec<usize>,
    dst_strides: Vec<usize>,
    count: Vec<usize>,
}

impl StrideDescriptor {
    /// Build a descriptor, checking array lengths, positive counts and that
    /// neither side's extent overflows.
    ///
    /// Stride consistency against an element size is checked separately by
    /// [`validate`](Self::validate), since the element size depends on the
    /// operation.
    pub fn new(
        src_strides: impl Into<Vec<usize>>,
        dst_strides: impl Into<Vec<usize>>,
        count: impl Into<Vec<usize>>,
    ) -> Result<Self> {
        let src_strides = src_strides.into();
        let dst_strides = dst_strides.into();
        let count = count.into();

        if src_strides.len() != dst_strides.len() {
            return Err(StrataError::descriptor(format!(
                "source has {} stride levels, destination has {}",
                src_strides.len(),
                dst_strides.len()
            )));
        }
        check_shape(&src_strides, &count)?;
        check_shape(&dst_strides, &count)?;

        Ok(Self {
            src_strides,
            dst_strides,
            count,
        })
    }

    /// A single contiguous run of `bytes` on both sides.
    pub fn contiguous(bytes: usize) -> Result<Self> {
        Self::new(Vec::new(), Vec::new(), vec![bytes])
    }

    /// Same strides on both sides.
    pub fn symmetric(strides: impl Into<Vec<usize>>, count: impl Into<Vec<usize>>) -> Result<Self> {
        let strides = strides.into();
        Self::new(strides.clone(), strides, count)
    }

    /// Number of stride levels.
    pub fn levels(&self) -> usize {
        self.src_strides.len()
    }

    pub fn src_strides(&self) -> &[usize] {
        &self.src_strides
    }

    pub fn dst_strides(&self) -> &[usize] {
        &self.dst_strides
    }

    pub fn count(&self) -> &[usize] {
        &self.count
    }

    /// Length of each contiguous block (`count[0]`).
    pub fn block_bytes(&self) -> usize {
        self.count[0]
    }

    /// Number of contiguous blocks, `Π count[1..=levels]`.
    pub fn num_blocks(&self) -> usize {
        self.count[1..].iter().product()
    }

    /// Payload size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.block_bytes() * self.num_blocks()
    }

    /// Bytes spanned on the source side, from the base to the end of the last block.
    pub fn src_extent(&self) -> usize {
        extent(&self.src_strides, &self.count)
    }

    /// Bytes spanned on the destination side.
    pub fn dst_extent(&self) -> usize {
        extent(&self.dst_strides, &self.count)
    }

    /// Check both sides' strides against an element size.
    pub fn validate(&self, elem_size: usize) -> Result<()> {
        check_strides("source", &self.src_strides, &self.count, elem_size)?;
        check_strides("destination", &self.dst_strides, &self.count, elem_size)
    }
}

/// Structural check shared by every consumer of stride/count arrays.
pub(crate) fn check_shape(strides: &[usize], count: &[usize]) -> Result<()> {
    let levels = strides.len();
    if count.len() != levels + 1 {
        return Err(StrataError::descriptor(format!(
            "{levels} stride levels need {} counts, got {}",
            levels + 1,
            count.len()
        )));
    }
    if let Some(i) = count.iter().position(|&c| c == 0) {
        return Err(StrataError::descriptor(format!("count[{i}] must be positive")));
    }
    let blocks = count[1..]
        .iter()
        .try_fold(count[0], |acc, &c| acc.checked_mul(c));
    if blocks.is_none() || checked_extent(strides, count).is_none() {
        return Err(StrataError::descriptor("strided region size overflows usize"));
    }
    Ok(())
}

/// Consistency of one side's strides: element-size divisibility, nesting of
/// each level inside the next, and room for `count[i]` blocks per level.
pub(crate) fn check_strides(
    side: &str,
    strides: &[usize],
    count: &[usize],
    elem_size: usize,
) -> Result<()> {
    if elem_size == 0 {
        return Err(StrataError::descriptor("element size must be positive"));
    }
    if count[0] % elem_size != 0 {
        return Err(StrataError::not_multiple("count[0]", count[0], elem_size));
    }
    for (i, &s) in strides.iter().enumerate() {
        if s % elem_size != 0 {
            return Err(StrataError::not_multiple(
                format!("{side} stride[{i}]"),
                s,
                elem_size,
            ));
        }
    }
    if let Some(&s0) = strides.first()
        && s0 < count[0]
    {
        return Err(StrataError::descriptor(format!(
            "{side} stride[0] = {s0} is shorter than the {}-byte contiguous block",
            count[0]
        )));
    }
    for i in 1..strides.len() {
        let (inner, outer) = (strides[i - 1], strides[i]);
        if outer <= inner {
            return Err(StrataError::descriptor(format!(
                "{side} strides must increase: stride[{i}] = {outer}, stride[{}] = {inner}",
                i - 1
            )));
        }
        if outer % inner != 0 {
            return Err(StrataError::not_multiple(
                format!("{side} stride[{i}]"),
                outer,
                inner,
            ));
        }
        if outer / inner < count[i] {
            return Err(StrataError::descriptor(format!(
                "{side} stride[{i}] = {outer} cannot hold {} blocks of {inner} bytes",
                count[i]
            )));
        }
    }
    Ok(())
}

/// Bytes spanned by a region that already passed [`check_shape`].
pub(crate) fn extent(strides: &[usize], count: &[usize]) -> usize {
    checked_extent(strides, count).unwrap_or(usize::MAX)
}

fn checked_extent(strides: &[usize], count: &[usize]) -> Option<usize> {
    strides
        .iter()
        .zip(&count[1..])
        .try_fold(count[0], |acc, (&s, &c)| {
            s.checked_mul(c.saturating_sub(1))?.checked_add(acc)
        })
}
