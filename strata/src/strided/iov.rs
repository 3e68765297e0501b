//! Flattening of a strided region pair into an IO-vector.

use super::{StrideDescriptor, check_shape};
use crate::error::{Result, StrataError};

/// A flattened strided transfer: `len()` independent blocks of `bytes()`
/// bytes each, with one source and one destination address per block.
///
/// Blocks are produced in odometer order, innermost level fastest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StridedIov {
    src: Vec<u64>,
    dst: Vec<u64>,
    bytes: usize,
}

impl StridedIov {
    /// Enumerate every leaf block of a strided region pair.
    ///
    /// `src_strides` and `dst_strides` must have the same number of levels and
    /// `count` one more entry than that.
    pub fn from_strided(
        src_base: u64,
        src_strides: &[usize],
        dst_base: u64,
        dst_strides: &[usize],
        count: &[usize],
    ) -> Result<Self> {
        let levels = src_strides.len();
        if dst_strides.len() != levels {
            return Err(StrataError::descriptor(format!(
                "source has {levels} stride levels, destination has {}",
                dst_strides.len()
            )));
        }
        check_shape(src_strides, count)?;
        check_shape(dst_strides, count)?;

        let expected: usize = count[1..].iter().product();
        let mut src = Vec::with_capacity(expected);
        let mut dst = Vec::with_capacity(expected);

        if levels == 0 {
            src.push(src_base);
            dst.push(dst_base);
        } else {
            let mut idx = vec![0usize; levels];

            while idx[levels - 1] < count[levels] {
                if src.len() == expected {
                    return Err(StrataError::EnumerationMismatch {
                        expected,
                        actual: expected + 1,
                    });
                }

                src.push(block_addr(src_base, src_strides, &idx)?);
                dst.push(block_addr(dst_base, dst_strides, &idx)?);

                // Bump the innermost index and carry outward; the outermost
                // index running past count[levels] ends the walk.
                idx[0] += 1;
                for i in 0..levels - 1 {
                    if idx[i] >= count[i + 1] {
                        idx[i] = 0;
                        idx[i + 1] += 1;
                    }
                }
            }
        }

        if src.len() != expected {
            return Err(StrataError::EnumerationMismatch {
                expected,
                actual: src.len(),
            });
        }

        tracing::trace!(blocks = expected, bytes = count[0], levels, "strided iov built");

        Ok(Self {
            src,
            dst,
            bytes: count[0],
        })
    }

    /// Enumerate a descriptor against the given base addresses.
    pub fn from_descriptor(src_base: u64, dst_base: u64, desc: &StrideDescriptor) -> Result<Self> {
        Self::from_strided(
            src_base,
            desc.src_strides(),
            dst_base,
            desc.dst_strides(),
            desc.count(),
        )
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.src.len()
    }

    /// Returns true if there are no blocks.
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    /// Length of every block in bytes.
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Payload size in bytes.
    pub fn total_bytes(&self) -> usize {
        self.bytes * self.src.len()
    }

    pub fn src_addrs(&self) -> &[u64] {
        &self.src
    }

    pub fn dst_addrs(&self) -> &[u64] {
        &self.dst
    }

    /// `(src, dst)` address pairs in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.src.iter().copied().zip(self.dst.iter().copied())
    }
}

/// `base + sum(strides[i] * idx[i])`, failing instead of wrapping.
fn block_addr(base: u64, strides: &[usize], idx: &[usize]) -> Result<u64> {
    strides
        .iter()
        .zip(idx)
        .try_fold(base, |addr, (&s, &i)| {
            let disp = u64::try_from(s.checked_mul(i)?).ok()?;
            addr.checked_add(disp)
        })
        .ok_or_else(|| {
            StrataError::descriptor(format!("block address overflows from base {base:#x}"))
        })
}
