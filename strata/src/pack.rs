//! Local copies between a strided buffer and a contiguous one.
//!
//! Both directions enumerate the strided side with [`StridedIov`], passing the
//! same strides as source and destination: the second address column is
//! ignored and the contiguous side advances by one block per entry.

use crate::error::{Result, StrataError};
use crate::strided::StridedIov;

/// Enumerate the blocks of a strided buffer and check `strided_len` and
/// `packed_len` cover them.
fn plan(
    strides: &[usize],
    count: &[usize],
    strided_len: usize,
    packed_len: usize,
) -> Result<StridedIov> {
    let iov = StridedIov::from_strided(0, strides, 0, strides, count)?;
    let extent = crate::strided::extent(strides, count);
    if strided_len < extent {
        return Err(StrataError::BufferTooSmall {
            required: extent,
            actual: strided_len,
        });
    }
    if packed_len < iov.total_bytes() {
        return Err(StrataError::BufferTooSmall {
            required: iov.total_bytes(),
            actual: packed_len,
        });
    }
    Ok(iov)
}

/// Gather every block of the strided buffer `src` into `dst`, back to back.
///
/// Returns the number of bytes written to `dst`.
pub fn pack_strided(
    src: &[u8],
    strides: &[usize],
    count: &[usize],
    dst: &mut [u8],
) -> Result<usize> {
    let iov = plan(strides, count, src.len(), dst.len())?;
    let n = iov.bytes();
    for (i, &off) in iov.src_addrs().iter().enumerate() {
        let off = off as usize;
        dst[i * n..(i + 1) * n].copy_from_slice(&src[off..off + n]);
    }
    Ok(iov.total_bytes())
}

/// Scatter the contiguous `src` into the blocks of the strided buffer `dst`.
///
/// Bytes of `dst` between blocks are left untouched. Returns the number of
/// bytes consumed from `src`.
pub fn unpack_strided(
    src: &[u8],
    dst: &mut [u8],
    strides: &[usize],
    count: &[usize],
) -> Result<usize> {
    let iov = plan(strides, count, dst.len(), src.len())?;
    let n = iov.bytes();
    for (i, &off) in iov.dst_addrs().iter().enumerate() {
        let off = off as usize;
        dst[off..off + n].copy_from_slice(&src[i * n..(i + 1) * n]);
    }
    Ok(iov.total_bytes())
}
