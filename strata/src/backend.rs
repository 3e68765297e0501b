//! Interfaces of the RMA collaborators the strided layer drives.
//!
//! The strided layer never moves bytes itself. It resolves remote addresses
//! through a [`RegionRegistry`], then hands either a pair of transfer types to
//! a [`MemoryRegion`] or an IO-vector to the [`VectorOps`] primitives.
//!
//! Address conventions:
//! - remote addresses are `u64` byte addresses in the target rank's address space;
//! - local addresses inside an IO-vector are byte offsets into the local slice.
//!
//! [`LoopbackFabric`](crate::fabric::LoopbackFabric) implements every trait
//! in-process.

use crate::error::Result;
use crate::strided::StridedIov;
use crate::transfer_type::TransferType;
use crate::types::{AccScale, Rank};
use futures::future::BoxFuture;
use std::sync::Arc;

/// A registered allocation that other ranks can access one-sidedly.
pub trait MemoryRegion: Send + Sync {
    /// Acquire exclusive access to this region's segment on `rank`.
    ///
    /// May wait for another holder. Must be paired with [`unlock`](Self::unlock).
    fn lock<'a>(&'a self, rank: Rank) -> BoxFuture<'a, Result<()>>;

    /// Release the lock taken by [`lock`](Self::lock).
    fn unlock(&self, rank: Rank) -> Result<()>;

    /// Fails unless the `len` bytes starting at `addr` lie inside this
    /// region's segment on `rank`.
    fn check_range(&self, addr: u64, len: usize, rank: Rank) -> Result<()>;

    /// Write the bytes of `src` selected by `src_type` into the region at
    /// `dst`, laid out by `dst_type`.
    fn put_typed<'a>(
        &'a self,
        src: &'a [u8],
        src_type: &'a TransferType,
        dst: u64,
        dst_type: &'a TransferType,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>>;

    /// Read the bytes at `src` selected by `src_type` into `dst`, laid out by
    /// `dst_type`.
    fn get_typed<'a>(
        &'a self,
        src: u64,
        src_type: &'a TransferType,
        dst: &'a mut [u8],
        dst_type: &'a TransferType,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>>;

    /// `dst += scale * src` element-wise, with elements of the types'
    /// element type.
    fn accumulate_typed<'a>(
        &'a self,
        scale: AccScale,
        src: &'a [u8],
        src_type: &'a TransferType,
        dst: u64,
        dst_type: &'a TransferType,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Lookup of registered regions by `(address, rank)`.
pub trait RegionRegistry: Send + Sync {
    /// The region whose segment on `rank` contains `addr`, if any.
    fn lookup(&self, addr: u64, rank: Rank) -> Option<Arc<dyn MemoryRegion>>;
}

/// Vectorized primitives operating on a flattened IO-vector.
pub trait VectorOps: Send + Sync {
    /// Copy every block from `src` (offsets into the slice) to the remote
    /// destination addresses on `rank`.
    fn put_v<'a>(&'a self, src: &'a [u8], iov: &'a StridedIov, rank: Rank)
    -> BoxFuture<'a, Result<()>>;

    /// Copy every block from the remote source addresses on `rank` into
    /// `dst` (offsets into the slice).
    fn get_v<'a>(
        &'a self,
        iov: &'a StridedIov,
        dst: &'a mut [u8],
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>>;

    /// Accumulate every block from `src` into the remote destination
    /// addresses on `rank`.
    fn acc_v<'a>(
        &'a self,
        scale: AccScale,
        src: &'a [u8],
        iov: &'a StridedIov,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Contiguous put and remote completion.
pub trait RemoteOps: Send + Sync {
    /// Copy `src` to `dst` on `rank`.
    fn put<'a>(&'a self, src: &'a [u8], dst: u64, rank: Rank) -> BoxFuture<'a, Result<()>>;

    /// Wait until every operation previously issued to `rank` is remotely
    /// visible.
    fn fence<'a>(&'a self, rank: Rank) -> BoxFuture<'a, Result<()>>;
}

/// Everything a [`StridedClient`](crate::client::StridedClient) needs.
pub trait RmaBackend: RegionRegistry + VectorOps + RemoteOps {}

impl<T: RegionRegistry + VectorOps + RemoteOps + ?Sized> RmaBackend for T {}
