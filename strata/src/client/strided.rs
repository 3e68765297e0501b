use crate::backend::{MemoryRegion, RegionRegistry, VectorOps};
use crate::config::StridedMethod;
use crate::error::{Result, StrataError};
use crate::strided::{StrideDescriptor, StridedIov, strided_to_type};
use crate::types::{AccScale, AccType, DataType, Rank};
use std::sync::Arc;

use super::StridedClient;

/// Exclusive hold on one rank's segment of a region.
///
/// Released explicitly with [`release`](Self::release) on the normal path;
/// the drop path only runs when a transfer is cancelled mid-flight.
struct RegionLock {
    region: Arc<dyn MemoryRegion>,
    rank: Rank,
    held: bool,
}

impl RegionLock {
    async fn acquire(region: Arc<dyn MemoryRegion>, rank: Rank) -> Result<Self> {
        region.lock(rank).await?;
        Ok(Self {
            region,
            rank,
            held: true,
        })
    }

    fn region(&self) -> &dyn MemoryRegion {
        self.region.as_ref()
    }

    fn release(mut self) -> Result<()> {
        self.held = false;
        self.region.unlock(self.rank)
    }
}

impl Drop for RegionLock {
    fn drop(&mut self) {
        if self.held
            && let Err(e) = self.region.unlock(self.rank)
        {
            tracing::warn!(rank = self.rank, "failed to release region lock: {e}");
        }
    }
}

/// Release `lock` (if any) after an operation, keeping the operation's error
/// when both fail.
fn finish(outcome: Result<()>, lock: Option<RegionLock>) -> Result<()> {
    let released = lock.map_or(Ok(()), RegionLock::release);
    outcome.and(released)
}

/// Checks shared by both strategies. Nothing remote is touched until these pass.
fn check_request(
    desc: &StrideDescriptor,
    elem: DataType,
    local_len: usize,
    local_extent: usize,
) -> Result<()> {
    desc.validate(elem.size_in_bytes())?;
    if local_len < local_extent {
        return Err(StrataError::BufferTooSmall {
            required: local_extent,
            actual: local_len,
        });
    }
    Ok(())
}

impl StridedClient {
    /// Copy the strided region of `src` described by the descriptor's source
    /// strides to `dst` on `rank`, laid out by its destination strides.
    pub async fn put_strided(
        &self,
        src: &[u8],
        dst: u64,
        desc: &StrideDescriptor,
        rank: Rank,
    ) -> Result<()> {
        check_request(desc, DataType::U8, src.len(), desc.src_extent())?;
        tracing::debug!(
            rank,
            levels = desc.levels(),
            bytes = desc.total_bytes(),
            method = %self.config.strided_method,
            "put_strided"
        );

        match self.config.strided_method {
            StridedMethod::Datatype => {
                let src_type = strided_to_type(desc.src_strides(), desc.count(), DataType::U8)?;
                let dst_type = strided_to_type(desc.dst_strides(), desc.count(), DataType::U8)?;
                let region = self.resolve(dst, desc.dst_extent(), rank)?;
                let lock = RegionLock::acquire(region, rank).await?;
                let outcome = lock
                    .region()
                    .put_typed(src, &src_type, dst, &dst_type, rank)
                    .await;
                finish(outcome, Some(lock))
            }
            StridedMethod::IoVector => {
                let region = self.resolve(dst, desc.dst_extent(), rank)?;
                let iov = StridedIov::from_descriptor(0, dst, desc)?;
                let lock = self.iov_lock(region, rank).await?;
                let outcome = self.backend.put_v(src, &iov, rank).await;
                finish(outcome, lock)
            }
        }
    }

    /// Copy the strided region at `src` on `rank` into `dst`.
    pub async fn get_strided(
        &self,
        src: u64,
        dst: &mut [u8],
        desc: &StrideDescriptor,
        rank: Rank,
    ) -> Result<()> {
        check_request(desc, DataType::U8, dst.len(), desc.dst_extent())?;
        tracing::debug!(
            rank,
            levels = desc.levels(),
            bytes = desc.total_bytes(),
            method = %self.config.strided_method,
            "get_strided"
        );

        match self.config.strided_method {
            StridedMethod::Datatype => {
                let src_type = strided_to_type(desc.src_strides(), desc.count(), DataType::U8)?;
                let dst_type = strided_to_type(desc.dst_strides(), desc.count(), DataType::U8)?;
                let region = self.resolve(src, desc.src_extent(), rank)?;
                let lock = RegionLock::acquire(region, rank).await?;
                let outcome = lock
                    .region()
                    .get_typed(src, &src_type, dst, &dst_type, rank)
                    .await;
                finish(outcome, Some(lock))
            }
            StridedMethod::IoVector => {
                let region = self.resolve(src, desc.src_extent(), rank)?;
                let iov = StridedIov::from_descriptor(src, 0, desc)?;
                let lock = self.iov_lock(region, rank).await?;
                let outcome = self.backend.get_v(&iov, dst, rank).await;
                finish(outcome, lock)
            }
        }
    }

    /// `dst += scale * src` over a strided region, elements typed by `acc`.
    ///
    /// Every count and stride must be a multiple of the element size of
    /// `acc`, and `scale` must be of the same kind.
    pub async fn accumulate_strided(
        &self,
        acc: AccType,
        scale: AccScale,
        src: &[u8],
        dst: u64,
        desc: &StrideDescriptor,
        rank: Rank,
    ) -> Result<()> {
        if scale.acc_type() != acc {
            return Err(StrataError::ScaleMismatch { acc, scale });
        }
        let elem = acc.element_type();
        check_request(desc, elem, src.len(), desc.src_extent())?;
        tracing::debug!(
            rank,
            levels = desc.levels(),
            bytes = desc.total_bytes(),
            acc = %acc,
            method = %self.config.strided_method,
            "accumulate_strided"
        );

        match self.config.strided_method {
            StridedMethod::Datatype => {
                let src_type = strided_to_type(desc.src_strides(), desc.count(), elem)?;
                let dst_type = strided_to_type(desc.dst_strides(), desc.count(), elem)?;
                let region = self.resolve(dst, desc.dst_extent(), rank)?;
                let lock = RegionLock::acquire(region, rank).await?;
                let outcome = lock
                    .region()
                    .accumulate_typed(scale, src, &src_type, dst, &dst_type, rank)
                    .await;
                finish(outcome, Some(lock))
            }
            StridedMethod::IoVector => {
                let region = self.resolve(dst, desc.dst_extent(), rank)?;
                let iov = StridedIov::from_descriptor(0, dst, desc)?;
                let lock = self.iov_lock(region, rank).await?;
                let outcome = self.backend.acc_v(scale, src, &iov, rank).await;
                finish(outcome, lock)
            }
        }
    }

    /// The registered region holding `addr` on `rank`, which must also hold
    /// the `extent` bytes that follow it.
    fn resolve(&self, addr: u64, extent: usize, rank: Rank) -> Result<Arc<dyn MemoryRegion>> {
        let region = self
            .backend
            .lookup(addr, rank)
            .ok_or(StrataError::UnregisteredAddress { addr, rank })?;
        region.check_range(addr, extent, rank)?;
        Ok(region)
    }

    /// Region lock for an IO-vector transfer, if configured.
    async fn iov_lock(
        &self,
        region: Arc<dyn MemoryRegion>,
        rank: Rank,
    ) -> Result<Option<RegionLock>> {
        if !self.config.lock_iov_transfers {
            return Ok(None);
        }
        RegionLock::acquire(region, rank).await.map(Some)
    }
}
