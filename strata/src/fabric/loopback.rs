use super::accumulate::scaled_accumulate;
use crate::backend::{MemoryRegion, RegionRegistry, RemoteOps, VectorOps};
use crate::error::{Result, StrataError};
use crate::strided::StridedIov;
use crate::transfer_type::TransferType;
use crate::types::{AccScale, Rank};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tokio::sync::Semaphore;

/// Segments are handed out on page boundaries so neighbouring allocations
/// never share an address.
const SEGMENT_ALIGN: u64 = 4096;
const FIRST_SEGMENT_ADDR: u64 = 0x1000_0000;

/// One collaborator call observed by a [`LoopbackFabric`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FabricEvent {
    Lock { rank: Rank },
    Unlock { rank: Rank },
    PutTyped { rank: Rank, bytes: usize },
    GetTyped { rank: Rank, bytes: usize },
    AccTyped { rank: Rank, bytes: usize },
    PutV { rank: Rank, blocks: usize, bytes: usize },
    GetV { rank: Rank, blocks: usize, bytes: usize },
    AccV { rank: Rank, blocks: usize, bytes: usize },
    Put { rank: Rank, addr: u64, bytes: usize },
    Fence { rank: Rank },
}

impl FabricEvent {
    /// True for calls that move payload bytes.
    pub fn is_data_movement(&self) -> bool {
        !matches!(
            self,
            FabricEvent::Lock { .. } | FabricEvent::Unlock { .. } | FabricEvent::Fence { .. }
        )
    }
}

/// State shared between the fabric and every region it hands out.
#[derive(Default)]
struct Shared {
    journal: Mutex<Vec<FabricEvent>>,
    fault: Mutex<Option<i32>>,
}

impl Shared {
    fn record(&self, event: FabricEvent) -> Result<()> {
        self.journal
            .lock()
            .map_err(|_| StrataError::LockPoisoned("fabric journal"))?
            .push(event);
        Ok(())
    }

    /// Consume a pending injected fault, failing `op` with its status.
    fn take_fault(&self, op: &'static str, rank: Rank) -> Result<()> {
        let pending = self
            .fault
            .lock()
            .map_err(|_| StrataError::LockPoisoned("fabric fault"))?
            .take();
        match pending {
            Some(status) => Err(StrataError::Backend { op, rank, status }),
            None => Ok(()),
        }
    }
}

/// One rank's share of a collective allocation.
struct Segment {
    base: u64,
    len: usize,
    data: Mutex<Vec<u8>>,
    lock: Semaphore,
    held: AtomicBool,
}

impl Segment {
    fn new(base: u64, len: usize) -> Self {
        Self {
            base,
            len,
            data: Mutex::new(vec![0u8; len]),
            lock: Semaphore::new(1),
            held: AtomicBool::new(false),
        }
    }

    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.base + self.len as u64
    }

    /// Offset of `addr` inside the segment, if `len` bytes fit from there.
    fn offset(&self, addr: u64, len: usize, rank: Rank) -> Result<usize> {
        let oob = || StrataError::OutOfBounds { addr, len, rank };
        let off = addr.checked_sub(self.base).ok_or_else(oob)? as usize;
        match off.checked_add(len) {
            Some(end) if end <= self.len => Ok(off),
            _ => Err(oob()),
        }
    }

    fn data(&self) -> Result<MutexGuard<'_, Vec<u8>>> {
        self.data
            .lock()
            .map_err(|_| StrataError::LockPoisoned("segment data"))
    }
}

/// A collective allocation: one segment per rank, each with its own
/// exclusive lock.
pub struct LoopbackRegion {
    segments: Vec<Segment>,
    shared: Arc<Shared>,
}

impl LoopbackRegion {
    /// Base address of the segment on `rank`.
    pub fn base(&self, rank: Rank) -> Option<u64> {
        self.segments.get(rank as usize).map(|s| s.base)
    }

    /// Bytes per rank.
    pub fn len(&self) -> usize {
        self.segments.first().map_or(0, |s| s.len)
    }

    /// Returns true if the allocation holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn segment(&self, rank: Rank) -> Result<&Segment> {
        self.segments
            .get(rank as usize)
            .ok_or(StrataError::InvalidRank {
                rank,
                world_size: self.segments.len() as u32,
            })
    }

    /// The segment on `rank`, which must currently be locked.
    fn locked_segment(&self, rank: Rank) -> Result<&Segment> {
        let seg = self.segment(rank)?;
        if !seg.held.load(Ordering::Acquire) {
            return Err(StrataError::NotLocked { rank });
        }
        Ok(seg)
    }
}

/// Pack the bytes of `buf` selected by `ty`.
fn gather(buf: &[u8], ty: &TransferType) -> Result<Vec<u8>> {
    ty.ensure_committed()?;
    let required = ty.true_extent();
    if required > buf.len() {
        return Err(StrataError::BufferTooSmall {
            required,
            actual: buf.len(),
        });
    }
    let mut packed = Vec::with_capacity(ty.size());
    for (off, len) in ty.blocks() {
        packed.extend_from_slice(&buf[off..off + len]);
    }
    Ok(packed)
}

/// Unpack `packed` into the bytes of `buf` selected by `ty`.
fn scatter(buf: &mut [u8], packed: &[u8], ty: &TransferType) -> Result<()> {
    ty.ensure_committed()?;
    let required = ty.true_extent();
    if required > buf.len() {
        return Err(StrataError::BufferTooSmall {
            required,
            actual: buf.len(),
        });
    }
    let mut pos = 0;
    for (off, len) in ty.blocks() {
        buf[off..off + len].copy_from_slice(&packed[pos..pos + len]);
        pos += len;
    }
    Ok(())
}

/// Typed transfers require both sides to carry the same payload.
fn check_signature(a: &TransferType, b: &TransferType) -> Result<()> {
    if a.size() != b.size() || a.element_type() != b.element_type() {
        return Err(StrataError::InvalidType(format!(
            "type signatures differ: {} bytes of {} vs {} bytes of {}",
            a.size(),
            a.element_type(),
            b.size(),
            b.element_type()
        )));
    }
    Ok(())
}

impl MemoryRegion for LoopbackRegion {
    fn lock<'a>(&'a self, rank: Rank) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let seg = self.segment(rank)?;
            seg.lock
                .acquire()
                .await
                .map_err(|_| StrataError::LockPoisoned("region lock closed"))?
                .forget();
            seg.held.store(true, Ordering::Release);
            self.shared.record(FabricEvent::Lock { rank })
        })
    }

    fn unlock(&self, rank: Rank) -> Result<()> {
        let seg = self.segment(rank)?;
        if !seg.held.swap(false, Ordering::AcqRel) {
            return Err(StrataError::NotLocked { rank });
        }
        seg.lock.add_permits(1);
        self.shared.record(FabricEvent::Unlock { rank })
    }

    fn check_range(&self, addr: u64, len: usize, rank: Rank) -> Result<()> {
        self.segment(rank)?.offset(addr, len, rank).map(|_| ())
    }

    fn put_typed<'a>(
        &'a self,
        src: &'a [u8],
        src_type: &'a TransferType,
        dst: u64,
        dst_type: &'a TransferType,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared.take_fault("put_typed", rank)?;
            let seg = self.locked_segment(rank)?;
            check_signature(src_type, dst_type)?;
            let packed = gather(src, src_type)?;
            let off = seg.offset(dst, dst_type.true_extent(), rank)?;
            scatter(&mut seg.data()?[off..], &packed, dst_type)?;
            self.shared.record(FabricEvent::PutTyped {
                rank,
                bytes: packed.len(),
            })
        })
    }

    fn get_typed<'a>(
        &'a self,
        src: u64,
        src_type: &'a TransferType,
        dst: &'a mut [u8],
        dst_type: &'a TransferType,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared.take_fault("get_typed", rank)?;
            let seg = self.locked_segment(rank)?;
            check_signature(src_type, dst_type)?;
            let off = seg.offset(src, src_type.true_extent(), rank)?;
            let packed = gather(&seg.data()?[off..], src_type)?;
            scatter(dst, &packed, dst_type)?;
            self.shared.record(FabricEvent::GetTyped {
                rank,
                bytes: packed.len(),
            })
        })
    }

    fn accumulate_typed<'a>(
        &'a self,
        scale: AccScale,
        src: &'a [u8],
        src_type: &'a TransferType,
        dst: u64,
        dst_type: &'a TransferType,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared.take_fault("accumulate_typed", rank)?;
            let seg = self.locked_segment(rank)?;
            check_signature(src_type, dst_type)?;
            if src_type.element_type() != scale.acc_type().element_type() {
                return Err(StrataError::InvalidType(format!(
                    "accumulate of {} elements with a {} scale",
                    src_type.element_type(),
                    scale.acc_type()
                )));
            }
            let incoming = gather(src, src_type)?;
            let off = seg.offset(dst, dst_type.true_extent(), rank)?;
            let mut data = seg.data()?;
            let target = &mut data[off..];
            let mut current = gather(target, dst_type)?;
            scaled_accumulate(&mut current, &incoming, scale)?;
            scatter(target, &current, dst_type)?;
            drop(data);
            self.shared.record(FabricEvent::AccTyped {
                rank,
                bytes: incoming.len(),
            })
        })
    }
}

/// In-process implementation of every RMA collaborator.
///
/// Each rank's memory is a set of zeroed segments created by collective
/// [`malloc`](Self::malloc) calls. Every operation completes before it
/// returns, so [`fence`](RemoteOps::fence) has nothing to drain. All calls are
/// recorded in a journal for inspection.
///
/// # Example
///
/// ```
/// use strata::fabric::LoopbackFabric;
///
/// # fn main() -> strata::Result<()> {
/// let fabric = LoopbackFabric::new(2);
/// let bases = fabric.malloc(64)?;
/// fabric.write(1, bases[1], &[7u8; 4])?;
/// assert_eq!(fabric.read(1, bases[1], 4)?, vec![7u8; 4]);
/// # Ok(())
/// # }
/// ```
pub struct LoopbackFabric {
    world_size: u32,
    regions: RwLock<Vec<Arc<LoopbackRegion>>>,
    next_addr: AtomicU64,
    shared: Arc<Shared>,
}

impl LoopbackFabric {
    /// Create a fabric connecting `world_size` ranks.
    pub fn new(world_size: u32) -> Self {
        Self {
            world_size,
            regions: RwLock::new(Vec::new()),
            next_addr: AtomicU64::new(FIRST_SEGMENT_ADDR),
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn world_size(&self) -> u32 {
        self.world_size
    }

    /// Collectively allocate `bytes` on every rank.
    ///
    /// Returns the base address of each rank's segment, indexed by rank.
    pub fn malloc(&self, bytes: usize) -> Result<Vec<u64>> {
        let span = (bytes.max(1) as u64).div_ceil(SEGMENT_ALIGN) * SEGMENT_ALIGN;
        let segments: Vec<Segment> = (0..self.world_size)
            .map(|_| Segment::new(self.next_addr.fetch_add(span, Ordering::Relaxed), bytes))
            .collect();
        let bases = segments.iter().map(|s| s.base).collect();

        self.regions
            .write()
            .map_err(|_| StrataError::LockPoisoned("fabric regions"))?
            .push(Arc::new(LoopbackRegion {
                segments,
                shared: Arc::clone(&self.shared),
            }));

        tracing::debug!(bytes, world_size = self.world_size, "loopback malloc");
        Ok(bases)
    }

    /// Copy `len` bytes at `addr` out of `rank`'s memory.
    pub fn read(&self, rank: Rank, addr: u64, len: usize) -> Result<Vec<u8>> {
        self.with_remote(addr, len, rank, |bytes| bytes.to_vec())
    }

    /// Overwrite `rank`'s memory at `addr` with `data`.
    pub fn write(&self, rank: Rank, addr: u64, data: &[u8]) -> Result<()> {
        self.with_remote(addr, data.len(), rank, |bytes| bytes.copy_from_slice(data))
    }

    /// Snapshot of the collaborator calls recorded so far.
    pub fn events(&self) -> Vec<FabricEvent> {
        self.shared
            .journal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear_events(&self) {
        self.shared
            .journal
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    /// Make the next data-moving call fail with `status`.
    pub fn inject_fault(&self, status: i32) {
        *self
            .shared
            .fault
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(status);
    }

    /// The allocation whose segment on `rank` contains `addr`.
    pub fn region(&self, addr: u64, rank: Rank) -> Result<Arc<LoopbackRegion>> {
        if rank >= self.world_size {
            return Err(StrataError::InvalidRank {
                rank,
                world_size: self.world_size,
            });
        }
        let regions = self
            .regions
            .read()
            .map_err(|_| StrataError::LockPoisoned("fabric regions"))?;
        regions
            .iter()
            .find(|r| r.segments[rank as usize].contains(addr))
            .cloned()
            .ok_or(StrataError::UnregisteredAddress { addr, rank })
    }

    /// Run `f` on the `len` bytes at `addr` in `rank`'s memory.
    fn with_remote<R>(
        &self,
        addr: u64,
        len: usize,
        rank: Rank,
        f: impl FnOnce(&mut [u8]) -> R,
    ) -> Result<R> {
        let region = self.region(addr, rank)?;
        let seg = region.segment(rank)?;
        let off = seg.offset(addr, len, rank)?;
        let mut data = seg.data()?;
        Ok(f(&mut data[off..off + len]))
    }
}

impl LoopbackFabric {
    /// Every remote block must resolve before any of them is touched.
    fn check_remote(&self, addrs: &[u64], bytes: usize, rank: Rank) -> Result<()> {
        for &addr in addrs {
            let region = self.region(addr, rank)?;
            region.segment(rank)?.offset(addr, bytes, rank)?;
        }
        Ok(())
    }
}

/// Every local block of an IO-vector must lie inside the local slice.
fn check_local(offsets: &[u64], bytes: usize, available: usize) -> Result<()> {
    let end = offsets
        .iter()
        .map(|&o| o as usize + bytes)
        .max()
        .unwrap_or(0);
    if end > available {
        return Err(StrataError::BufferTooSmall {
            required: end,
            actual: available,
        });
    }
    Ok(())
}

impl RegionRegistry for LoopbackFabric {
    fn lookup(&self, addr: u64, rank: Rank) -> Option<Arc<dyn MemoryRegion>> {
        self.region(addr, rank)
            .ok()
            .map(|r| r as Arc<dyn MemoryRegion>)
    }
}

impl VectorOps for LoopbackFabric {
    fn put_v<'a>(
        &'a self,
        src: &'a [u8],
        iov: &'a StridedIov,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared.take_fault("put_v", rank)?;
            let bytes = iov.bytes();
            check_local(iov.src_addrs(), bytes, src.len())?;
            self.check_remote(iov.dst_addrs(), bytes, rank)?;
            for (s, d) in iov.iter() {
                let s = s as usize;
                self.with_remote(d, bytes, rank, |remote| {
                    remote.copy_from_slice(&src[s..s + bytes])
                })?;
            }
            self.shared.record(FabricEvent::PutV {
                rank,
                blocks: iov.len(),
                bytes: iov.total_bytes(),
            })
        })
    }

    fn get_v<'a>(
        &'a self,
        iov: &'a StridedIov,
        dst: &'a mut [u8],
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared.take_fault("get_v", rank)?;
            let bytes = iov.bytes();
            check_local(iov.dst_addrs(), bytes, dst.len())?;
            self.check_remote(iov.src_addrs(), bytes, rank)?;
            for (s, d) in iov.iter() {
                let d = d as usize;
                let local = &mut dst[d..d + bytes];
                self.with_remote(s, bytes, rank, |remote| local.copy_from_slice(remote))?;
            }
            self.shared.record(FabricEvent::GetV {
                rank,
                blocks: iov.len(),
                bytes: iov.total_bytes(),
            })
        })
    }

    fn acc_v<'a>(
        &'a self,
        scale: AccScale,
        src: &'a [u8],
        iov: &'a StridedIov,
        rank: Rank,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared.take_fault("acc_v", rank)?;
            let bytes = iov.bytes();
            check_local(iov.src_addrs(), bytes, src.len())?;
            self.check_remote(iov.dst_addrs(), bytes, rank)?;
            for (s, d) in iov.iter() {
                let s = s as usize;
                self.with_remote(d, bytes, rank, |remote| {
                    scaled_accumulate(remote, &src[s..s + bytes], scale)
                })??;
            }
            self.shared.record(FabricEvent::AccV {
                rank,
                blocks: iov.len(),
                bytes: iov.total_bytes(),
            })
        })
    }
}

impl RemoteOps for LoopbackFabric {
    fn put<'a>(&'a self, src: &'a [u8], dst: u64, rank: Rank) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.shared.take_fault("put", rank)?;
            self.with_remote(dst, src.len(), rank, |remote| remote.copy_from_slice(src))?;
            self.shared.record(FabricEvent::Put {
                rank,
                addr: dst,
                bytes: src.len(),
            })
        })
    }

    fn fence<'a>(&'a self, rank: Rank) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if rank >= self.world_size {
                return Err(StrataError::InvalidRank {
                    rank,
                    world_size: self.world_size,
                });
            }
            self.shared.record(FabricEvent::Fence { rank })
        })
    }
}
