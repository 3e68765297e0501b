use crate::handle::TransferHandle;
use crate::strided::StrideDescriptor;
use crate::types::{AccScale, AccType, Rank};
use std::sync::Arc;

use super::StridedClient;

impl StridedClient {
    /// Non-blocking [`put_strided`](Self::put_strided).
    ///
    /// The transfer owns `src` until it completes; `wait()` hands it back.
    /// Must be called from within a tokio runtime.
    pub fn put_strided_nb(
        self: &Arc<Self>,
        src: Vec<u8>,
        dst: u64,
        desc: StrideDescriptor,
        rank: Rank,
    ) -> TransferHandle<Vec<u8>> {
        let client = Arc::clone(self);
        TransferHandle::spawn(async move {
            client.put_strided(&src, dst, &desc, rank).await?;
            Ok(src)
        })
    }

    /// Non-blocking [`get_strided`](Self::get_strided).
    ///
    /// `wait()` returns `dst` with the strided region filled in.
    pub fn get_strided_nb(
        self: &Arc<Self>,
        src: u64,
        mut dst: Vec<u8>,
        desc: StrideDescriptor,
        rank: Rank,
    ) -> TransferHandle<Vec<u8>> {
        let client = Arc::clone(self);
        TransferHandle::spawn(async move {
            client.get_strided(src, &mut dst, &desc, rank).await?;
            Ok(dst)
        })
    }

    /// Non-blocking [`accumulate_strided`](Self::accumulate_strided).
    pub fn accumulate_strided_nb(
        self: &Arc<Self>,
        acc: AccType,
        scale: AccScale,
        src: Vec<u8>,
        dst: u64,
        desc: StrideDescriptor,
        rank: Rank,
    ) -> TransferHandle<Vec<u8>> {
        let client = Arc::clone(self);
        TransferHandle::spawn(async move {
            client
                .accumulate_strided(acc, scale, &src, dst, &desc, rank)
                .await?;
            Ok(src)
        })
    }
}
