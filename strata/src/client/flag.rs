use crate::backend::RemoteOps;
use crate::error::Result;
use crate::strided::StrideDescriptor;
use crate::types::Rank;

use super::StridedClient;

impl StridedClient {
    /// Wait until everything previously issued to `rank` is remotely visible.
    pub async fn fence(&self, rank: Rank) -> Result<()> {
        self.backend.fence(rank).await
    }

    /// Strided put followed by a flag write that `rank` can poll on.
    ///
    /// The payload is fenced before the flag is written, so once `value` is
    /// visible at `flag_addr` the whole strided region is visible at `dst`.
    /// The flag is a 4-byte little-endian integer.
    pub async fn put_strided_with_flag(
        &self,
        src: &[u8],
        dst: u64,
        desc: &StrideDescriptor,
        flag_addr: u64,
        value: i32,
        rank: Rank,
    ) -> Result<()> {
        self.put_strided(src, dst, desc, rank).await?;
        self.fence(rank).await?;
        tracing::trace!(rank, flag_addr, value, "writing completion flag");
        self.backend.put(&value.to_le_bytes(), flag_addr, rank).await
    }
}
