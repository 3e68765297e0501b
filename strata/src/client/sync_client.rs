use crate::backend::RmaBackend;
use crate::config::StrataConfig;
use crate::error::Result;
use crate::strided::StrideDescriptor;
use crate::types::{AccScale, AccType, Rank};
use std::sync::Arc;

/// Blocking wrapper around [`StridedClient`](super::StridedClient).
///
/// Owns a `tokio::runtime::Runtime` and calls `block_on()` for each operation.
/// Must not be used from inside another runtime.
pub struct SyncStridedClient {
    inner: super::StridedClient,
    rt: tokio::runtime::Runtime,
}

impl SyncStridedClient {
    pub fn new(backend: Arc<dyn RmaBackend>, config: StrataConfig) -> Result<Self> {
        Self::from_async(super::StridedClient::with_config(backend, config))
    }

    /// Wrap an existing async client with a new tokio runtime.
    pub fn from_async(inner: super::StridedClient) -> Result<Self> {
        let rt = tokio::runtime::Runtime::new()?;
        Ok(Self { inner, rt })
    }

    pub fn config(&self) -> &StrataConfig {
        self.inner.config()
    }

    /// Blocking strided put.
    pub fn put_strided(
        &self,
        src: &[u8],
        dst: u64,
        desc: &StrideDescriptor,
        rank: Rank,
    ) -> Result<()> {
        self.rt
            .block_on(self.inner.put_strided(src, dst, desc, rank))
    }

    /// Blocking strided get.
    pub fn get_strided(
        &self,
        src: u64,
        dst: &mut [u8],
        desc: &StrideDescriptor,
        rank: Rank,
    ) -> Result<()> {
        self.rt
            .block_on(self.inner.get_strided(src, dst, desc, rank))
    }

    /// Blocking strided accumulate.
    pub fn accumulate_strided(
        &self,
        acc: AccType,
        scale: AccScale,
        src: &[u8],
        dst: u64,
        desc: &StrideDescriptor,
        rank: Rank,
    ) -> Result<()> {
        self.rt
            .block_on(self.inner.accumulate_strided(acc, scale, src, dst, desc, rank))
    }

    /// Blocking flagged put.
    pub fn put_strided_with_flag(
        &self,
        src: &[u8],
        dst: u64,
        desc: &StrideDescriptor,
        flag_addr: u64,
        value: i32,
        rank: Rank,
    ) -> Result<()> {
        self.rt.block_on(
            self.inner
                .put_strided_with_flag(src, dst, desc, flag_addr, value, rank),
        )
    }

    pub fn fence(&self, rank: Rank) -> Result<()> {
        self.rt.block_on(self.inner.fence(rank))
    }
}
