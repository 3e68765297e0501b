mod flag;
mod nonblocking;
mod strided;
mod sync_client;

pub use sync_client::SyncStridedClient;

use crate::backend::RmaBackend;
use crate::config::StrataConfig;
use std::sync::Arc;

/// The async API for strided one-sided transfers.
///
/// Wraps an [`RmaBackend`] and turns stride descriptors into either one typed
/// operation per request or one vectorized operation over a flattened
/// IO-vector, depending on [`StrataConfig::strided_method`]. Both strategies
/// produce byte-identical results.
///
/// # Example
///
/// ```
/// use strata::client::StridedClient;
/// use strata::fabric::LoopbackFabric;
/// use strata::strided::StrideDescriptor;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> strata::Result<()> {
/// let fabric = Arc::new(LoopbackFabric::new(2));
/// let bases = fabric.malloc(256)?;
/// let client = StridedClient::new(fabric.clone());
///
/// // Three rows of 8 bytes, packed locally, spread 32 bytes apart remotely.
/// let desc = StrideDescriptor::new(vec![8], vec![32], vec![8, 3])?;
/// let src: Vec<u8> = (0..24).collect();
/// client.put_strided(&src, bases[1], &desc, 1).await?;
///
/// assert_eq!(fabric.read(1, bases[1] + 32, 8)?, (8..16).collect::<Vec<u8>>());
/// # Ok(())
/// # }
/// ```
pub struct StridedClient {
    backend: Arc<dyn RmaBackend>,
    config: StrataConfig,
}

impl StridedClient {
    /// Client with the default configuration.
    pub fn new(backend: Arc<dyn RmaBackend>) -> Self {
        Self::with_config(backend, StrataConfig::default())
    }

    pub fn with_config(backend: Arc<dyn RmaBackend>, config: StrataConfig) -> Self {
        Self { backend, config }
    }

    /// Client configured from `STRATA_*` environment variables.
    pub fn from_env(backend: Arc<dyn RmaBackend>) -> Self {
        Self::with_config(backend, StrataConfig::from_env())
    }

    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn RmaBackend> {
        &self.backend
    }
}
