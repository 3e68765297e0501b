pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod fabric;
pub mod handle;
pub mod pack;
pub mod strided;
pub mod transfer_type;
pub mod types;

pub use backend::{MemoryRegion, RegionRegistry, RemoteOps, RmaBackend, VectorOps};
pub use client::{StridedClient, SyncStridedClient};
pub use config::{StrataConfig, StridedMethod};
pub use error::{Result, StrataError};
pub use fabric::{FabricEvent, LoopbackFabric, LoopbackRegion};
pub use handle::{TransferGroup, TransferHandle, TransferState};
pub use pack::{pack_strided, unpack_strided};
pub use strided::{StrideDescriptor, StridedIov, strided_to_type};
pub use transfer_type::{Order, TransferType};
pub use types::{AccScale, AccType, DataType, Rank};
