//! Scaled accumulate of a sub-matrix, once per transfer strategy.
//!
//! A packed 3x4 block of doubles is added, scaled by 0.5, into the middle of
//! an 8x8 matrix on rank 1. The result is identical whichever strategy the
//! client is configured with.
//!
//! ```bash
//! cargo run --example strided_accumulate
//! ```

use strata::{
    AccScale, AccType, LoopbackFabric, StrataConfig, StrideDescriptor, StridedClient,
    StridedMethod,
};
use std::sync::Arc;

const N: usize = 8;

#[tokio::main]
async fn main() -> strata::Result<()> {
    // Rows of 4 doubles, packed locally, N doubles apart remotely.
    let block = StrideDescriptor::new(vec![4 * 8], vec![N * 8], vec![4 * 8, 3])?;
    let src: Vec<u8> = (1..=12).flat_map(|v| (v as f64).to_le_bytes()).collect();

    for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
        let fabric = Arc::new(LoopbackFabric::new(2));
        let bases = fabric.malloc(N * N * 8)?;
        let ones: Vec<u8> = (0..N * N).flat_map(|_| 1.0f64.to_le_bytes()).collect();
        fabric.write(1, bases[1], &ones)?;

        let client = StridedClient::with_config(fabric.clone(), StrataConfig::with_method(method));
        let origin = bases[1] + ((2 * N + 2) * 8) as u64;
        client
            .accumulate_strided(AccType::Double, AccScale::Double(0.5), &src, origin, &block, 1)
            .await?;

        println!("{method}:");
        let bytes = fabric.read(1, bases[1], N * N * 8)?;
        for row in bytes.chunks_exact(N * 8) {
            let vals: Vec<f64> = row
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes(b.try_into().unwrap_or([0; 8])))
                .collect();
            println!("  {vals:?}");
        }
        println!("  calls: {:?}", fabric.events());
    }
    // Output: rows 2..5, columns 2..6 hold 1.5, 2.0, ... 7.0 under both strategies.

    Ok(())
}
