//! Two-rank halo exchange on a 2-D grid of doubles.
//!
//! Each rank owns a `ROWS x COLS` grid whose first and last columns are ghost
//! cells. Rank 0 puts its last interior column into rank 1's left ghost
//! column, and rank 1 puts its first interior column into rank 0's right
//! ghost column. A column is one 8-byte run per row, `COLS * 8` bytes apart.
//!
//! ```bash
//! cargo run --example halo_exchange
//! ```

use strata::{LoopbackFabric, StrideDescriptor, StridedClient};
use std::sync::Arc;

const ROWS: usize = 4;
const COLS: usize = 6;
const PITCH: usize = COLS * 8;

fn cell(row: usize, col: usize) -> u64 {
    ((row * COLS + col) * 8) as u64
}

#[tokio::main]
async fn main() -> strata::Result<()> {
    let fabric = Arc::new(LoopbackFabric::new(2));
    let grids = fabric.malloc(ROWS * PITCH)?;

    // Interior cells of rank r hold r * 100 + row * 10 + col.
    for rank in 0..2u32 {
        let mut grid = vec![0.0f64; ROWS * COLS];
        for row in 0..ROWS {
            for col in 1..COLS - 1 {
                grid[row * COLS + col] = (rank as usize * 100 + row * 10 + col) as f64;
            }
        }
        let bytes: Vec<u8> = grid.iter().flat_map(|v| v.to_le_bytes()).collect();
        fabric.write(rank, grids[rank as usize], &bytes)?;
    }

    let column = StrideDescriptor::symmetric(vec![PITCH], vec![8, ROWS])?;
    let client = Arc::new(StridedClient::from_env(fabric.clone()));

    // (source rank, source column, target rank, target column)
    let exchanges = [(0u32, COLS - 2, 1u32, 0), (1, 1, 0, COLS - 1)];
    let mut tasks = Vec::new();
    for (from, src_col, to, dst_col) in exchanges {
        let client = Arc::clone(&client);
        let fabric = fabric.clone();
        let column = column.clone();
        let (src_grid, dst_grid) = (grids[from as usize], grids[to as usize]);
        tasks.push(tokio::spawn(async move {
            // The local side is the sender's own grid, starting at the column.
            let local = fabric.read(from, src_grid + cell(0, src_col), column.src_extent())?;
            client
                .put_strided(&local, dst_grid + cell(0, dst_col), &column, to)
                .await?;
            client.fence(to).await
        }));
    }
    for task in tasks {
        task.await
            .map_err(|e| strata::StrataError::TaskFailed(e.to_string()))??;
    }

    for rank in 0..2u32 {
        let bytes = fabric.read(rank, grids[rank as usize], ROWS * PITCH)?;
        println!("rank {rank}:");
        for row in bytes.chunks_exact(PITCH) {
            let vals: Vec<f64> = row
                .chunks_exact(8)
                .map(|b| f64::from_le_bytes(b.try_into().unwrap_or([0; 8])))
                .collect();
            println!("  {vals:?}");
        }
    }
    // Output: rank 0's last column repeats rank 1's column 1 (101, 111, ...)
    // and rank 1's first column repeats rank 0's column 4 (4, 14, ...).

    Ok(())
}
