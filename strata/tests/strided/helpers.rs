use strata::{LoopbackFabric, StrataConfig, StrideDescriptor, StridedClient, StridedMethod};
use std::sync::Arc;

/// Both transfer strategies, for tests that must hold under either.
pub const METHODS: [StridedMethod; 2] = [StridedMethod::Datatype, StridedMethod::IoVector];

/// Fabric with `world_size` ranks and one `bytes`-sized allocation.
/// Returns the fabric and the per-rank base addresses.
pub fn setup(world_size: u32, bytes: usize) -> (Arc<LoopbackFabric>, Vec<u64>) {
    let fabric = Arc::new(LoopbackFabric::new(world_size));
    let bases = fabric.malloc(bytes).unwrap();
    (fabric, bases)
}

pub fn client(fabric: &Arc<LoopbackFabric>, method: StridedMethod) -> Arc<StridedClient> {
    Arc::new(StridedClient::with_config(
        fabric.clone(),
        StrataConfig::with_method(method),
    ))
}

/// Deterministic non-repeating-looking bytes.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Visit every leaf block of a descriptor as `(src_offset, dst_offset)`,
/// outermost level first, by plain recursion.
pub fn visit_blocks(desc: &StrideDescriptor, mut f: impl FnMut(usize, usize)) {
    fn rec(
        level: usize,
        src: usize,
        dst: usize,
        desc: &StrideDescriptor,
        f: &mut dyn FnMut(usize, usize),
    ) {
        if level == 0 {
            f(src, dst);
            return;
        }
        let i = level - 1;
        for k in 0..desc.count()[level] {
            rec(
                i,
                src + k * desc.src_strides()[i],
                dst + k * desc.dst_strides()[i],
                desc,
                f,
            );
        }
    }
    rec(desc.levels(), 0, 0, desc, &mut f);
}

/// What a strided copy of `src` into a zeroed `dst_len` buffer must produce.
pub fn expected_copy(src: &[u8], desc: &StrideDescriptor, dst_len: usize) -> Vec<u8> {
    let n = desc.block_bytes();
    let mut out = vec![0u8; dst_len];
    visit_blocks(desc, |s, d| out[d..d + n].copy_from_slice(&src[s..s + n]));
    out
}

pub fn f64_bytes(vals: &[f64]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn bytes_f64(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

pub fn i32_bytes(vals: &[i32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn bytes_i32(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
        .collect()
}
