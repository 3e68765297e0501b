//! The strategy is a performance knob: both must leave identical bytes behind.

use super::helpers::{client, f64_bytes, pattern, setup};
use strata::{AccScale, AccType, FabricEvent, StrideDescriptor, StridedMethod};

const REMOTE_BYTES: usize = 4096;

fn descriptors() -> Vec<StrideDescriptor> {
    vec![
        StrideDescriptor::contiguous(64).unwrap(),
        StrideDescriptor::new(vec![16], vec![48], vec![16, 5]).unwrap(),
        StrideDescriptor::new(vec![8, 32], vec![8, 64], vec![8, 4, 3]).unwrap(),
        StrideDescriptor::new(vec![24, 96], vec![40, 400], vec![16, 4, 3]).unwrap(),
        StrideDescriptor::new(vec![8, 16, 64, 256], vec![16, 64, 512, 2048], vec![8, 2, 4, 4, 2])
            .unwrap(),
    ]
}

/// Run `op` against a fresh fabric per strategy and return rank 1's memory.
async fn remote_after<F, Fut>(method: StridedMethod, op: F) -> Vec<u8>
where
    F: FnOnce(std::sync::Arc<strata::StridedClient>, u64) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let (fabric, bases) = setup(2, REMOTE_BYTES);
    fabric.write(1, bases[1], &pattern(REMOTE_BYTES, 77)).unwrap();
    op(client(&fabric, method), bases[1]).await;
    fabric.read(1, bases[1], REMOTE_BYTES).unwrap()
}

#[tokio::test]
async fn put_is_strategy_independent() {
    for desc in descriptors() {
        let src = pattern(desc.src_extent(), 3);
        let mut results = Vec::new();
        for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
            let (src, desc) = (src.clone(), desc.clone());
            results.push(
                remote_after(method, |c, base| async move {
                    c.put_strided(&src, base, &desc, 1).await.unwrap();
                })
                .await,
            );
        }
        assert_eq!(results[0], results[1], "{desc:?}");
        assert_ne!(results[0], pattern(REMOTE_BYTES, 77));
    }
}

#[tokio::test]
async fn get_is_strategy_independent() {
    for desc in descriptors() {
        // Read back with the roles of the strides swapped.
        let desc = StrideDescriptor::new(
            desc.dst_strides().to_vec(),
            desc.src_strides().to_vec(),
            desc.count().to_vec(),
        )
        .unwrap();

        let mut results = Vec::new();
        for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
            let (fabric, bases) = setup(2, REMOTE_BYTES);
            fabric.write(1, bases[1], &pattern(REMOTE_BYTES, 11)).unwrap();
            let c = client(&fabric, method);

            let mut local = vec![0xaau8; desc.dst_extent()];
            c.get_strided(bases[1], &mut local, &desc, 1).await.unwrap();
            results.push(local);
        }
        assert_eq!(results[0], results[1], "{desc:?}");
    }
}

#[tokio::test]
async fn accumulate_is_strategy_independent() {
    for desc in descriptors() {
        let n = desc.src_extent() / 8;
        let src = f64_bytes(&(0..n).map(|i| i as f64 * 0.25).collect::<Vec<_>>());

        let mut results = Vec::new();
        for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
            let (fabric, bases) = setup(2, REMOTE_BYTES);
            fabric
                .write(1, bases[1], &f64_bytes(&[1.5; REMOTE_BYTES / 8]))
                .unwrap();
            let c = client(&fabric, method);
            c.accumulate_strided(
                AccType::Double,
                AccScale::Double(-3.0),
                &src,
                bases[1],
                &desc,
                1,
            )
            .await
            .unwrap();
            results.push(fabric.read(1, bases[1], REMOTE_BYTES).unwrap());
        }
        assert_eq!(results[0], results[1], "{desc:?}");
    }
}

#[tokio::test]
async fn strategies_issue_one_call_each() {
    let desc = StrideDescriptor::new(vec![8, 32], vec![8, 64], vec![8, 4, 3]).unwrap();
    let src = pattern(96, 0);

    let (fabric, bases) = setup(2, 256);
    client(&fabric, StridedMethod::Datatype)
        .put_strided(&src, bases[1], &desc, 1)
        .await
        .unwrap();
    client(&fabric, StridedMethod::IoVector)
        .put_strided(&src, bases[1], &desc, 1)
        .await
        .unwrap();

    let moves: Vec<FabricEvent> = fabric
        .events()
        .into_iter()
        .filter(FabricEvent::is_data_movement)
        .collect();
    assert_eq!(
        moves,
        vec![
            FabricEvent::PutTyped { rank: 1, bytes: 96 },
            FabricEvent::PutV {
                rank: 1,
                blocks: 12,
                bytes: 96
            },
        ]
    );
}

#[tokio::test]
async fn extent_into_neighbouring_allocation_fails_under_both() {
    for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
        let fabric = std::sync::Arc::new(strata::LoopbackFabric::new(1));
        let a = fabric.malloc(REMOTE_BYTES).unwrap();
        let b = fabric.malloc(REMOTE_BYTES).unwrap();
        let c = client(&fabric, method);
        // The second block lands on the first byte after `a`.
        let desc = StrideDescriptor::new(vec![8], vec![REMOTE_BYTES], vec![8, 2]).unwrap();

        let err = c.put_strided(&[7u8; 16], a[0], &desc, 0).await.unwrap_err();
        assert!(
            matches!(err, strata::StrataError::OutOfBounds { len, .. } if len == REMOTE_BYTES + 8),
            "{method}: {err}"
        );
        assert_eq!(fabric.read(0, a[0], 8).unwrap(), vec![0u8; 8], "{method}");
        assert_eq!(fabric.read(0, b[0], 8).unwrap(), vec![0u8; 8], "{method}");
        assert!(fabric.events().is_empty(), "{method}: {:?}", fabric.events());

        let mut dst = vec![0u8; 16];
        let get = StrideDescriptor::new(vec![REMOTE_BYTES], vec![8], vec![8, 2]).unwrap();
        let err = c.get_strided(a[0], &mut dst, &get, 0).await.unwrap_err();
        assert!(err.is_invariant_violation(), "{method}: {err}");
    }
}

#[tokio::test]
async fn address_at_top_of_range_fails_the_same_under_both() {
    let desc = StrideDescriptor::new(vec![8], vec![8], vec![8, 2]).unwrap();
    for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
        let (fabric, _) = setup(1, 64);
        let c = client(&fabric, method);
        let mut dst = [0u8; 16];
        let err = c
            .get_strided(u64::MAX - 7, &mut dst, &desc, 0)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                strata::StrataError::UnregisteredAddress { addr, rank: 0 } if addr == u64::MAX - 7
            ),
            "{method}: {err}"
        );
        assert!(err.is_invariant_violation());
        assert!(fabric.events().is_empty());
    }
}
