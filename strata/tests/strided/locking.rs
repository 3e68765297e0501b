use super::helpers::{client, pattern, setup};
use strata::{
    FabricEvent, MemoryRegion, RegionRegistry, StrataConfig, StrideDescriptor, StridedClient,
    StridedMethod,
};
use std::sync::Arc;
use std::time::Duration;

fn lock_events(events: &[FabricEvent]) -> (usize, usize) {
    let locks = events
        .iter()
        .filter(|e| matches!(e, FabricEvent::Lock { .. }))
        .count();
    let unlocks = events
        .iter()
        .filter(|e| matches!(e, FabricEvent::Unlock { .. }))
        .count();
    (locks, unlocks)
}

#[tokio::test]
async fn every_lock_is_paired() {
    let (fabric, bases) = setup(2, 256);
    let desc = StrideDescriptor::new(vec![8], vec![32], vec![8, 4]).unwrap();
    let src = pattern(32, 0);

    for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
        let c = client(&fabric, method);
        c.put_strided(&src, bases[1], &desc, 1).await.unwrap();
        let mut dst = vec![0u8; 128];
        let back = StrideDescriptor::new(vec![32], vec![32], vec![8, 4]).unwrap();
        c.get_strided(bases[1], &mut dst, &back, 1).await.unwrap();

        fabric.inject_fault(3);
        assert!(c.put_strided(&src, bases[1], &desc, 1).await.is_err());
    }

    assert_eq!(lock_events(&fabric.events()), (6, 6));
}

#[tokio::test]
async fn unlocked_iov_issues_no_lock() {
    let (fabric, bases) = setup(2, 64);
    let cfg = StrataConfig {
        strided_method: StridedMethod::IoVector,
        lock_iov_transfers: false,
    };
    let c = StridedClient::with_config(fabric.clone(), cfg);
    let desc = StrideDescriptor::contiguous(16).unwrap();

    c.put_strided(&[1u8; 16], bases[0], &desc, 0).await.unwrap();
    assert_eq!(lock_events(&fabric.events()), (0, 0));
}

/// A transfer waits while another party holds the target region's lock.
#[tokio::test]
async fn transfer_waits_for_region_lock() {
    for method in [StridedMethod::Datatype, StridedMethod::IoVector] {
        let (fabric, bases) = setup(2, 64);
        let region = fabric.lookup(bases[1], 1).unwrap();
        region.lock(1).await.unwrap();

        let c = client(&fabric, method);
        let pending = {
            let c = Arc::clone(&c);
            let base = bases[1];
            tokio::spawn(async move {
                let desc = StrideDescriptor::contiguous(8).unwrap();
                c.put_strided(&[5u8; 8], base, &desc, 1).await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished(), "{method}");
        assert_eq!(fabric.read(1, bases[1], 8).unwrap(), vec![0u8; 8]);

        region.unlock(1).unwrap();
        pending.await.unwrap().unwrap();
        assert_eq!(fabric.read(1, bases[1], 8).unwrap(), vec![5u8; 8]);
    }
}

/// Dropping a handle mid-transfer releases the lock it was waiting on or holding.
#[tokio::test]
async fn dropped_handle_leaves_region_usable() {
    let (fabric, bases) = setup(2, 64);
    let region = fabric.lookup(bases[1], 1).unwrap();
    region.lock(1).await.unwrap();

    let c = client(&fabric, StridedMethod::Datatype);
    let desc = StrideDescriptor::contiguous(8).unwrap();
    let h = c.put_strided_nb(vec![1u8; 8], bases[1], desc.clone(), 1);
    tokio::task::yield_now().await;
    drop(h);
    region.unlock(1).unwrap();

    tokio::time::timeout(
        Duration::from_secs(5),
        c.put_strided(&[2u8; 8], bases[1], &desc, 1),
    )
    .await
    .expect("region lock leaked")
    .unwrap();
    assert_eq!(fabric.read(1, bases[1], 8).unwrap(), vec![2u8; 8]);
}
