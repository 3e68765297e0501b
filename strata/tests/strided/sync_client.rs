use super::helpers::{METHODS, bytes_f64, expected_copy, f64_bytes, pattern, setup};
use strata::{AccScale, AccType, StrataConfig, StrideDescriptor, SyncStridedClient};

#[test]
fn blocking_put_get_accumulate() {
    for method in METHODS {
        let (fabric, bases) = setup(2, 512);
        let c = SyncStridedClient::new(fabric.clone(), StrataConfig::with_method(method)).unwrap();
        assert_eq!(c.config().strided_method, method);

        let desc = StrideDescriptor::new(vec![16], vec![64], vec![16, 4]).unwrap();
        let src = pattern(64, 42);
        c.put_strided(&src, bases[1], &desc, 1).unwrap();
        assert_eq!(
            fabric.read(1, bases[1], 512).unwrap(),
            expected_copy(&src, &desc, 512)
        );

        let back = StrideDescriptor::new(vec![64], vec![16], vec![16, 4]).unwrap();
        let mut dst = vec![0u8; 64];
        c.get_strided(bases[1], &mut dst, &back, 1).unwrap();
        assert_eq!(dst, src, "{method}");

        fabric.write(0, bases[0], &f64_bytes(&[0.0; 8])).unwrap();
        let acc = StrideDescriptor::contiguous(64).unwrap();
        c.accumulate_strided(
            AccType::Double,
            AccScale::Double(0.5),
            &f64_bytes(&[2.0; 8]),
            bases[0],
            &acc,
            0,
        )
        .unwrap();
        assert_eq!(bytes_f64(&fabric.read(0, bases[0], 64).unwrap()), vec![1.0; 8]);
    }
}

#[test]
fn blocking_flagged_put() {
    let (fabric, bases) = setup(2, 128);
    let flags = fabric.malloc(4).unwrap();
    let c = SyncStridedClient::new(fabric.clone(), StrataConfig::default()).unwrap();

    let desc = StrideDescriptor::contiguous(32).unwrap();
    c.put_strided_with_flag(&[9u8; 32], bases[1], &desc, flags[1], 7, 1)
        .unwrap();
    c.fence(1).unwrap();

    assert_eq!(fabric.read(1, bases[1], 32).unwrap(), vec![9u8; 32]);
    assert_eq!(fabric.read(1, flags[1], 4).unwrap(), 7i32.to_le_bytes());
}

#[test]
fn blocking_errors_propagate() {
    let (fabric, bases) = setup(2, 64);
    let c = SyncStridedClient::new(fabric.clone(), StrataConfig::default()).unwrap();
    fabric.inject_fault(11);

    let desc = StrideDescriptor::contiguous(8).unwrap();
    let err = c.put_strided(&[0u8; 8], bases[0], &desc, 0).unwrap_err();
    assert_eq!(err.status_code(), 11);
}
