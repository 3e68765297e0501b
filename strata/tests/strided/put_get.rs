use super::helpers::{METHODS, client, expected_copy, pattern, setup};
use strata::{StrideDescriptor, StridedIov};

/// Two levels: 8-byte runs, 4 per row, 3 rows. Packed rows of 32 bytes
/// locally, rows 64 bytes apart remotely.
fn two_level() -> StrideDescriptor {
    StrideDescriptor::new(vec![8, 32], vec![8, 64], vec![8, 4, 3]).unwrap()
}

#[test]
fn enumeration_of_two_level_scenario() {
    let iov = StridedIov::from_descriptor(0, 0, &two_level()).unwrap();
    assert_eq!(iov.len(), 12);
    assert_eq!(iov.bytes(), 8);

    let mut expected = Vec::new();
    for k in 0..3u64 {
        for j in 0..4u64 {
            expected.push((8 * j + 32 * k, 8 * j + 64 * k));
        }
    }
    assert_eq!(iov.iter().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn put_two_level() {
    for method in METHODS {
        let (fabric, bases) = setup(2, 256);
        let c = client(&fabric, method);
        let desc = two_level();
        let src = pattern(96, 1);

        c.put_strided(&src, bases[1], &desc, 1).await.unwrap();

        let remote = fabric.read(1, bases[1], 256).unwrap();
        assert_eq!(remote, expected_copy(&src, &desc, 256), "{method}");
        // Rank 0 is untouched.
        assert_eq!(fabric.read(0, bases[0], 256).unwrap(), vec![0u8; 256]);
    }
}

#[tokio::test]
async fn get_two_level() {
    for method in METHODS {
        let (fabric, bases) = setup(2, 256);
        let c = client(&fabric, method);
        let remote = pattern(256, 9);
        fabric.write(1, bases[1], &remote).unwrap();

        // Remote rows 64 apart, local rows packed.
        let desc = StrideDescriptor::new(vec![8, 64], vec![8, 32], vec![8, 4, 3]).unwrap();
        let mut local = vec![0u8; 96];
        c.get_strided(bases[1], &mut local, &desc, 1).await.unwrap();

        assert_eq!(local, expected_copy(&remote, &desc, 96), "{method}");
    }
}

#[tokio::test]
async fn contiguous_put_get() {
    for method in METHODS {
        let (fabric, bases) = setup(3, 128);
        let c = client(&fabric, method);
        let desc = StrideDescriptor::contiguous(40).unwrap();
        let src = pattern(40, 3);

        c.put_strided(&src, bases[2] + 16, &desc, 2).await.unwrap();
        assert_eq!(fabric.read(2, bases[2] + 16, 40).unwrap(), src);

        let mut back = vec![0u8; 40];
        c.get_strided(bases[2] + 16, &mut back, &desc, 2)
            .await
            .unwrap();
        assert_eq!(back, src, "{method}");
    }
}

#[tokio::test]
async fn submatrix_into_larger_matrix() {
    // Put a 3x5 block of f64 into an 8x10 f64 matrix at row 2, col 4.
    let (fabric, bases) = setup(2, 8 * 10 * 8);
    let desc = StrideDescriptor::new(vec![5 * 8], vec![10 * 8], vec![5 * 8, 3]).unwrap();
    let src = pattern(3 * 5 * 8, 17);
    let offset = (2 * 10 + 4) * 8;

    for method in METHODS {
        let c = client(&fabric, method);
        c.put_strided(&src, bases[1] + offset as u64, &desc, 1)
            .await
            .unwrap();

        let matrix = fabric.read(1, bases[1], 8 * 10 * 8).unwrap();
        for row in 0..3 {
            let at = offset + row * 80;
            assert_eq!(&matrix[at..at + 40], &src[row * 40..row * 40 + 40], "{method}");
            // Neighbouring cells stay zero.
            assert_eq!(&matrix[at - 8..at], &[0u8; 8]);
            assert_eq!(&matrix[at + 40..at + 48], &[0u8; 8]);
        }
    }
}

#[tokio::test]
async fn three_levels_roundtrip() {
    for method in METHODS {
        let (fabric, bases) = setup(2, 1024);
        let c = client(&fabric, method);
        let put =
            StrideDescriptor::new(vec![4, 12, 48], vec![8, 32, 160], vec![4, 3, 4, 2]).unwrap();
        let src = pattern(96, 5);

        c.put_strided(&src, bases[0], &put, 0).await.unwrap();

        let get =
            StrideDescriptor::new(vec![8, 32, 160], vec![4, 12, 48], vec![4, 3, 4, 2]).unwrap();
        let mut back = vec![0u8; 96];
        c.get_strided(bases[0], &mut back, &get, 0).await.unwrap();
        assert_eq!(back, src, "{method}");
    }
}
