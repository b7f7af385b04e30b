#[cfg(test)]
mod allocator_tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rayon::prelude::*;

    use ip4pool::{
        format_address, parse_address, AddressManager, AllocatorError, AllocatorState,
        BitmapAllocator,
    };

    fn ip(text: &str) -> u32 {
        parse_address(text).unwrap()
    }

    /// Assign every address, confirm exhaustion, release one and all, then
    /// assign everything again in the same order
    fn full_cycle(pool: &BitmapAllocator, from: u32, to: u32) {
        for expected in from..=to {
            let got = pool.assign();
            assert_eq!(
                got,
                i64::from(expected),
                "expected {} got {}",
                format_address(expected),
                got
            );
        }
        assert_eq!(pool.assign(), -1, "assigned an address past the end of the range");

        let middle = from + (to - from) / 2;
        pool.release(middle);
        assert_eq!(pool.assign(), i64::from(middle), "released address was not reused first");

        for addr in from..=to {
            pool.release(addr);
        }

        for expected in from..=to {
            assert_eq!(pool.assign(), i64::from(expected));
        }
        assert_eq!(pool.assign(), -1);

        pool.close().unwrap();
        let deadline = Instant::now() + Duration::from_secs(1);
        while pool.status() != AllocatorState::Stopped {
            assert!(Instant::now() < deadline, "allocator did not stop");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_full_cycle_over_string_range() {
        let from = ip("192.168.1.0");
        let to = ip("192.168.8.250");
        let pool = BitmapAllocator::from_range(from, to).unwrap();
        assert_eq!(pool.count(), 2555);

        full_cycle(&pool, from, to);
    }

    #[test]
    fn test_full_cycle_over_subnets() {
        let from = ip("192.168.0.0");
        let to = ip("192.168.1.255");

        for subnet in ["192.168.1.0/23", "192.168.1.0/255.255.254.0"] {
            let pool = BitmapAllocator::from_subnet(subnet).unwrap();
            assert_eq!(pool.first(), from, "{}", subnet);
            assert_eq!(pool.last(), to, "{}", subnet);
            assert_eq!(pool.count(), 512, "{}", subnet);

            full_cycle(&pool, from, to);
        }
    }

    #[test]
    fn test_ranges_not_aligned_to_bytes() {
        for size in [1u32, 7, 8, 9, 15, 16, 17, 63, 65] {
            let pool = BitmapAllocator::from_range(1000, 1000 + size - 1).unwrap();
            let assigned: Vec<i64> = (0..size).map(|_| pool.assign()).collect();
            let expected: Vec<i64> = (1000..1000 + size).map(i64::from).collect();
            assert_eq!(assigned, expected, "size {}", size);
            assert_eq!(pool.assign(), -1, "size {}", size);
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let pool = BitmapAllocator::from_string_range("10.1.0.0", "10.1.0.9").unwrap();
        for _ in 0..5 {
            pool.assign();
        }

        // free, already free, and outside the range
        pool.release(ip("10.1.0.7"));
        pool.release(ip("10.1.0.3"));
        pool.release(ip("10.1.0.3"));
        pool.release(ip("10.0.255.255"));
        pool.release(ip("10.1.0.10"));

        let next: Vec<i64> = (0..7).map(|_| pool.assign()).collect();
        let expected: Vec<i64> = [
            "10.1.0.3", "10.1.0.5", "10.1.0.6", "10.1.0.7", "10.1.0.8", "10.1.0.9",
        ]
        .iter()
        .map(|text| i64::from(ip(text)))
        .chain(std::iter::once(-1))
        .collect();
        assert_eq!(next, expected);
    }

    #[test]
    fn test_random_release_order_reassigns_ascending() {
        let pool = BitmapAllocator::from_subnet("172.16.0.0/22").unwrap();
        let mut addrs: Vec<u32> = (0..pool.count()).map(|_| pool.try_assign().unwrap()).collect();

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        addrs.shuffle(&mut rng);
        let released = &addrs[..100];
        for &addr in released {
            pool.release(addr);
        }

        let mut expected = released.to_vec();
        expected.sort_unstable();
        let reassigned: Vec<u32> = (0..100).map(|_| pool.try_assign().unwrap()).collect();
        assert_eq!(reassigned, expected);
        assert_eq!(pool.try_assign(), Err(AllocatorError::Exhausted));
    }

    #[test]
    fn test_boundary_checks() {
        let pool = BitmapAllocator::from_subnet("10.20.30.0/24").unwrap();
        let (from, to) = (pool.first(), pool.last());

        assert!(pool.is_out_of_range(from - 1));
        assert!(pool.is_in_range(from));
        assert!(pool.is_in_range(to));
        assert!(pool.is_out_of_range(to + 1));
        assert!(!pool.assign_specific(from - 1));
        assert!(!pool.assign_specific(to + 1));
    }

    #[test]
    fn test_concurrent_threads_never_share_an_address() {
        let pool = Arc::new(BitmapAllocator::from_subnet("10.0.0.0/20").unwrap());
        let per_thread = 512;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| pool.try_assign().unwrap())
                        .collect::<Vec<u32>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for addr in handle.join().unwrap() {
                assert!(all.insert(addr), "{} handed out twice", format_address(addr));
            }
        }
        assert_eq!(all.len() as u64, pool.count());
        assert_eq!(pool.assign(), -1);
    }

    #[test]
    fn test_parallel_assign_specific_succeeds_once() {
        let pool = BitmapAllocator::from_subnet("10.9.0.0/24").unwrap();
        let target = ip("10.9.0.42");

        let wins = (0..64)
            .into_par_iter()
            .filter(|_| pool.assign_specific(target))
            .count();
        assert_eq!(wins, 1);

        pool.release(target);
        assert!(pool.assign_specific(target));
    }

    #[test]
    fn test_parallel_assign_and_release() {
        let pool = BitmapAllocator::from_subnet("10.8.0.0/24").unwrap();

        let assigned: Vec<u32> = (0..256)
            .into_par_iter()
            .map(|_| pool.try_assign().unwrap())
            .collect();
        let unique: HashSet<u32> = assigned.iter().copied().collect();
        assert_eq!(unique.len(), 256);

        assigned.par_iter().for_each(|&addr| pool.release(addr));
        assert_eq!(pool.assign(), i64::from(ip("10.8.0.0")));
    }

    #[test]
    fn test_close_unblocks_and_fails_fast() {
        let pool = Arc::new(BitmapAllocator::from_subnet("10.7.0.0/16").unwrap());

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || loop {
                    match pool.try_assign() {
                        Ok(_) => continue,
                        Err(e) => return e,
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        pool.close().unwrap();

        for worker in workers {
            let err = worker.join().unwrap();
            assert!(
                matches!(err, AllocatorError::Closed | AllocatorError::Exhausted),
                "unexpected error {:?}",
                err
            );
        }
        assert_eq!(pool.status(), AllocatorState::Stopped);
        assert_eq!(pool.try_release(ip("10.7.0.0")), Err(AllocatorError::Closed));
    }

    #[test]
    fn test_drop_stops_worker() {
        let pool = BitmapAllocator::from_range(0, 255).unwrap();
        assert_eq!(pool.status(), AllocatorState::Running);
        drop(pool);
    }

    #[test]
    fn test_managers_behind_trait_objects() {
        let managers: Vec<Box<dyn AddressManager>> = vec![
            Box::new(BitmapAllocator::from_subnet("10.0.0.0/31").unwrap()),
            Box::new(BitmapAllocator::from_string_range("10.0.1.0", "10.0.1.1").unwrap()),
        ];

        for manager in &managers {
            assert_eq!(manager.assign(), i64::from(manager.first()));
            assert_eq!(manager.assign(), i64::from(manager.last()));
            assert_eq!(manager.assign(), -1);
            manager.close().unwrap();
        }
    }
}
