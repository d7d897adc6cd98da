mod common;

use common::FlatPageTable;
use kernel_monitor::{PageEntryBits, PageTableLock, PageWalker, VirtualAddress};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::{panic, thread};

#[test]
fn guard_releases_on_drop() {
    let tables = PageTableLock::new(FlatPageTable::default());

    {
        let mut guard = tables.lock();
        guard.map(0x1000, 0x5000, true, false);
        assert!(tables.is_locked());
    }

    assert!(!tables.is_locked());
    let entry = tables.with_lock(|t| t.entry(0x1000)).unwrap();
    assert!(entry.present() && entry.writable() && !entry.user_access());
}

#[test]
fn try_lock_fails_while_held() {
    let tables = PageTableLock::new(FlatPageTable::default());

    let held = tables.try_lock();
    assert!(held.is_some());
    assert!(tables.try_lock().is_none());

    drop(held);
    assert!(tables.try_lock().is_some());
}

#[test]
fn get_mut_and_into_inner_bypass_the_lock() {
    let mut tables = PageTableLock::new(FlatPageTable::default());
    tables.get_mut().map(0x2000, 0x9000, false, true);

    let inner = tables.into_inner();
    assert_eq!(inner.entries.len(), 1);
}

#[test]
fn unsized_walker_behind_the_lock() {
    let tables = PageTableLock::new(FlatPageTable::default());
    let dynamic: &PageTableLock<dyn PageWalker> = &tables;

    {
        let mut walker = dynamic.lock();
        let entry = walker.walk(VirtualAddress::new(0x3abc), true).unwrap();
        *entry = PageEntryBits::new().with_present(true);
    }

    assert!(tables.with_lock(|t| t.entry(0x3000)).unwrap().present());
}

#[test]
fn concurrent_updates_are_exclusive() {
    let threads = 8;
    let iters = 2_000;

    let tables = Arc::new(PageTableLock::new(FlatPageTable::default()));
    let inside = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|n| {
            let tables = Arc::clone(&tables);
            let inside = Arc::clone(&inside);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for i in 0..iters {
                    tables.with_lock(|t| {
                        assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                        let va = ((n * iters + i) as u64) << 12;
                        t.map(va, va, i % 2 == 0, false);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                    thread::yield_now();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(tables.with_lock(|t| t.entries.len()), threads * iters);
    assert!(!tables.is_locked());
}

#[test]
fn lock_is_released_on_panic() {
    let tables = PageTableLock::new(FlatPageTable::default());

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        tables.with_lock(|t| {
            t.map(0x4000, 0x4000, true, true);
            panic!("walker failed");
        });
    }));
    assert!(res.is_err());

    assert!(tables.with_lock(|t| t.entry(0x4000)).is_some());
}

#[test]
fn lock_is_sync_for_send_walkers() {
    fn takes_sync<S: Sync>(_s: &S) {}
    let tables = PageTableLock::new(FlatPageTable::default());
    takes_sync(&tables);
}
