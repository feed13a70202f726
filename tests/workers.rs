use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_utils::sync::WaitGroup;

use rokv::workers::{RayonSessionPool, SessionPool, Workers};
use rokv::Result;

// Stand-in for serving one connection: a short-lived session that does
// a little work and hangs up.
fn serve<P: SessionPool>(pool: &P, sessions: usize) -> usize {
    let served = Arc::new(AtomicUsize::new(0));
    let wg = WaitGroup::new();

    for _ in 0..sessions {
        let served = Arc::clone(&served);
        let wg = wg.clone();
        pool.execute(move || {
            served.fetch_add(1, Ordering::SeqCst);
            drop(wg);
        });
    }

    wg.wait();
    served.load(Ordering::SeqCst)
}

#[test]
fn crew_serves_every_session() -> Result<()> {
    let pool = Workers::with_workers(4)?;
    assert_eq!(serve(&pool, 200), 200);
    Ok(())
}

// A handler bug that panics mid-session must cost only that
// connection; the crew keeps serving.
#[test]
fn crew_survives_panicking_sessions() -> Result<()> {
    let pool = Workers::with_workers(2)?;

    for _ in 0..50 {
        pool.execute(|| {
            // keep the panic flood out of the test output
            panic_control::disable_hook_in_current_thread();
            panic!("handler bug");
        });
    }

    assert_eq!(serve(&pool, 20), 20);
    Ok(())
}

#[test]
fn drop_finishes_accepted_sessions() -> Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let pool = Workers::with_workers(3)?;

    for i in 0..30 {
        let log = Arc::clone(&log);
        pool.execute(move || log.lock().unwrap().push(i));
    }
    drop(pool); // joins the crew

    let mut served = log.lock().unwrap().clone();
    served.sort_unstable();
    assert_eq!(served, (0..30).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn rayon_pool_serves_sessions() -> Result<()> {
    let pool = RayonSessionPool::with_workers(4)?;
    assert_eq!(serve(&pool, 100), 100);
    Ok(())
}

#[test]
fn empty_crew_is_rejected() {
    assert!(Workers::with_workers(0).is_err());
}
