//! Strided multi-thread search
//!
//! Worker `t` of `N` tries `t, t + N, t + 2N, ...` in ascending order.
//! Hits are folded into a shared minimum with `fetch_min`, and a worker
//! stops once its next nonce is not below that minimum. When every worker
//! has stopped, all nonces under the minimum have been tried, so the result
//! matches the sequential search exactly.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, warn};

use crate::digest::meets_difficulty;
use crate::miner::{
    MineError, Miner, MiningRequest, MiningResult, SearchControl, SearchOptions, check_difficulty,
    mine_with,
};
use crate::params::CHECK_INTERVAL;

/// Search with `threads` workers; 0 or 1 runs the sequential search
pub fn mine_parallel(
    request: &MiningRequest,
    threads: usize,
    options: &SearchOptions,
    control: &SearchControl,
) -> Result<MiningResult, MineError> {
    check_difficulty(request.difficulty)?;

    if threads <= 1 {
        return mine_with(request, options, control);
    }

    if control.is_cancelled() {
        warn!(attempts = 0, "search cancelled before start");
        return Err(MineError::Cancelled { attempts: 0 });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("ppow-worker-{}", i))
        .build()
        .map_err(|e| MineError::ThreadPool(e.to_string()))?;

    debug!(
        prefix = %request.prefix,
        difficulty = request.difficulty,
        threads,
        "starting parallel search"
    );

    let limit = options.limit();
    let best = AtomicU64::new(u64::MAX);
    let attempts = AtomicU64::new(0);
    // Set only by a worker that left its stride unfinished
    let interrupted = AtomicBool::new(false);
    let timed_out = AtomicBool::new(false);

    let start = Instant::now();
    let deadline = options.deadline(start);

    // Each worker returns its own hit, if any
    let hits = pool.broadcast(|ctx| {
        let mut miner = Miner::new(&request.prefix);
        let step = ctx.num_threads() as u64;
        let mut nonce = ctx.index() as u64;
        let mut pending: u64 = 0;
        let mut hit = None;

        loop {
            if nonce >= limit || nonce >= best.load(Ordering::Relaxed) {
                break;
            }

            let result = miner.attempt(nonce);
            pending += 1;

            if meets_difficulty(&result, request.difficulty) {
                best.fetch_min(nonce, Ordering::SeqCst);
                hit = Some((nonce, result));
                break;
            }

            if pending == CHECK_INTERVAL {
                control.add_hashes(pending);
                attempts.fetch_add(pending, Ordering::Relaxed);
                pending = 0;

                if control.is_cancelled() || timed_out.load(Ordering::Relaxed) {
                    interrupted.store(true, Ordering::SeqCst);
                    break;
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    timed_out.store(true, Ordering::SeqCst);
                    interrupted.store(true, Ordering::SeqCst);
                    break;
                }
            }

            nonce = match nonce.checked_add(step) {
                Some(next) => next,
                None => break,
            };
        }

        control.add_hashes(pending);
        attempts.fetch_add(pending, Ordering::Relaxed);
        hit
    });

    let elapsed = start.elapsed();
    let attempts = attempts.load(Ordering::SeqCst);

    // An interrupted worker may have skipped nonces below any candidate,
    // so a candidate is only reported when every stride ran to completion.
    if interrupted.load(Ordering::SeqCst) {
        if timed_out.load(Ordering::SeqCst) {
            let elapsed_secs = elapsed.as_secs_f64();
            warn!(attempts, elapsed_secs, "search timed out");
            return Err(MineError::TimedOut {
                attempts,
                elapsed_secs,
            });
        }
        warn!(attempts, "search cancelled");
        return Err(MineError::Cancelled { attempts });
    }

    // Every stride stopped at or past the global minimum, so the smallest
    // hit is the answer
    match hits.into_iter().flatten().min_by_key(|(nonce, _)| *nonce) {
        Some((nonce, winning)) => {
            debug!(nonce, attempts, elapsed_secs = elapsed.as_secs_f64(), "found nonce");
            Ok(MiningResult::new(request, nonce, winning, attempts, elapsed))
        }
        None => {
            warn!(attempts, "attempt limit reached without a qualifying nonce");
            Err(MineError::Exhausted { attempts })
        }
    }
}
