//! Concurrency chaos scenarios (C-CONC-*).
//!
//! Several tasks drive one orchestrator while collaborators answer late from
//! worker threads.

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::Duration;
    use sync_types::SyncState;

    use crate::assertions::OperationKind;
    use crate::harness::{ChaosConfig, ChaosHarness};
    use crate::scenarios::support::{init_tracing, settle_and_verify};

    async fn drive(harness: &ChaosHarness, tasks: u64, steps: usize, act: fn(&ChaosHarness, u32)) {
        let handles: Vec<_> = (0..tasks)
            .map(|task| {
                let harness = harness.clone();
                tokio::spawn(async move {
                    let mut rng = StdRng::seed_from_u64(task);
                    for _ in 0..steps {
                        act(&harness, rng.gen_range(0..100));
                        tokio::time::sleep(Duration::from_micros(rng.gen_range(0..500))).await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    // ========================================================================
    // C-CONC-* Concurrent callers
    // ========================================================================

    /// C-CONC-01: Many tasks request syncs at once.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn c_conc_01_concurrent_sync_requests() {
        init_tracing();
        let harness = ChaosHarness::new(ChaosConfig::default()).unwrap();

        drive(&harness, 8, 50, |h, _| h.start_sync()).await;

        settle_and_verify(&harness).await;
        assert!(!harness.starts().is_empty());
    }

    /// C-CONC-02: Sync requests race visibility changes.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn c_conc_02_sync_requests_race_visibility() {
        init_tracing();
        let harness = ChaosHarness::new(ChaosConfig {
            seed: 2,
            ..ChaosConfig::default()
        })
        .unwrap();

        drive(&harness, 6, 60, |h, roll| match roll {
            0..=59 => h.start_sync(),
            60..=79 => h.move_to_background(),
            _ => h.move_to_foreground(),
        })
        .await;

        settle_and_verify(&harness).await;
    }

    /// C-CONC-03: Realtime channel drops while callers keep syncing.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn c_conc_03_spurious_realtime_shut_downs() {
        init_tracing();
        let harness = ChaosHarness::new(ChaosConfig {
            seed: 3,
            init_failure_rate: 0.1,
            ..ChaosConfig::default()
        })
        .unwrap();

        drive(&harness, 6, 60, |h, roll| match roll {
            0..=79 => h.start_sync(),
            _ => h.drop_realtime(),
        })
        .await;

        settle_and_verify(&harness).await;
    }

    /// C-CONC-04: Every start fails at least once across many seeds.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn c_conc_04_high_failure_rates_across_seeds() {
        init_tracing();
        for seed in 0..16 {
            let harness = ChaosHarness::new(ChaosConfig {
                seed,
                http_failure_rate: 0.6,
                realtime_failure_rate: 0.6,
                init_failure_rate: 0.5,
                ..ChaosConfig::default()
            })
            .unwrap();

            drive(&harness, 4, 20, |h, roll| match roll {
                0..=69 => h.start_sync(),
                70..=84 => h.move_to_background(),
                _ => h.move_to_foreground(),
            })
            .await;

            settle_and_verify(&harness).await;
        }
    }

    // ========================================================================
    // C-LATE-* Late outcomes
    // ========================================================================

    /// C-LATE-01: Slow collaborators, impatient caller.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn c_late_01_requests_while_outcomes_pending() {
        init_tracing();
        let harness = ChaosHarness::new(ChaosConfig {
            seed: 11,
            max_delay: Duration::from_millis(20),
            ..ChaosConfig::default()
        })
        .unwrap();

        for _ in 0..200 {
            harness.start_sync();
            tokio::time::sleep(Duration::from_micros(100)).await;
        }

        settle_and_verify(&harness).await;
    }

    /// C-LATE-02: Without failures, a foreground app always ends in realtime.
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn c_late_02_clean_run_reaches_realtime() {
        init_tracing();
        let harness = ChaosHarness::new(ChaosConfig {
            seed: 12,
            http_failure_rate: 0.0,
            realtime_failure_rate: 0.0,
            init_failure_rate: 0.0,
            ..ChaosConfig::default()
        })
        .unwrap();

        drive(&harness, 8, 25, |h, _| h.start_sync()).await;
        harness
            .quiesce(crate::scenarios::support::QUIESCE_TIMEOUT)
            .await
            .unwrap();

        assert_eq!(harness.state(), SyncState::Realtime);
        let http = harness
            .starts()
            .iter()
            .filter(|s| s.kind == OperationKind::Http)
            .count();
        assert_eq!(http, 1, "only the first request may use request/response sync");
    }
}
