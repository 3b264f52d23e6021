use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

// The global log always rolls over the trailing minute, independent of the
// per-requester window.
const GLOBAL_WINDOW: Duration = Duration::from_secs(60);

// Requester keys are emails; raw forms that fold to the same string share
// one quota log.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy)]
pub struct AdmissionConfig {
    pub global_cap: usize,
    pub per_identity_cap: usize,
    pub window: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            global_cap: 10,
            per_identity_cap: 5,
            window: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
    // `remaining` already subtracts a slot for the request under
    // evaluation, so it matches what a later `record` leaves behind.
    Allowed { used: usize, remaining: usize },
    Denied(Denial),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub reason: DenyReason,
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    GlobalCapacity,
    QuotaExhausted { used: usize, limit: usize },
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::GlobalCapacity => write!(f, "global capacity"),
            DenyReason::QuotaExhausted { .. } => write!(f, "quota exceeded"),
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            DenyReason::GlobalCapacity => write!(
                f,
                "global capacity reached, retry in {}s",
                self.retry_after.as_secs()
            ),
            DenyReason::QuotaExhausted { used, limit } => write!(
                f,
                "quota exceeded ({used}/{limit}), retry in {}s",
                self.retry_after.as_secs()
            ),
        }
    }
}

// Dual-scope sliding-window admission: a shared one-minute log caps total
// throughput, a per-requester log over a longer window enforces fairness.
// One mutex guards both, so prune-check-append runs as a unit per call.
pub struct AdmissionController {
    config: AdmissionConfig,
    inner: Mutex<Logs>,
}

#[derive(Default)]
struct Logs {
    global: VecDeque<Instant>,
    per_identity: HashMap<String, VecDeque<Instant>>,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Logs::default()),
        }
    }

    pub fn per_identity_cap(&self) -> usize {
        self.config.per_identity_cap
    }

    // Evaluate without charging quota. Safe to call any number of times;
    // in-place pruning never changes an outcome, only drops entries that
    // no longer count.
    pub fn check(&self, requester_key: &str) -> AdmissionDecision {
        self.check_at(requester_key, Instant::now())
    }

    // Charge one admitted request against both scopes. Callers invoke this
    // only after the gated work actually used the upstream resource.
    pub fn record(&self, requester_key: &str) {
        self.record_at(requester_key, Instant::now());
    }

    // Number of requester keys currently holding a log.
    pub fn tracked_identities(&self) -> usize {
        self.inner
            .lock()
            .map(|logs| logs.per_identity.len())
            .unwrap_or(0)
    }

    fn check_at(&self, requester_key: &str, now: Instant) -> AdmissionDecision {
        let Ok(mut logs) = self.inner.lock() else {
            // A poisoned lock fails open rather than blocking traffic.
            return AdmissionDecision::Allowed {
                used: 0,
                remaining: self.config.per_identity_cap.saturating_sub(1),
            };
        };

        // The shared cap protects aggregate upstream throughput, so it is
        // evaluated before any per-requester accounting.
        prune(&mut logs.global, now, GLOBAL_WINDOW);
        if logs.global.len() >= self.config.global_cap {
            return AdmissionDecision::Denied(Denial {
                reason: DenyReason::GlobalCapacity,
                retry_after: GLOBAL_WINDOW,
            });
        }

        let key = normalize_key(requester_key);
        let (used, oldest) = match logs.per_identity.get_mut(&key) {
            Some(log) => {
                prune(log, now, self.config.window);
                (log.len(), log.front().copied())
            }
            None => (0, None),
        };
        if used == 0 {
            // Drop logs that pruned down to nothing instead of keeping
            // empty entries around forever.
            logs.per_identity.remove(&key);
        }

        if used >= self.config.per_identity_cap {
            // The earliest moment a slot frees up is when the oldest
            // surviving entry leaves the window.
            let retry_after = match oldest {
                Some(oldest) => {
                    ceil_to_minutes((oldest + self.config.window).saturating_duration_since(now))
                }
                None => GLOBAL_WINDOW,
            };
            return AdmissionDecision::Denied(Denial {
                reason: DenyReason::QuotaExhausted {
                    used,
                    limit: self.config.per_identity_cap,
                },
                retry_after,
            });
        }

        AdmissionDecision::Allowed {
            used,
            remaining: self.config.per_identity_cap - used - 1,
        }
    }

    fn record_at(&self, requester_key: &str, now: Instant) {
        let Ok(mut logs) = self.inner.lock() else {
            return;
        };
        prune(&mut logs.global, now, GLOBAL_WINDOW);
        logs.global.push_back(now);

        let key = normalize_key(requester_key);
        let log = logs.per_identity.entry(key).or_default();
        prune(log, now, self.config.window);
        log.push_back(now);
    }
}

// Logs are append-only in time order, so expired entries are always at the
// front.
fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = log.front() {
        if now.duration_since(oldest) < window {
            break;
        }
        log.pop_front();
    }
}

// Retry hints round up to whole minutes and never drop below one minute.
fn ceil_to_minutes(d: Duration) -> Duration {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    Duration::from_secs(secs.div_ceil(60).max(1) * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const MINUTE: Duration = Duration::from_secs(60);

    fn controller(global_cap: usize, per_identity_cap: usize, window: Duration) -> AdmissionController {
        AdmissionController::new(AdmissionConfig {
            global_cap,
            per_identity_cap,
            window,
        })
    }

    #[test]
    fn first_request_reserves_a_slot() {
        let ctrl = controller(10, 5, 60 * MINUTE);
        assert_eq!(
            ctrl.check("alice@example.com"),
            AdmissionDecision::Allowed {
                used: 0,
                remaining: 4
            }
        );
    }

    #[test]
    fn quota_denial_counts_retry_from_oldest_entry() {
        let ctrl = controller(10, 5, 60 * MINUTE);
        let t0 = Instant::now();
        for i in 0..5u32 {
            ctrl.record_at("alice@example.com", t0 + i * MINUTE);
        }

        // Oldest entry leaves the window at t0 + 60min; from t0 + 20min
        // that is 40 minutes out.
        let decision = ctrl.check_at("alice@example.com", t0 + 20 * MINUTE);
        assert_eq!(
            decision,
            AdmissionDecision::Denied(Denial {
                reason: DenyReason::QuotaExhausted { used: 5, limit: 5 },
                retry_after: 40 * MINUTE,
            })
        );
    }

    #[test]
    fn retry_hint_rounds_up_to_whole_minutes() {
        let ctrl = controller(10, 1, 60 * MINUTE);
        let t0 = Instant::now();
        ctrl.record_at("bob@example.com", t0);

        let decision = ctrl.check_at("bob@example.com", t0 + 20 * MINUTE + Duration::from_secs(1));
        let AdmissionDecision::Denied(denial) = decision else {
            panic!("expected denial");
        };
        // 39min 59s until the slot frees up, reported as 40 minutes.
        assert_eq!(denial.retry_after, 40 * MINUTE);
    }

    #[test]
    fn retry_hint_never_drops_below_one_minute() {
        let ctrl = controller(10, 1, 60 * MINUTE);
        let t0 = Instant::now();
        ctrl.record_at("bob@example.com", t0);

        let decision = ctrl.check_at("bob@example.com", t0 + 60 * MINUTE - Duration::from_secs(1));
        let AdmissionDecision::Denied(denial) = decision else {
            panic!("expected denial");
        };
        assert_eq!(denial.retry_after, MINUTE);
    }

    #[test]
    fn global_cap_takes_precedence_over_quota() {
        let ctrl = controller(3, 1, 60 * MINUTE);
        let t0 = Instant::now();
        for _ in 0..3 {
            ctrl.record_at("carol@example.com", t0);
        }

        // Carol is over her own quota too, but the shared cap wins.
        let decision = ctrl.check_at("carol@example.com", t0 + Duration::from_secs(1));
        assert_eq!(
            decision,
            AdmissionDecision::Denied(Denial {
                reason: DenyReason::GlobalCapacity,
                retry_after: MINUTE,
            })
        );
    }

    #[test]
    fn per_identity_entries_age_out_of_the_window() {
        let ctrl = controller(100, 5, 60 * MINUTE);
        let t0 = Instant::now();
        for _ in 0..5 {
            ctrl.record_at("dave@example.com", t0);
        }

        let decision = ctrl.check_at("dave@example.com", t0 + 60 * MINUTE + Duration::from_secs(1));
        assert_eq!(
            decision,
            AdmissionDecision::Allowed {
                used: 0,
                remaining: 4
            }
        );
    }

    #[test]
    fn global_entries_age_out_after_a_minute() {
        let ctrl = controller(1, 5, 60 * MINUTE);
        let t0 = Instant::now();
        ctrl.record_at("erin@example.com", t0);

        assert!(matches!(
            ctrl.check_at("frank@example.com", t0 + Duration::from_secs(30)),
            AdmissionDecision::Denied(_)
        ));
        assert!(matches!(
            ctrl.check_at("frank@example.com", t0 + Duration::from_secs(61)),
            AdmissionDecision::Allowed { .. }
        ));
    }

    #[test]
    fn check_has_no_observable_side_effects() {
        let ctrl = controller(10, 5, 60 * MINUTE);
        let t0 = Instant::now();
        for _ in 0..4 {
            ctrl.record_at("grace@example.com", t0);
        }

        let first = ctrl.check_at("grace@example.com", t0 + MINUTE);
        for _ in 0..10 {
            assert_eq!(ctrl.check_at("grace@example.com", t0 + MINUTE), first);
        }
        assert_eq!(
            first,
            AdmissionDecision::Allowed {
                used: 4,
                remaining: 0
            }
        );
    }

    #[test]
    fn requester_keys_are_case_insensitive() {
        let ctrl = controller(10, 5, 60 * MINUTE);
        let t0 = Instant::now();
        ctrl.record_at("  Alice@X.com ", t0);

        assert_eq!(
            ctrl.check_at("alice@x.com", t0 + Duration::from_secs(1)),
            AdmissionDecision::Allowed {
                used: 1,
                remaining: 3
            }
        );
    }

    #[test]
    fn fully_expired_logs_are_dropped() {
        let ctrl = controller(10, 5, 60 * MINUTE);
        let t0 = Instant::now();
        ctrl.record_at("heidi@example.com", t0);
        assert_eq!(ctrl.tracked_identities(), 1);

        ctrl.check_at("heidi@example.com", t0 + 61 * MINUTE);
        assert_eq!(ctrl.tracked_identities(), 0);
    }

    // Two concurrent submissions race for a single slot. All gated work
    // drains through one consumer task (as in the report worker), which is
    // what keeps check-then-record free of interleaving.
    #[tokio::test]
    async fn concurrent_submissions_admit_exactly_one() {
        use tokio::sync::{mpsc, oneshot};

        let ctrl = Arc::new(controller(10, 1, 60 * MINUTE));
        let (tx, mut rx) = mpsc::channel::<oneshot::Sender<bool>>(8);

        let gate = ctrl.clone();
        let consumer = tokio::spawn(async move {
            while let Some(reply) = rx.recv().await {
                let admitted = matches!(
                    gate.check("ivan@example.com"),
                    AdmissionDecision::Allowed { .. }
                );
                if admitted {
                    gate.record("ivan@example.com");
                }
                let _ = reply.send(admitted);
            }
        });

        let mut handles = Vec::new();
        for _ in 0..2 {
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let (reply_tx, reply_rx) = oneshot::channel();
                tx.send(reply_tx).await.expect("queue send");
                reply_rx.await.expect("reply")
            }));
        }
        drop(tx);

        let mut admitted = 0;
        for handle in handles {
            if handle.await.expect("join") {
                admitted += 1;
            }
        }
        consumer.await.expect("consumer");
        assert_eq!(admitted, 1);
    }
}
