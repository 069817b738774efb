//! In-process leader election.
//!
//! [`ElectionGate`] is a mutual-exclusion gate shared by everyone in the
//! process who wants to lead. It does not coordinate across processes or
//! machines, carries no term or fencing token, and ignores the path it is
//! asked to lead on.

use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use crate::path::CellPath;

/// Process-local leader election gate. Clones share the same gate.
#[derive(Clone, Debug, Default)]
pub struct ElectionGate {
    lock: Arc<Mutex<()>>,
}

impl ElectionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the gate is free, then hold it.
    ///
    /// The gate stays held until the returned [`ReleaseSignal`] is closed.
    /// A signal that is never closed blocks every later caller for the rest
    /// of the process; there is no lease expiry.
    pub async fn lead(&self, path: &CellPath) -> ReleaseSignal {
        let guard = Arc::clone(&self.lock).lock_owned().await;
        debug!(%path, "acquired leadership");

        let (closer, closed) = oneshot::channel::<()>();
        let path = path.to_string();
        tokio::spawn(async move {
            // Resolves when the signal is closed, by release() or by drop.
            let _ = closed.await;
            drop(guard);
            debug!(%path, "released leadership");
        });
        ReleaseSignal { _closer: closer }
    }

    /// Returns `true` if someone currently holds the gate.
    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

/// Keeps the election gate held while alive.
///
/// Closing it (calling [`release`](ReleaseSignal::release) or dropping it)
/// lets a background task release the gate shortly afterwards.
#[derive(Debug)]
#[must_use = "dropping the signal releases leadership immediately"]
pub struct ReleaseSignal {
    _closer: oneshot::Sender<()>,
}

impl ReleaseSignal {
    /// Close the signal, releasing the gate.
    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::timeout;

    fn lock_path() -> CellPath {
        CellPath::local("/tmp/sax-test-root/cell/leader")
    }

    #[tokio::test]
    async fn sequential_leads_succeed_after_release() {
        let gate = ElectionGate::new();
        let first = gate.lead(&lock_path()).await;
        assert!(gate.is_held());
        first.release();

        let second = timeout(Duration::from_secs(5), gate.lead(&lock_path()))
            .await
            .expect("second lead should succeed once the first is released");
        drop(second);
    }

    #[tokio::test]
    async fn second_lead_blocks_while_first_held() {
        let gate = ElectionGate::new();
        let _first = gate.lead(&lock_path()).await;

        let blocked = timeout(Duration::from_millis(200), gate.lead(&lock_path())).await;
        assert!(blocked.is_err(), "second lead must block while the first is held");
    }

    #[tokio::test]
    async fn path_is_ignored() {
        let gate = ElectionGate::new();
        let _first = gate.lead(&CellPath::local("/a")).await;

        let remote = CellPath::parse("/gcs/b/c");
        let other = timeout(Duration::from_millis(200), gate.lead(&remote)).await;
        assert!(other.is_err(), "the gate is process-wide, not per path");
    }

    #[tokio::test]
    async fn waiter_wakes_on_release() {
        let gate = ElectionGate::new();
        let first = gate.lead(&lock_path()).await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.lead(&lock_path()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        let second = timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should acquire after release")
            .unwrap();
        assert!(gate.is_held());
        second.release();
    }

    #[tokio::test]
    async fn separate_gates_are_independent() {
        let a = ElectionGate::new();
        let b = ElectionGate::new();
        let _held = a.lead(&lock_path()).await;
        let other = timeout(Duration::from_secs(5), b.lead(&lock_path())).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn gate_frees_after_release() {
        let gate = ElectionGate::new();
        gate.lead(&lock_path()).await.release();
        // Release happens on a background task.
        timeout(Duration::from_secs(5), async {
            while gate.is_held() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }
}
