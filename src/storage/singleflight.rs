//! 凭据刷新的单飞协调 / Single-flight coordination for credential refresh
//!
//! 同一驱动实例上的并发调用不得同时刷新凭据：并发的刷新会互相作废对方刚签发的令牌。
//! Concurrent callers on one driver instance must not refresh simultaneously:
//! racing refreshes would each invalidate the other's freshly issued token.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

/// 代数检查的单飞闸 / Generation-checked single-flight gate
///
/// 先记录观察到的代数再排队；获得锁后若代数已变，说明别的调用者刚完成了
/// 同一件事，直接合并结果。
pub struct SingleFlight {
    generation: AtomicU64,
    lock: Mutex<()>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            lock: Mutex::new(()),
        }
    }

    /// 执行op，或合并到刚完成的一次执行上；返回本调用者是否真正执行
    /// Run op, or coalesce onto an execution that just completed; returns
    /// whether this caller actually executed.
    pub async fn run<F, Fut, E>(&self, op: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let observed = self.generation.load(Ordering::SeqCst);
        let _guard = self.lock.lock().await;
        if self.generation.load(Ordering::SeqCst) != observed {
            return Ok(false);
        }
        op().await?;
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_execute_exactly_once() {
        let flight = Arc::new(SingleFlight::new());
        let executed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let executed = executed.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run(|| {
                        let executed = executed.clone();
                        async move {
                            // hold the flight long enough for every caller to queue up
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            executed.fetch_add(1, Ordering::SeqCst);
                            Ok::<(), ()>(())
                        }
                    })
                    .await
                    .unwrap()
            }));
        }

        let ran: Vec<bool> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert_eq!(ran.iter().filter(|r| **r).count(), 1);
    }

    #[tokio::test]
    async fn failed_execution_does_not_advance_the_generation() {
        let flight = SingleFlight::new();

        let result: Result<bool, &str> = flight.run(|| async { Err("refresh rejected") }).await;
        assert!(result.is_err());

        // next caller runs again instead of coalescing onto the failure
        let ran = flight.run(|| async { Ok::<(), &str>(()) }).await.unwrap();
        assert!(ran);
    }

    #[tokio::test]
    async fn sequential_calls_each_execute() {
        let flight = SingleFlight::new();
        let executed = AtomicUsize::new(0);

        for _ in 0..3 {
            let ran = flight
                .run(|| async {
                    executed.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), ()>(())
                })
                .await
                .unwrap();
            assert!(ran);
        }

        assert_eq!(executed.load(Ordering::SeqCst), 3);
    }
}
