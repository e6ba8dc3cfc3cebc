//! Stage timing. Wraps a pipeline stage and logs when it starts and how long
//! it took, without the stage itself knowing about it.

use std::future::Future;
use std::time::Instant;

use tracing::info;

pub fn timed<T>(stage: &str, f: impl FnOnce() -> T) -> T {
    info!("STARTING {stage}");
    let started = Instant::now();
    let out = f();
    info!("COMPLETED {stage} in {:.2} seconds", started.elapsed().as_secs_f64());
    out
}

pub async fn timed_async<F>(stage: &str, fut: F) -> F::Output
where
    F: Future,
{
    info!("STARTING {stage}");
    let started = Instant::now();
    let out = fut.await;
    info!("COMPLETED {stage} in {:.2} seconds", started.elapsed().as_secs_f64());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_returns_stage_output() {
        assert_eq!(timed("Addition", || 2 + 2), 4);
    }

    #[tokio::test]
    async fn test_timed_async_returns_stage_output() {
        let out = timed_async("Echo", async { "done" }).await;
        assert_eq!(out, "done");
    }
}
