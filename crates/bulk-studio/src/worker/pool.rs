use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::debug;

/// Bounded pool of cooperative workers draining one shared queue.
///
/// Every worker pops the next job, awaits the handler, and repeats until the
/// queue is empty. Workers never wait for new jobs; the pool finishes once
/// all of them have stopped. A job is popped exactly once, so no two
/// workers ever see the same job.
pub struct WorkerPool<T> {
    queue: Arc<Mutex<VecDeque<T>>>,
    worker_count: usize,
}

impl<T: Send> WorkerPool<T> {
    /// Creates a pool over `jobs` in their given order.
    ///
    /// The effective worker count never exceeds the number of jobs, and is at
    /// least one whenever there is work.
    pub fn new(jobs: impl IntoIterator<Item = T>, worker_count: usize) -> Self {
        let queue: VecDeque<T> = jobs.into_iter().collect();
        let worker_count = if queue.is_empty() {
            0
        } else {
            worker_count.clamp(1, queue.len())
        };

        Self {
            queue: Arc::new(Mutex::new(queue)),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Drains the queue and returns how many jobs were handled.
    ///
    /// `handler` receives the worker index and the job.
    pub async fn run<F, Fut>(self, handler: F) -> usize
    where
        F: Fn(usize, T) -> Fut,
        Fut: Future<Output = ()>,
    {
        let handler = &handler;
        let workers = (0..self.worker_count).map(|worker_id| {
            let queue = Arc::clone(&self.queue);
            async move {
                debug!(worker_id, "Worker started");
                let mut handled = 0usize;
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(job) = next else {
                        break;
                    };
                    handler(worker_id, job).await;
                    handled += 1;
                }
                debug!(worker_id, handled, "Worker finished");
                handled
            }
        });

        join_all(workers).await.into_iter().sum()
    }
}
