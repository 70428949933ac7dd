use std::{time::Duration, sync::Arc, thread::{self, JoinHandle}};

use anyhow::{Result, Context};
use parking_lot::{Condvar, Mutex};

pub trait PeriodCall {
    fn next(&mut self) -> Duration;
    fn call(&mut self, completed: bool);
}


/// Stops the periodic thread when dropped.
pub struct PeriodCallGuard {
    inner: Arc<PeriodCallGuardInner>,
    task: Option<JoinHandle<()>>,
}

impl Drop for PeriodCallGuard {
    fn drop(&mut self) {
        self.inner.exit();
    }
}

impl PeriodCallGuard {
    pub fn into_task(mut self) -> Option<JoinHandle<()>> {
        self.task.take()
    }

    /// request exit and wait for the last call
    pub fn stop(self) {
        if let Some(task) = self.into_task() {
            let _ = task.join();
        }
    }
}


struct PeriodCallGuardInner {
    exit_req: Mutex<bool>,
    cond: Condvar,
}

impl PeriodCallGuardInner {
    fn exit(&self) {
        *self.exit_req.lock() = true;
        self.cond.notify_all();
    }

    // returns true if exit requested
    fn wait_exit(&self, timeout: Duration) -> bool {
        let mut exit_req = self.exit_req.lock();
        if !*exit_req {
            self.cond.wait_for(&mut exit_req, timeout);
        }
        *exit_req
    }

    fn is_exit(&self) -> bool {
        *self.exit_req.lock()
    }
}

/// Runs `job` on a dedicated thread until the returned guard is dropped.
pub fn period_call<J>(name: &str, mut job: J) -> Result<PeriodCallGuard>
where
    J: PeriodCall + Send + 'static,
{
    let inner0 = Arc::new(PeriodCallGuardInner {
        exit_req: Mutex::new(false),
        cond: Condvar::new(),
    });

    let inner = inner0.clone();
    let task = thread::Builder::new()
    .name(name.to_string())
    .spawn(move || {
        loop {
            let duration = job.next();
            if duration.is_zero() {
                if inner.is_exit() {
                    break;
                }
                job.call(false);
            } else if inner.wait_exit(duration) {
                break;
            } else {
                job.call(false);
            }
        }
        job.call(true);
    })
    .with_context(||format!("fail to spawn thread [{}]", name))?;

    let guard = PeriodCallGuard {
        inner: inner0,
        task: Some(task),
    };

    Ok(guard)
}
