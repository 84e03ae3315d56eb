use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Sleep for exact milliseconds (not interruptible).
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

/// Cooperative stop flag shared between a runner thread and its owner.
/// Waits on it wake up as soon as `stop()` is called.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        *lock.lock().unwrap_or_else(|e| e.into_inner()) = true;
        cvar.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait `secs` seconds. Returns `false` if stopped before or during the wait.
    /// Spans too long for a `Duration` wait until stopped.
    pub fn wait_secs(&self, secs: f64) -> bool {
        match Duration::try_from_secs_f64(secs.max(0.0)) {
            Ok(dur) => self.wait(dur),
            Err(_) => self.wait_deadline(None),
        }
    }

    pub fn wait(&self, dur: Duration) -> bool {
        self.wait_deadline(Instant::now().checked_add(dur))
    }

    /// Wait until `deadline`. Returns `false` if stopped first.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        self.wait_deadline(Some(deadline))
    }

    /// Like `wait_until`; `None` is a deadline past what `Instant` can hold,
    /// so only `stop()` ends the wait.
    pub fn wait_deadline(&self, deadline: Option<Instant>) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if *stopped {
                return false;
            }
            stopped = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return true;
                    }
                    match cvar.wait_timeout(stopped, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(e) => e.into_inner().0,
                    }
                }
                None => cvar.wait(stopped).unwrap_or_else(|e| e.into_inner()),
            };
        }
    }
}
