use std::time::{Duration, Instant};

use log::debug;

/// Logs how long a scope took when it ends.
pub struct FunctionTimer {
    name: &'static str,
    start: Instant,
}

impl FunctionTimer {
    pub fn new(name: &'static str) -> Self {
        FunctionTimer {
            name,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

// runs when the timer goes out of scope
impl Drop for FunctionTimer {
    fn drop(&mut self) {
        debug!("{} took {:?}", self.name, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_grows() {
        let timer = FunctionTimer::new("test");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
    }
}
