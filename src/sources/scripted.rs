// Scripted source for tests: replays a fixed sequence of counter sets, failures
// and hangs, so engine behaviour can be exercised without touching the host.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{AdapterError, Source};
use crate::models::{CounterSample, CounterWidth, Counters};

#[derive(Debug)]
pub enum ScriptStep {
    /// Counters stamped at `base + offset`.
    Sample {
        offset: Duration,
        rows: Vec<(String, Counters)>,
    },
    Fail(AdapterError),
    /// Blocks the calling thread, then reports a timeout.
    Hang(Duration),
    /// Blocks the calling thread, then plays the next step in the same call.
    Delay(Duration),
}

#[derive(Clone)]
pub struct ScriptedSource {
    name: &'static str,
    width: CounterWidth,
    base: Instant,
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
}

impl ScriptedSource {
    pub fn new(name: &'static str) -> Self {
        Self::with_base(name, Instant::now())
    }

    pub fn with_base(name: &'static str, base: Instant) -> Self {
        Self {
            name,
            width: CounterWidth::Bits64,
            base,
            steps: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn width(mut self, width: CounterWidth) -> Self {
        self.width = width;
        self
    }

    pub fn sample(self, offset: Duration, rows: &[(&str, Counters)]) -> Self {
        self.push(ScriptStep::Sample {
            offset,
            rows: rows.iter().map(|(n, c)| (n.to_string(), *c)).collect(),
        });
        self
    }

    pub fn fail(self, error: AdapterError) -> Self {
        self.push(ScriptStep::Fail(error));
        self
    }

    pub fn hang(self, duration: Duration) -> Self {
        self.push(ScriptStep::Hang(duration));
        self
    }

    /// A sample that takes `delay` to arrive.
    pub fn slow_sample(self, delay: Duration, offset: Duration, rows: &[(&str, Counters)]) -> Self {
        self.push(ScriptStep::Delay(delay));
        self.sample(offset, rows)
    }

    /// Appends a step; clones share one script, so tests can extend it while it runs.
    pub fn push(&self, step: ScriptStep) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push_back(step);
        }
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn base(&self) -> Instant {
        self.base
    }
}

impl Source for ScriptedSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn collect(&mut self, _timeout: Option<Duration>) -> Result<Vec<CounterSample>, AdapterError> {
        loop {
            let step = self
                .steps
                .lock()
                .map_err(|e| AdapterError::unavailable(self.name, format!("script lock poisoned: {e}")))?
                .pop_front();
            return match step {
                None => Err(AdapterError::unavailable(self.name, "script exhausted")),
                Some(ScriptStep::Sample { offset, rows }) => {
                    let timestamp = self.base + offset;
                    Ok(rows
                        .into_iter()
                        .map(|(name, counters)| CounterSample::new(name, counters, self.width, timestamp))
                        .collect())
                }
                Some(ScriptStep::Fail(e)) => Err(e),
                Some(ScriptStep::Hang(duration)) => {
                    std::thread::sleep(duration);
                    Err(AdapterError::Timeout {
                        source_name: self.name,
                        timeout: duration,
                    })
                }
                Some(ScriptStep::Delay(duration)) => {
                    std::thread::sleep(duration);
                    continue;
                }
            };
        }
    }
}
