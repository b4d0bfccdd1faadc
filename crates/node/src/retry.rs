use std::{fmt::Display, time::Duration};

/// A type that keeps track of attempts.
#[derive(Clone, Copy, Debug)]
pub struct Retry {
    retries: u32,
    delay: Option<Duration>,
}

impl Retry {
    /// Creates a new `Retry` instance that runs the callback at most `1 + retries` times.
    pub fn new(retries: u32, delay: Option<Duration>) -> Self {
        Self { retries, delay }
    }

    /// Returns the number of attempts left.
    pub fn remaining(&self) -> u32 {
        self.retries
    }

    fn handle_err(&mut self, err: &dyn Display) {
        self.retries -= 1;
        warn!(target: "chainprop::node", "erroneous attempt ({} tries remaining): {err}", self.retries);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
    }

    /// Runs the given closure in a loop, retrying errors accepted by `retryable` up to the
    /// specified number of times.
    pub fn run<T, E, F, P>(mut self, retryable: P, mut callback: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        loop {
            match callback() {
                Err(e) if self.retries > 0 && retryable(&e) => self.handle_err(&e),
                res => return res,
            }
        }
    }
}
