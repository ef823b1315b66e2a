/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Parallel runner handed to codec backends
//!
//! The adapter owns the runner for the duration of one decode or encode.
//! Backends only borrow it when it is attached and must forget it in
//! `release_parallel_runner`, which the adapter calls before the runner
//! is dropped on every exit path.
use prism_core::log::trace;
use prism_core::options::default_num_threads;

/// A thread budget for a single codec session
#[derive(Debug, Eq, PartialEq)]
pub struct ParallelRunner {
    threads: usize
}

impl ParallelRunner {
    /// Create a runner with `threads` workers, zero means
    /// use the available parallelism
    pub fn new(threads: usize) -> ParallelRunner {
        let threads = if threads == 0 {
            default_num_threads()
        } else {
            threads
        };
        trace!("Creating parallel runner with {threads} threads");
        ParallelRunner { threads }
    }

    pub const fn num_threads(&self) -> usize {
        self.threads
    }
}

impl Drop for ParallelRunner {
    fn drop(&mut self) {
        trace!("Destroying parallel runner ({} threads)", self.threads);
    }
}
