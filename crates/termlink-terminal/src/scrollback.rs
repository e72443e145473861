//! Scrollback buffer for terminal history
//!
//! Lines scrolled off the top of the screen are kept in fixed-size
//! partitions. When the total exceeds the configured maximum, the oldest
//! partition is dropped as a whole and its lines go back into a pool that
//! the screen draws fresh lines from.

use crate::line::Line;
use std::collections::VecDeque;

/// Lines per partition
pub const PARTITION_SIZE: usize = 100;

/// Default maximum scrollback lines
pub const DEFAULT_SCROLLBACK_LINES: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ScrollbackBuffer {
    partitions: VecDeque<Vec<Line>>,
    maximum_count: usize,
    len: usize,
    pool: Vec<Line>,
}

impl Default for ScrollbackBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK_LINES)
    }
}

impl ScrollbackBuffer {
    pub fn new(maximum_count: usize) -> Self {
        Self {
            partitions: VecDeque::new(),
            maximum_count,
            len: 0,
            pool: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append an evicted line as the newest entry
    pub fn push(&mut self, line: Line) {
        if self.maximum_count == 0 {
            self.release(line);
            return;
        }

        let needs_partition = self
            .partitions
            .back()
            .map_or(true, |partition| partition.len() >= PARTITION_SIZE);
        if needs_partition {
            self.partitions.push_back(Vec::with_capacity(PARTITION_SIZE));
        }
        if let Some(partition) = self.partitions.back_mut() {
            partition.push(line);
            self.len += 1;
        }

        self.enforce_limit();
    }

    /// Line by age, 0 = oldest
    pub fn get(&self, index: usize) -> Option<&Line> {
        let mut remaining = index;
        for partition in &self.partitions {
            if remaining < partition.len() {
                return partition.get(remaining);
            }
            remaining -= partition.len();
        }
        None
    }

    /// Line by recency, 0 = newest
    pub fn get_from_end(&self, index: usize) -> Option<&Line> {
        if index >= self.len {
            return None;
        }
        self.get(self.len - 1 - index)
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.partitions.iter().flatten()
    }

    pub fn clear(&mut self) {
        let partitions = std::mem::take(&mut self.partitions);
        for line in partitions.into_iter().flatten() {
            self.release(line);
        }
        self.len = 0;
    }

    /// Change the capacity, dropping the oldest lines if needed
    pub fn set_maximum_count(&mut self, maximum_count: usize) {
        self.maximum_count = maximum_count;
        self.enforce_limit();
    }

    /// A blank line of `columns` cells, reusing a pooled allocation if one exists
    pub fn take_blank_line(&mut self, columns: usize) -> Line {
        match self.pool.pop() {
            Some(mut line) => {
                line.reset(columns);
                line
            }
            None => Line::new(columns),
        }
    }

    fn enforce_limit(&mut self) {
        while self.len > self.maximum_count {
            if self.partitions.len() > 1 {
                if let Some(oldest) = self.partitions.pop_front() {
                    self.len -= oldest.len();
                    for line in oldest {
                        self.release(line);
                    }
                }
            } else if let Some(only) = self.partitions.front_mut() {
                // Never drop the partition currently being written
                let excess = self.len - self.maximum_count;
                let dropped: Vec<Line> = only.drain(..excess).collect();
                let emptied = only.is_empty();
                self.len -= dropped.len();
                if emptied {
                    self.partitions.clear();
                }
                for line in dropped {
                    self.release(line);
                }
            } else {
                self.len = 0;
            }
        }
    }

    /// Hand a discarded line back to the pool of reusable allocations
    pub fn release(&mut self, line: Line) {
        if self.pool.len() < PARTITION_SIZE {
            self.pool.push(line);
        }
    }
}
