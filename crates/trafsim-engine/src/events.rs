//! # trafsim-engine::events
//!
//! The event-kernel machinery shared by the engines: the `Queued` wrapper
//! that makes `BinaryHeap` behave as a deterministic min-priority queue, the
//! `EventQueue` each engine drives its run loop with, and the `DepartureHeap`
//! used by the single-server engines that keep no per-customer records.
//!
//! Events scheduled for the same instant pop in insertion order. This
//! matters: engines schedule a release for the same instant as the event
//! that triggered it, and the release must observe the trigger's effects.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use trafsim_types::time::SimTime;

/// A wrapper for an event payload that includes scheduling information.
/// This is the type stored in an engine's priority queue.
#[derive(Debug)]
pub struct Queued<T> {
    pub time: SimTime,
    /// A monotonic sequence number to ensure stable FIFO ordering for events
    /// scheduled at the exact same time.
    pub seq: u64,
    pub payload: T,
}

// The following implementations are what make `BinaryHeap` function as a
// min-heap with deterministic ordering. `SimTime` is an `f64`; scheduled
// times are always finite or `+inf` (a stream that never fires), both of
// which `total_cmp` orders consistently.

impl<T> PartialEq for Queued<T> {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl<T> Eq for Queued<T> {}

impl<T> PartialOrd for Queued<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Queued<T> {
    /// `BinaryHeap` is a max-heap, so the ordering is reversed to make it a
    /// min-heap. The primary sort key is `time` (earlier is greater), the
    /// secondary key is `seq` (earlier is greater).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A min-priority event queue keyed by event time, FIFO within a tie.
/// Owns the monotone insertion counter.
#[derive(Debug)]
pub struct EventQueue<T> {
    heap: BinaryHeap<Queued<T>>,
    next_seq: u64,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedules `payload` at `time`. Events at `+inf` are silently dropped;
    /// they stand for streams that never fire again.
    pub fn push(&mut self, time: SimTime, payload: T) {
        if time.is_infinite() {
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Queued { time, seq, payload });
    }

    pub fn pop_min(&mut self) -> Option<Queued<T>> {
        self.heap.pop()
    }

    pub fn peek_min(&self) -> Option<&Queued<T>> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduled departure times ordered soonest-first.
///
/// The boom-gate and car-park engines deliberately do not instantiate
/// per-customer records; a bare min-heap of departure instants is the only
/// queue state they retain, which is what makes millions of arrivals
/// affordable.
#[derive(Debug, Default)]
pub struct DepartureHeap {
    heap: BinaryHeap<MinTime>,
}

#[derive(Debug)]
struct MinTime(SimTime);

impl PartialEq for MinTime {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MinTime {}

impl PartialOrd for MinTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinTime {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0)
    }
}

impl DepartureHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: SimTime) {
        self.heap.push(MinTime(time));
    }

    /// The earliest scheduled departure, without removing it.
    pub fn peek(&self) -> Option<SimTime> {
        self.heap.peek().map(|t| t.0)
    }

    pub fn pop(&mut self) -> Option<SimTime> {
        self.heap.pop().map(|t| t.0)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
