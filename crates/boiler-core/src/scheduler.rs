use crate::timebase::TimeBase;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

/// A scheduled callback. Plain function pointers keep the cyclic control
/// tasks allocation-free; a task that wants to recur re-registers itself as
/// its final action.
pub type Task<C> = fn(&mut Scheduler<C>, &mut C);

struct Entry<C> {
    due_ms: u64,
    seq: u64,
    task: Task<C>,
}

impl<C> PartialEq for Entry<C> {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl<C> Eq for Entry<C> {}

impl<C> PartialOrd for Entry<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for Entry<C> {
    // BinaryHeap is a max-heap, so "greatest" must mean earliest due time,
    // then lowest sequence number (registration order on ties).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-threaded cooperative scheduler. Callbacks run to completion in
/// earliest-due, then registration order; there is no preemption, no
/// priority scheme and no cancellation primitive.
pub struct Scheduler<C> {
    queue: BinaryHeap<Entry<C>>,
    seq: u64,
    timebase: TimeBase,
    now_ms: u64,
    simulated: bool,
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
            timebase: TimeBase::new(),
            now_ms: 0,
            simulated: false,
        }
    }

    /// A scheduler whose clock jumps to each callback's due instant instead
    /// of sleeping. Drives the simulated rig and the test suite.
    pub fn simulated() -> Self {
        Self {
            queue: BinaryHeap::new(),
            seq: 0,
            timebase: TimeBase::new(),
            now_ms: 0,
            simulated: true,
        }
    }

    /// The scheduler's authoritative clock. Tasks use this for every
    /// timestamp they write so real and simulated runs behave identically.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Register `task` to run no earlier than `delay_ms` from now.
    pub fn schedule_after_ms(&mut self, delay_ms: u64, task: Task<C>) {
        let entry = Entry {
            due_ms: self.now_ms + delay_ms,
            seq: self.seq,
            task,
        };
        self.seq += 1;
        self.queue.push(entry);
    }

    pub fn schedule_after_secs(&mut self, delay_s: u64, task: Task<C>) {
        self.schedule_after_ms(delay_s * 1000, task);
    }

    /// Run callbacks until `stop` is raised or no task re-registers.
    /// Waits for each callback's due time, then invokes it to completion.
    pub fn run(&mut self, ctx: &mut C, stop: &AtomicBool) {
        while !stop.load(std::sync::atomic::Ordering::Relaxed) {
            let entry = match self.queue.pop() {
                Some(entry) => entry,
                None => break,
            };
            if self.simulated {
                self.now_ms = self.now_ms.max(entry.due_ms);
            } else {
                let wall = self.timebase.now_ms();
                if entry.due_ms > wall {
                    std::thread::sleep(Duration::from_millis(entry.due_ms - wall));
                }
                self.now_ms = self.timebase.now_ms().max(entry.due_ms);
            }
            (entry.task)(self, ctx);
        }
    }

    /// Run every callback due at or before `deadline_ms`, advancing virtual
    /// time task by task. Only meaningful on a simulated scheduler.
    pub fn run_until(&mut self, ctx: &mut C, deadline_ms: u64) {
        loop {
            let due = match self.queue.peek() {
                Some(entry) if entry.due_ms <= deadline_ms => true,
                _ => false,
            };
            if !due {
                break;
            }
            if let Some(entry) = self.queue.pop() {
                self.now_ms = self.now_ms.max(entry.due_ms);
                (entry.task)(self, ctx);
            }
        }
        self.now_ms = self.now_ms.max(deadline_ms);
    }
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trace {
        calls: Vec<(u64, &'static str)>,
    }

    fn record_a(s: &mut Scheduler<Trace>, t: &mut Trace) {
        t.calls.push((s.now_ms(), "a"));
    }

    fn record_b(s: &mut Scheduler<Trace>, t: &mut Trace) {
        t.calls.push((s.now_ms(), "b"));
    }

    fn recurring(s: &mut Scheduler<Trace>, t: &mut Trace) {
        t.calls.push((s.now_ms(), "tick"));
        if t.calls.len() < 3 {
            s.schedule_after_ms(100, recurring);
        }
    }

    #[test]
    fn runs_in_due_time_order() {
        let mut sched = Scheduler::simulated();
        let mut trace = Trace::default();
        sched.schedule_after_ms(200, record_b);
        sched.schedule_after_ms(100, record_a);
        sched.run_until(&mut trace, 1000);
        assert_eq!(trace.calls, vec![(100, "a"), (200, "b")]);
    }

    #[test]
    fn same_instant_runs_in_registration_order() {
        let mut sched = Scheduler::simulated();
        let mut trace = Trace::default();
        sched.schedule_after_ms(50, record_a);
        sched.schedule_after_ms(50, record_b);
        sched.run_until(&mut trace, 50);
        assert_eq!(trace.calls, vec![(50, "a"), (50, "b")]);
    }

    #[test]
    fn task_recurs_by_rescheduling_itself() {
        let mut sched = Scheduler::simulated();
        let mut trace = Trace::default();
        sched.schedule_after_ms(100, recurring);
        sched.run_until(&mut trace, 10_000);
        assert_eq!(trace.calls, vec![(100, "tick"), (200, "tick"), (300, "tick")]);
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn run_until_leaves_future_tasks_queued() {
        let mut sched = Scheduler::simulated();
        let mut trace = Trace::default();
        sched.schedule_after_ms(100, record_a);
        sched.schedule_after_ms(500, record_b);
        sched.run_until(&mut trace, 250);
        assert_eq!(trace.calls, vec![(100, "a")]);
        assert_eq!(sched.pending(), 1);
        assert_eq!(sched.now_ms(), 250);
    }

    #[test]
    fn seconds_helper_scales_to_millis() {
        let mut sched: Scheduler<Trace> = Scheduler::simulated();
        sched.schedule_after_secs(2, record_a);
        let mut trace = Trace::default();
        sched.run_until(&mut trace, 1999);
        assert!(trace.calls.is_empty());
        sched.run_until(&mut trace, 2000);
        assert_eq!(trace.calls, vec![(2000, "a")]);
    }
}
