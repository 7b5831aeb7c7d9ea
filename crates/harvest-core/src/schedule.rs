//! Cooperative single-threaded scheduling.
//!
//! The host drives a [`Scheduler`] by calling [`Scheduler::poll`] with the
//! current time; it hands back whatever is due. There is at most one pending
//! frame callback, scheduled according to the [`FramePolicy`], plus any
//! number of interval timers.
//!
//! A frame scheduled under `VSync` gets a [`FrameHandle::Display`], one
//! scheduled under `Unlimited` gets a [`FrameHandle::Immediate`]. Cancelling
//! requires the exact handle, kind included.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FramePolicy {
    /// One frame per display refresh.
    VSync { interval_ms: Millis },
    /// Requeue immediately after each frame.
    Unlimited,
}

impl Default for FramePolicy {
    fn default() -> Self {
        FramePolicy::VSync { interval_ms: 16 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameHandle {
    Display(u64),
    Immediate(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fired<T> {
    Frame(FrameHandle),
    Timer(TimerHandle, T),
}

#[derive(Debug, Clone)]
struct PendingFrame {
    handle: FrameHandle,
    due_ms: Millis,
}

#[derive(Debug, Clone)]
struct Interval<T> {
    task: T,
    every_ms: Millis,
    next_due_ms: Millis,
}

#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    policy: FramePolicy,
    next_id: u64,
    frame: Option<PendingFrame>,
    last_frame_ms: Option<Millis>,
    timers: BTreeMap<TimerHandle, Interval<T>>,
}

impl<T: Clone> Scheduler<T> {
    pub fn new(policy: FramePolicy) -> Self {
        Self {
            policy,
            next_id: 1,
            frame: None,
            last_frame_ms: None,
            timers: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> FramePolicy {
        self.policy
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Schedule the next frame. Returns the already pending one if any.
    pub fn request_frame(&mut self, now_ms: Millis) -> FrameHandle {
        if let Some(pending) = &self.frame {
            return pending.handle;
        }
        let id = self.allocate();
        let (handle, due_ms) = match self.policy {
            FramePolicy::VSync { interval_ms } => {
                let due = self
                    .last_frame_ms
                    .map_or(now_ms, |last| (last + interval_ms).max(now_ms));
                (FrameHandle::Display(id), due)
            }
            FramePolicy::Unlimited => (FrameHandle::Immediate(id), now_ms),
        };
        self.frame = Some(PendingFrame { handle, due_ms });
        handle
    }

    /// Cancel the pending frame if `handle` is exactly it.
    pub fn cancel_frame(&mut self, handle: FrameHandle) -> bool {
        match &self.frame {
            Some(pending) if pending.handle == handle => {
                self.frame = None;
                true
            }
            _ => false,
        }
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.frame.as_ref().map(|f| f.handle)
    }

    /// Switch policy. A pending frame is cancelled and rescheduled under the
    /// new policy; the new handle is returned.
    pub fn set_policy(&mut self, policy: FramePolicy, now_ms: Millis) -> Option<FrameHandle> {
        self.policy = policy;
        let pending = self.frame.take()?;
        log::debug!("frame policy changed; replacing {:?}", pending.handle);
        Some(self.request_frame(now_ms))
    }

    /// Fire `task` every `every_ms`, first at `now_ms + every_ms`.
    pub fn set_interval(&mut self, task: T, every_ms: Millis, now_ms: Millis) -> TimerHandle {
        let handle = TimerHandle(self.allocate());
        let every_ms = every_ms.max(1);
        self.timers.insert(
            handle,
            Interval {
                task,
                every_ms,
                next_due_ms: now_ms + every_ms,
            },
        );
        handle
    }

    pub fn clear_interval(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Earliest time anything is due.
    pub fn next_deadline(&self) -> Option<Millis> {
        let frame = self.frame.as_ref().map(|f| f.due_ms);
        let timer = self.timers.values().map(|t| t.next_due_ms).min();
        match (frame, timer) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Everything due at `now_ms`, ordered by due time. A timer that missed
    /// several periods fires once and skips ahead. The frame is one-shot and
    /// must be requested again.
    pub fn poll(&mut self, now_ms: Millis) -> Vec<Fired<T>> {
        let mut due: Vec<(Millis, Fired<T>)> = Vec::new();
        for (handle, timer) in self.timers.iter_mut() {
            if timer.next_due_ms > now_ms {
                continue;
            }
            due.push((timer.next_due_ms, Fired::Timer(*handle, timer.task.clone())));
            let missed = (now_ms - timer.next_due_ms) / timer.every_ms + 1;
            timer.next_due_ms += missed * timer.every_ms;
        }
        if let Some(frame) = self.frame.take_if(|f| f.due_ms <= now_ms) {
            self.last_frame_ms = Some(now_ms);
            due.push((frame.due_ms, Fired::Frame(frame.handle)));
        }
        due.sort_by_key(|(at, _)| *at);
        due.into_iter().map(|(_, fired)| fired).collect()
    }

    /// Drop the pending frame and every timer.
    pub fn cancel_all(&mut self) {
        self.frame = None;
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Task {
        Save,
        Ping,
    }

    #[test]
    fn vsync_frames_use_display_handles_and_cadence() {
        let mut s: Scheduler<Task> = Scheduler::new(FramePolicy::VSync { interval_ms: 16 });
        let h = s.request_frame(0);
        assert!(matches!(h, FrameHandle::Display(_)));
        assert_eq!(s.poll(0), vec![Fired::Frame(h)]);
        let h2 = s.request_frame(1);
        assert_ne!(h, h2);
        assert!(s.poll(10).is_empty());
        assert_eq!(s.poll(16), vec![Fired::Frame(h2)]);
    }

    #[test]
    fn unlimited_frames_are_immediate() {
        let mut s: Scheduler<Task> = Scheduler::new(FramePolicy::Unlimited);
        let h = s.request_frame(5);
        assert!(matches!(h, FrameHandle::Immediate(_)));
        assert_eq!(s.poll(5), vec![Fired::Frame(h)]);
    }

    #[test]
    fn request_frame_is_idempotent_while_pending() {
        let mut s: Scheduler<Task> = Scheduler::new(FramePolicy::Unlimited);
        assert_eq!(s.request_frame(0), s.request_frame(3));
    }

    #[test]
    fn cancel_requires_matching_handle_kind() {
        let mut s: Scheduler<Task> = Scheduler::new(FramePolicy::VSync { interval_ms: 16 });
        let FrameHandle::Display(id) = s.request_frame(0) else {
            panic!("vsync should hand out display handles");
        };
        assert!(!s.cancel_frame(FrameHandle::Immediate(id)));
        assert!(s.pending_frame().is_some());
        assert!(s.cancel_frame(FrameHandle::Display(id)));
        assert!(s.poll(100).is_empty());
    }

    #[test]
    fn policy_switch_reissues_pending_frame() {
        let mut s: Scheduler<Task> = Scheduler::new(FramePolicy::VSync { interval_ms: 16 });
        let old = s.request_frame(0);
        let new = s.set_policy(FramePolicy::Unlimited, 0).unwrap();
        assert!(matches!(new, FrameHandle::Immediate(_)));
        assert!(!s.cancel_frame(old));
        assert_eq!(s.poll(0), vec![Fired::Frame(new)]);
        assert_eq!(s.set_policy(FramePolicy::default(), 0), None);
    }

    #[test]
    fn intervals_repeat_and_skip_missed_periods() {
        let mut s = Scheduler::new(FramePolicy::Unlimited);
        let save = s.set_interval(Task::Save, 5000, 0);
        assert!(s.poll(4999).is_empty());
        assert_eq!(s.poll(5000), vec![Fired::Timer(save, Task::Save)]);
        // Asleep for three periods: one catch-up fire.
        assert_eq!(s.poll(21_000), vec![Fired::Timer(save, Task::Save)]);
        assert_eq!(s.next_deadline(), Some(25_000));
    }

    #[test]
    fn poll_orders_by_due_time() {
        let mut s = Scheduler::new(FramePolicy::VSync { interval_ms: 16 });
        let ping = s.set_interval(Task::Ping, 10, 0);
        let save = s.set_interval(Task::Save, 5, 0);
        let frame = s.request_frame(0);
        let fired = s.poll(10);
        assert_eq!(
            fired,
            vec![
                Fired::Frame(frame),
                Fired::Timer(save, Task::Save),
                Fired::Timer(ping, Task::Ping),
            ]
        );
    }

    #[test]
    fn cleared_timers_stop_firing() {
        let mut s = Scheduler::new(FramePolicy::Unlimited);
        let h = s.set_interval(Task::Ping, 10, 0);
        assert!(s.clear_interval(h));
        assert!(!s.clear_interval(h));
        assert!(s.poll(100).is_empty());
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn cancel_all_clears_everything() {
        let mut s = Scheduler::new(FramePolicy::Unlimited);
        s.set_interval(Task::Ping, 10, 0);
        s.request_frame(0);
        s.cancel_all();
        assert_eq!(s.timer_count(), 0);
        assert!(s.poll(1000).is_empty());
    }
}
