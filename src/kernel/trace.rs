//! Instrumentation and Tracing System
//!
//! Records what went through the syscall gate.
//!
//! Design:
//! - Lightweight event tracing with timestamps
//! - Per-syscall call and error counters
//! - Ring buffer for recent events (bounded memory)
//! - Disabled by default; counters and events are only kept while enabled

use super::process::Pid;
use super::syscall::{Errno, SyscallNr};
use std::collections::{BTreeMap, VecDeque};

/// Default number of events kept in the trace buffer
pub const DEFAULT_CAPACITY: usize = 1000;

/// A single traced syscall
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Timestamp in milliseconds (from kernel time)
    pub timestamp: f64,
    pub nr: SyscallNr,
    /// The process the call ran for
    pub pid: Pid,
    /// The error it failed with, if any
    pub errno: Option<Errno>,
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.0}] {} {}", self.timestamp, self.pid, self.nr)?;
        match self.errno {
            Some(e) => write!(f, " = -{} ({})", e.code(), e.name()),
            None => write!(f, " = ok"),
        }
    }
}

/// Counters for one syscall
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfCounters {
    /// Total call count, failed calls included
    pub calls: u64,
    /// Calls that returned an errno
    pub errors: u64,
}

impl PerfCounters {
    /// Success rate
    pub fn success_rate(&self) -> f64 {
        if self.calls == 0 {
            1.0
        } else {
            (self.calls - self.errors) as f64 / self.calls as f64
        }
    }
}

/// The syscall tracer
#[derive(Debug)]
pub struct Tracer {
    /// Whether tracing is enabled
    enabled: bool,
    /// Ring buffer of recent events
    events: VecDeque<TraceEvent>,
    capacity: usize,
    counters: BTreeMap<SyscallNr, PerfCounters>,
}

impl Tracer {
    /// Create a disabled tracer
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            enabled: false,
            events: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            counters: BTreeMap::new(),
        }
    }

    /// Enable tracing
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disable tracing
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Check if tracing is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record the outcome of one syscall
    pub fn record(&mut self, timestamp: f64, nr: SyscallNr, pid: Pid, errno: Option<Errno>) {
        if !self.enabled {
            return;
        }

        let counters = self.counters.entry(nr).or_default();
        counters.calls += 1;
        if errno.is_some() {
            counters.errors += 1;
        }

        if self.capacity == 0 {
            return;
        }
        // Maintain ring buffer size
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(TraceEvent {
            timestamp,
            nr,
            pid,
            errno,
        });
    }

    /// Get recent events, oldest first
    pub fn events(&self) -> &VecDeque<TraceEvent> {
        &self.events
    }

    /// Get events for a specific process
    pub fn events_by_pid(&self, pid: Pid) -> Vec<&TraceEvent> {
        self.events.iter().filter(|e| e.pid == pid).collect()
    }

    pub fn counters(&self, nr: SyscallNr) -> PerfCounters {
        self.counters.get(&nr).copied().unwrap_or_default()
    }

    /// Clear the event buffer
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Reset everything (events and counters)
    pub fn reset(&mut self) {
        self.clear_events();
        self.counters.clear();
    }

    /// Get a summary report
    pub fn summary(&self) -> TraceSummary {
        TraceSummary {
            enabled: self.enabled,
            event_count: self.events.len(),
            syscall_count: self.counters.values().map(|c| c.calls).sum(),
            syscall_errors: self.counters.values().map(|c| c.errors).sum(),
            per_syscall: self.counters.iter().map(|(nr, c)| (*nr, *c)).collect(),
        }
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of trace/stats data
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    pub enabled: bool,
    pub event_count: usize,
    pub syscall_count: u64,
    pub syscall_errors: u64,
    /// Counters of every syscall seen so far, in number order
    pub per_syscall: Vec<(SyscallNr, PerfCounters)>,
}

impl std::fmt::Display for TraceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Syscall Statistics ===")?;
        writeln!(f, "Tracing: {}", if self.enabled { "ON" } else { "OFF" })?;
        writeln!(f, "Events buffered: {}", self.event_count)?;
        writeln!(f, "Total: {}", self.syscall_count)?;
        writeln!(f, "Errors: {}", self.syscall_errors)?;
        for (nr, c) in &self.per_syscall {
            writeln!(f, "  {:<12} {:>6} calls {:>6} errors", nr.name(), c.calls, c.errors)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracer_disabled_by_default() {
        let mut tracer = Tracer::new();
        assert!(!tracer.is_enabled());

        tracer.record(1.0, SyscallNr::Open, Pid(0), None);
        assert!(tracer.events().is_empty());
        assert_eq!(tracer.counters(SyscallNr::Open), PerfCounters::default());
    }

    #[test]
    fn test_tracer_enable_disable() {
        let mut tracer = Tracer::new();
        tracer.enable();
        assert!(tracer.is_enabled());
        tracer.disable();
        assert!(!tracer.is_enabled());
    }

    #[test]
    fn test_tracer_counts_calls_and_errors() {
        let mut tracer = Tracer::new();
        tracer.enable();

        tracer.record(100.0, SyscallNr::Open, Pid(0), None);
        tracer.record(200.0, SyscallNr::Open, Pid(2), Some(Errno::NoSuchEntry));
        tracer.record(300.0, SyscallNr::Close, Pid(2), None);

        let open = tracer.counters(SyscallNr::Open);
        assert_eq!((open.calls, open.errors), (2, 1));
        assert_eq!(open.success_rate(), 0.5);
        assert_eq!(tracer.events_by_pid(Pid(2)).len(), 2);

        let summary = tracer.summary();
        assert_eq!(summary.syscall_count, 3);
        assert_eq!(summary.syscall_errors, 1);
        assert_eq!(summary.per_syscall[0].0, SyscallNr::Open);
    }

    #[test]
    fn test_ring_buffer_limit() {
        let mut tracer = Tracer::with_capacity(3);
        tracer.enable();
        for i in 0..5 {
            tracer.record(i as f64, SyscallNr::Getpid, Pid(0), None);
        }

        assert_eq!(tracer.events().len(), 3);
        assert_eq!(tracer.events().front().map(|e| e.timestamp), Some(2.0));
        // Counters are not bounded by the buffer
        assert_eq!(tracer.counters(SyscallNr::Getpid).calls, 5);
    }

    #[test]
    fn test_reset() {
        let mut tracer = Tracer::new();
        tracer.enable();
        tracer.record(1.0, SyscallNr::Read, Pid(0), Some(Errno::BadDescriptor));
        tracer.reset();
        assert!(tracer.events().is_empty());
        assert_eq!(tracer.summary().syscall_count, 0);
        assert!(tracer.is_enabled());
    }

    #[test]
    fn test_event_display() {
        let event = TraceEvent {
            timestamp: 42.0,
            nr: SyscallNr::Unlink,
            pid: Pid(2),
            errno: Some(Errno::IsADirectory),
        };
        assert_eq!(event.to_string(), "[42] pid:2 unlink(87) = -21 (EISDIR)");
    }
}
