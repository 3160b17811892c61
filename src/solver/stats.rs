use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Live counters owned by the search engine.
///
/// Every field is an atomic so a signal handler (or a poll on another thread) can take a
/// snapshot at any instruction boundary without seeing a torn value. The engine is the only
/// writer; `Relaxed` is enough since no counter guards other memory.
#[derive(Debug, Default)]
pub struct SolverCounters {
    /// Record total (i.e. monotonically increasing) number of:
    /// - decisions: number of decisions made.
    /// - propagations: number of propagations made.
    /// - conflicts: number of conflicts that occur.
    /// - restarts: number of restarts.
    pub decisions: AtomicU64,
    pub propagations: AtomicU64,
    pub conflicts: AtomicU64,
    pub restarts: AtomicU64,

    /// Record current values of:
    /// - max_lemmas: bound on retained learnt clauses.
    /// - mem_used: approximate bytes held by the clause database.
    pub max_lemmas: AtomicU64,
    pub mem_used: AtomicU64,

    /// Time spent picking branching literals.
    pub heuristic: HeuristicTiming,
}

impl SolverCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set(counter: &AtomicU64, v: u64) {
        counter.store(v, Ordering::Relaxed);
    }
}

/// Plain, read-only view of the counters at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatisticsSnapshot {
    pub mem_used: u64,
    pub conflicts: u64,
    pub max_lemmas: u64,
    pub restarts: u64,
    pub decisions: u64,
    pub propagations: u64,
    /// None when the heuristic was never timed.
    pub heuristic: Option<TimingSummary>,
}

/// Read-only access to the engine statistics; the cancellation core only ever reads through this.
pub trait StatisticsSource: Send + Sync {
    fn snapshot(&self) -> StatisticsSnapshot;
}

impl StatisticsSource for SolverCounters {
    fn snapshot(&self) -> StatisticsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatisticsSnapshot {
            mem_used: load(&self.mem_used),
            conflicts: load(&self.conflicts),
            max_lemmas: load(&self.max_lemmas),
            restarts: load(&self.restarts),
            decisions: load(&self.decisions),
            propagations: load(&self.propagations),
            heuristic: self.heuristic.summary(),
        }
    }
}

/// Max/min/total of a repeated timed operation, kept in nanoseconds.
#[derive(Debug)]
pub struct HeuristicTiming {
    max_ns: AtomicU64,
    min_ns: AtomicU64,
    tot_ns: AtomicU64,
    count: AtomicU64,
}

impl Default for HeuristicTiming {
    fn default() -> Self {
        Self {
            max_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            tot_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }
}

impl HeuristicTiming {
    pub fn record(&self, d: Duration) {
        let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.max_ns.fetch_max(ns, Ordering::Relaxed);
        self.min_ns.fetch_min(ns, Ordering::Relaxed);
        self.tot_ns.fetch_add(ns, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> Option<TimingSummary> {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return None;
        }
        let tot = Duration::from_nanos(self.tot_ns.load(Ordering::Relaxed));
        Some(TimingSummary {
            max: Duration::from_nanos(self.max_ns.load(Ordering::Relaxed)),
            min: Duration::from_nanos(self.min_ns.load(Ordering::Relaxed)),
            avg: tot / count.min(u32::MAX as u64) as u32,
            tot,
            count,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingSummary {
    pub max: Duration,
    pub min: Duration,
    pub avg: Duration,
    pub tot: Duration,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_current_counters() {
        let c = SolverCounters::default();
        SolverCounters::bump(&c.conflicts);
        SolverCounters::bump(&c.conflicts);
        SolverCounters::bump(&c.restarts);
        SolverCounters::set(&c.max_lemmas, 64);
        SolverCounters::add(&c.mem_used, 4096);

        let s = c.snapshot();
        assert_eq!(s.conflicts, 2);
        assert_eq!(s.restarts, 1);
        assert_eq!(s.max_lemmas, 64);
        assert_eq!(s.mem_used, 4096);
        assert_eq!(s.heuristic, None);
    }

    #[test]
    fn heuristic_timing_summary() {
        let t = HeuristicTiming::default();
        t.record(Duration::from_micros(10));
        t.record(Duration::from_micros(30));

        let s = t.summary().unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.max, Duration::from_micros(30));
        assert_eq!(s.min, Duration::from_micros(10));
        assert_eq!(s.tot, Duration::from_micros(40));
        assert_eq!(s.avg, Duration::from_micros(20));
    }
}
