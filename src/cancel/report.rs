use std::io::{self, Write};

use crate::solver::stats::{StatisticsSnapshot, TimingSummary};

use super::clock::as_millis_f64;

/// Renders the full statistics report for one workload.
///
/// Implementations do all formatting and flushing, and return once the output is written.
/// Callers treat an `Err` as final; nothing is retried.
pub trait StatisticsReporter: Send + Sync {
    fn report(
        &self,
        out: &mut dyn Write,
        workload: &str,
        stats: &StatisticsSnapshot,
        solve_ms: Option<f64>,
    ) -> io::Result<()>;
}

/// Summary line written ahead of the full report.
pub fn summary_line(workload: &str, stats: &StatisticsSnapshot) -> String {
    format!(
        "c statistics of {}: mem: {} conflicts: {} max_lemmas: {} restarts: {}",
        workload, stats.mem_used, stats.conflicts, stats.max_lemmas, stats.restarts
    )
}

/// Default reporter: DIMACS-comment style `c key: value` lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextReporter;

impl StatisticsReporter for TextReporter {
    fn report(
        &self,
        out: &mut dyn Write,
        workload: &str,
        stats: &StatisticsSnapshot,
        solve_ms: Option<f64>,
    ) -> io::Result<()> {
        writeln!(out, "c ---- statistics: {} ----", workload)?;
        match solve_ms {
            Some(ms) => writeln!(out, "c solve time (ms):   {:.3}", ms)?,
            None => writeln!(out, "c solve time (ms):   -")?,
        }
        writeln!(out, "c conflicts:         {}", stats.conflicts)?;
        writeln!(out, "c restarts:          {}", stats.restarts)?;
        writeln!(out, "c decisions:         {}", stats.decisions)?;
        writeln!(out, "c propagations:      {}", stats.propagations)?;
        writeln!(out, "c max lemmas:        {}", stats.max_lemmas)?;
        writeln!(out, "c memory (bytes):    {}", stats.mem_used)?;
        if let Some(h) = &stats.heuristic {
            write_timing(out, "heuristic", h)?;
        }
        out.flush()
    }
}

fn write_timing(out: &mut dyn Write, name: &str, t: &TimingSummary) -> io::Result<()> {
    writeln!(
        out,
        "c {} time (ms):    max {:.3} min {:.3} avg {:.3} tot {:.3} over {} calls",
        name,
        as_millis_f64(t.max),
        as_millis_f64(t.min),
        as_millis_f64(t.avg),
        as_millis_f64(t.tot),
        t.count
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn stats() -> StatisticsSnapshot {
        StatisticsSnapshot {
            mem_used: 2048,
            conflicts: 17,
            max_lemmas: 100,
            restarts: 3,
            decisions: 40,
            propagations: 250,
            heuristic: None,
        }
    }

    #[test]
    fn summary_line_format() {
        assert_eq!(
            summary_line("uf20-01.cnf", &stats()),
            "c statistics of uf20-01.cnf: mem: 2048 conflicts: 17 max_lemmas: 100 restarts: 3"
        );
    }

    #[test]
    fn text_report_lists_counters() {
        let mut s = stats();
        s.heuristic = Some(TimingSummary {
            max: Duration::from_millis(2),
            min: Duration::from_millis(1),
            avg: Duration::from_micros(1500),
            tot: Duration::from_millis(3),
            count: 2,
        });
        let mut buf = Vec::new();
        TextReporter
            .report(&mut buf, "uf20-01.cnf", &s, Some(12.5))
            .unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("statistics: uf20-01.cnf"));
        assert!(text.contains("solve time (ms):   12.500"));
        assert!(text.contains("conflicts:         17"));
        assert!(text.contains("restarts:          3"));
        assert!(text.contains("max lemmas:        100"));
        assert!(text.contains("memory (bytes):    2048"));
        assert!(text.contains("max 2.000 min 1.000 avg 1.500 tot 3.000 over 2 calls"));
    }
}
