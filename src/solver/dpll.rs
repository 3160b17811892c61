use std::{collections::VecDeque, mem, sync::Arc, time::Instant};

use log::debug;

use crate::{
    cancel::context::{CancellationContext, Poll},
    dimacs::sat_instance::SATInstance,
};

use super::{
    config::SolverConfig,
    stats::SolverCounters,
    types::{DecisionLevel, LBool, Lit, SolveStatus, Var},
};

/// Entry on the decision stack.
#[derive(Clone, Copy, Debug)]
struct Decision {
    lit: Lit,
    /// Set once the opposite branch is being explored; a flipped decision is never flipped back.
    flipped: bool,
}

enum ClauseState {
    Satisfied,
    Unresolved,
    Unit(Lit),
    Conflict,
}

/// DPLL search with decision lemmas and geometric restarts.
///
/// One call to `step` is one unit of work: propagate, then either resolve a conflict or make a
/// decision. `solve` polls the cancellation context after every unit.
pub struct DPLLSolver {
    conf: SolverConfig,
    /// Problem information: constraint clauses, learnt clauses (oldest first).
    clauses: Vec<Vec<Lit>>,
    lemmas: VecDeque<Vec<Lit>>,

    /// Var -> assignment (if exists)
    assigned: Vec<LBool>,
    /// Assignment trail, and the trail length when each decision level was opened.
    trail: Vec<Lit>,
    dl_delim_idxs: Vec<usize>,
    decisions: Vec<Decision>,
    /// Branching order; rotated by one on every restart.
    order: Vec<Var>,

    conflicts_until_restart: u64,
    restart_budget: f64,

    /// Stats, shared with the cancellation context.
    stats: Arc<SolverCounters>,
}

impl DPLLSolver {
    pub fn new(conf: SolverConfig, instance: &SATInstance, stats: Arc<SolverCounters>) -> Self {
        let clauses = instance
            .clauses
            .iter()
            .map(|c| c.lits.iter().map(|l| Lit::from_dimacs(*l)).collect())
            .collect();
        let n_vars = instance.n_vars;

        SolverCounters::set(&stats.max_lemmas, conf.max_lemmas as u64);
        SolverCounters::set(&stats.mem_used, instance.lit_bytes() as u64);

        Self {
            conflicts_until_restart: conf.restart_base,
            restart_budget: conf.restart_base as f64,
            conf,
            clauses,
            lemmas: VecDeque::new(),
            assigned: vec![LBool::Undef; n_vars],
            trail: Vec::with_capacity(n_vars),
            dl_delim_idxs: vec![],
            decisions: vec![],
            order: (0..n_vars).collect(),
            stats,
        }
    }

    /// Runs until the instance is decided or the context reports a cancellation.
    pub fn solve(&mut self, ctx: &CancellationContext) -> SolveStatus {
        loop {
            if let Some(status) = self.step() {
                return status;
            }
            if let Poll::Stop(cause) = ctx.poll() {
                debug!("Search stopped: {}", cause);
                return SolveStatus::Cancelled(cause);
            }
        }
    }

    /// Performs one unit of work; returns the final status once known.
    pub fn step(&mut self) -> Option<SolveStatus> {
        if self.propagate() {
            SolverCounters::bump(&self.stats.conflicts);
            return self.resolve_conflict();
        }

        let started = Instant::now();
        let next = self.decide();
        self.stats.heuristic.record(started.elapsed());
        match next {
            // If no next one found, we've found a satisfying assignment
            None => Some(SolveStatus::SAT),
            Some(lit) => {
                SolverCounters::bump(&self.stats.decisions);
                debug!("Deciding lit: {}", lit);
                self.push_decision(Decision {
                    lit,
                    flipped: false,
                });
                None
            }
        }
    }

    /// Current assignment in DIMACS form; unassigned variables are reported negative.
    pub fn assignments(&self) -> Vec<Lit> {
        self.assigned
            .iter()
            .enumerate()
            .map(|(v, a)| Lit::new(v, !bool::from(*a)))
            .collect()
    }

    fn decision_level(&self) -> DecisionLevel {
        self.decisions.len()
    }

    fn value(&self, l: Lit) -> LBool {
        self.assigned[l.var()].under_sign(l.sign())
    }

    fn assign(&mut self, l: Lit) {
        self.assigned[l.var()] = if l.sign() { LBool::False } else { LBool::True };
        self.trail.push(l);
    }

    fn clause(&self, i: usize) -> &[Lit] {
        if i < self.clauses.len() {
            &self.clauses[i]
        } else {
            &self.lemmas[i - self.clauses.len()]
        }
    }

    fn clause_state(&self, lits: &[Lit]) -> ClauseState {
        let mut unit = None;
        for &l in lits {
            match self.value(l) {
                LBool::True => return ClauseState::Satisfied,
                LBool::Undef if unit.is_some() => return ClauseState::Unresolved,
                LBool::Undef => unit = Some(l),
                LBool::False => (),
            }
        }
        match unit {
            Some(l) => ClauseState::Unit(l),
            None => ClauseState::Conflict,
        }
    }

    // Unit propagation to a fixpoint; returns true on conflict.
    fn propagate(&mut self) -> bool {
        let mut n_props = 0;
        let conflict = 'fixpoint: loop {
            let mut changed = false;
            for i in 0..self.clauses.len() + self.lemmas.len() {
                match self.clause_state(self.clause(i)) {
                    ClauseState::Satisfied | ClauseState::Unresolved => (),
                    ClauseState::Unit(l) => {
                        self.assign(l);
                        n_props += 1;
                        changed = true;
                    }
                    ClauseState::Conflict => break 'fixpoint true,
                }
            }
            if !changed {
                break false;
            }
        };
        SolverCounters::add(&self.stats.propagations, n_props);
        conflict
    }

    fn decide(&self) -> Option<Lit> {
        self.order
            .iter()
            .find(|v| self.assigned[**v] == LBool::Undef)
            .map(|v| Lit::new(*v, true))
    }

    fn push_decision(&mut self, d: Decision) {
        self.dl_delim_idxs.push(self.trail.len());
        self.decisions.push(d);
        self.assign(d.lit);
    }

    fn backtrack(&mut self, lvl: DecisionLevel) {
        if lvl >= self.decision_level() {
            return;
        }
        let keep = self.dl_delim_idxs[lvl];
        for l in self.trail.drain(keep..) {
            self.assigned[l.var()] = LBool::Undef;
        }
        self.dl_delim_idxs.truncate(lvl);
        self.decisions.truncate(lvl);
    }

    fn resolve_conflict(&mut self) -> Option<SolveStatus> {
        // If conflict occurred at DL 0, oopsies unsat
        if self.decision_level() == 0 {
            return Some(SolveStatus::UNSAT);
        }
        self.learn();

        if self.restart_due() {
            self.restart();
            return None;
        }

        // Flip the deepest decision whose other branch is still open
        let Some(lvl) = self.decisions.iter().rposition(|d| !d.flipped) else {
            return Some(SolveStatus::UNSAT);
        };
        let lit = !self.decisions[lvl].lit;
        self.backtrack(lvl);
        self.push_decision(Decision { lit, flipped: true });
        None
    }

    // The current decisions imply the conflict, so their negation is a valid clause.
    fn learn(&mut self) {
        if self.conf.max_lemmas == 0 {
            return;
        }
        let lemma = self.decisions.iter().map(|d| !d.lit).collect::<Vec<_>>();
        let mut bytes = (lemma.len() * mem::size_of::<Lit>()) as i64;
        self.lemmas.push_back(lemma);
        while self.lemmas.len() > self.conf.max_lemmas {
            if let Some(old) = self.lemmas.pop_front() {
                bytes -= (old.len() * mem::size_of::<Lit>()) as i64;
            }
        }
        if bytes >= 0 {
            SolverCounters::add(&self.stats.mem_used, bytes as u64);
        } else {
            self.stats
                .mem_used
                .fetch_sub(bytes.unsigned_abs(), std::sync::atomic::Ordering::Relaxed);
        }
    }

    fn restart_due(&mut self) -> bool {
        if self.conf.restart_base == 0 {
            return false;
        }
        self.conflicts_until_restart = self.conflicts_until_restart.saturating_sub(1);
        self.conflicts_until_restart == 0
    }

    fn restart(&mut self) {
        SolverCounters::bump(&self.stats.restarts);
        self.restart_budget *= self.conf.restart_factor.max(1.);
        self.conflicts_until_restart = self.restart_budget.ceil() as u64;
        debug!(
            "Restarting; next restart after {} conflicts",
            self.conflicts_until_restart
        );
        self.backtrack(0);
        if !self.order.is_empty() {
            self.order.rotate_left(1);
        }
    }
}
