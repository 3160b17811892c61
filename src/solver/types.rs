use std::fmt::Display;
use std::ops::{BitAnd, BitXor, Not, Shr};

use crate::cancel::config::CancelCause;

pub type DecisionLevel = usize;

/// Solver-internal variable index; DIMACS variable `v` maps to `v - 1`.
pub type Var = usize;

/// Representation of a Literal, using the MiniSat convention: lit.v = 2 * var + sign
#[derive(Hash, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lit {
    pub v: usize,
}

impl Lit {
    // Here, a TRUE sign == NEGATIVE
    pub fn new(v: Var, sign: bool) -> Lit {
        Lit {
            v: v + v + (sign as usize),
        }
    }

    pub fn from_dimacs(l: i64) -> Lit {
        Lit::new((l.unsigned_abs() - 1) as Var, l < 0)
    }

    pub fn to_dimacs(self) -> i64 {
        let v = self.var() as i64 + 1;
        if self.sign() {
            -v
        } else {
            v
        }
    }

    // Returns true if sign is negative.
    pub fn sign(&self) -> bool {
        self.v.bitand(1) != 0
    }

    pub fn var(&self) -> Var {
        self.v.shr(1)
    }
}

impl Not for Lit {
    type Output = Self;
    fn not(self) -> Lit {
        Self {
            v: self.v.bitxor(1),
        }
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

// Represent false, true, or UNDEF (i.e. not yet assigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LBool {
    True = 0,
    False = 1,
    #[default]
    Undef = 2,
}

impl LBool {
    // Value of a literal with sign `s` whose variable holds `self`.
    pub fn under_sign(self, s: bool) -> LBool {
        match self {
            LBool::Undef => LBool::Undef,
            v => LBool::from((v as u8).bitxor(s as u8)),
        }
    }
}

impl From<LBool> for bool {
    #[inline(always)]
    fn from(value: LBool) -> Self {
        matches!(value, LBool::True)
    }
}

impl From<u8> for LBool {
    #[inline(always)]
    fn from(value: u8) -> Self {
        match value {
            0 => Self::True,
            1 => Self::False,
            _ => Self::Undef,
        }
    }
}

// Status markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    SAT,
    UNSAT,
    Cancelled(CancelCause),
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::SAT => write!(f, "SATISFIABLE"),
            SolveStatus::UNSAT => write!(f, "UNSATISFIABLE"),
            SolveStatus::Cancelled(_) => write!(f, "UNKNOWN"),
        }
    }
}
