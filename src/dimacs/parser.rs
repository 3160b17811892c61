use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use anyhow::{anyhow, bail, Context, Result};
use fxhash::FxHashSet;

use super::sat_instance::{Clause, Literal, SATInstance, Variable};

pub struct DimacsParser<R> {
    reader: BufReader<R>,
}

impl DimacsParser<File> {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<DimacsParser<File>> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Self::from_reader(file))
    }
}

#[cfg(test)]
impl DimacsParser<&[u8]> {
    pub fn parse_str(s: &str) -> Result<SATInstance> {
        DimacsParser::from_reader(s.as_bytes()).parse()
    }
}

impl<R: Read> DimacsParser<R> {
    pub fn from_reader(r: R) -> Self {
        Self {
            reader: BufReader::new(r),
        }
    }

    pub fn parse(self) -> Result<SATInstance> {
        let mut header = None;
        let mut clauses = vec![];
        let mut vars = FxHashSet::default();
        // Literals of a clause may span several lines; a clause ends at `0`.
        let mut lits: Vec<Literal> = vec![];

        for (n, line) in self.reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading line {}", n + 1))?;
            let line = line.trim();
            // Skip comments and blank lines
            if line.is_empty() || line.starts_with('c') {
                continue;
            }
            // Some benchmark files end with a `%` marker
            if line.starts_with('%') {
                break;
            }
            if line.starts_with('p') {
                if header.is_some() {
                    bail!("line {}: duplicate problem line", n + 1);
                }
                header = Some(parse_header(line).with_context(|| format!("line {}", n + 1))?);
                continue;
            }
            let Some((n_vars, _)) = header else {
                bail!("line {}: clause before problem line", n + 1);
            };
            for tok in line.split_whitespace() {
                let lit: Literal = tok
                    .parse()
                    .map_err(|_| anyhow!("line {}: bad literal {:?}", n + 1, tok))?;
                if lit == 0 {
                    clauses.push(Clause {
                        lits: std::mem::take(&mut lits),
                    });
                } else {
                    let var = lit.unsigned_abs();
                    if var > n_vars as u64 {
                        bail!(
                            "line {}: literal {} exceeds declared {} variables",
                            n + 1,
                            lit,
                            n_vars
                        );
                    }
                    vars.insert(var as Variable);
                    lits.push(lit);
                }
            }
        }

        let (n_vars, n_clauses) = header.ok_or_else(|| anyhow!("missing problem line"))?;
        // Tolerate a missing terminating 0 on the last clause
        if !lits.is_empty() {
            clauses.push(Clause { lits });
        }
        if vars.len() < n_vars {
            log::warn!(
                "Problem line declares {} variables, only {} occur",
                n_vars,
                vars.len()
            );
        }
        if clauses.len() != n_clauses {
            log::warn!(
                "Problem line declares {} clauses, found {}",
                n_clauses,
                clauses.len()
            );
        }

        Ok(SATInstance {
            n_vars,
            n_clauses: clauses.len(),
            clauses,
            vars,
        })
    }
}

// Parses `p cnf <vars> <clauses>`.
fn parse_header(line: &str) -> Result<(usize, usize)> {
    let fields = line.split_whitespace().collect::<Vec<_>>();
    match fields.as_slice() {
        ["p", "cnf", v, c] => Ok((
            v.parse().context("variable count")?,
            c.parse().context("clause count")?,
        )),
        _ => bail!("malformed problem line {:?}", line),
    }
}
