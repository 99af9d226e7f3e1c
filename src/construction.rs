//! Random construction of sparse parity-check codes.
//!
//! Columns (variable nodes) receive degrees drawn from a
//! [`DegreeDistribution`]; the ones are then placed either independently per
//! column or balanced across rows, rows of degree below two are repaired, and
//! length-four cycles can optionally be broken. Construction is deterministic
//! for a fixed seed.

use crate::code::{CodeError, ParityCheckCode};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("invalid degree distribution {0:?}")]
    InvalidDistribution(String),
    #[error("column degree {0} exceeds the number of checks {1}")]
    DegreeTooLarge(usize, usize),
    #[error("{0}")]
    Code(#[from] CodeError),
}

/// Column-degree distribution, e.g. `"3"` (all columns degree 3) or
/// `"0.5x3/0.5x6"` (half degree 3, half degree 6). Fractions are normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct DegreeDistribution {
    entries: Vec<(f64, usize)>,
}

impl DegreeDistribution {
    /// All columns share one degree.
    pub fn uniform(degree: usize) -> Self {
        Self { entries: vec![(1.0, degree)] }
    }

    pub fn max_degree(&self) -> usize {
        self.entries.iter().map(|&(_, d)| d).max().unwrap_or(0)
    }

    /// Splits `columns` among the entries by largest remainders, so the
    /// realized fractions are as close to the requested ones as possible.
    fn partition(&self, columns: usize) -> Vec<usize> {
        let mut part: Vec<usize> = Vec::with_capacity(self.entries.len());
        let mut remainder: Vec<f64> = Vec::with_capacity(self.entries.len());
        let mut used = 0;
        for &(frac, _) in &self.entries {
            let exact = frac * columns as f64;
            let whole = exact.floor() as usize;
            part.push(whole);
            remainder.push(exact - whole as f64);
            used += whole;
        }
        while used < columns {
            let mut best = 0;
            for i in 1..remainder.len() {
                if remainder[i] > remainder[best] {
                    best = i;
                }
            }
            part[best] += 1;
            remainder[best] = -1.0;
            used += 1;
        }
        part
    }

    /// The degree of each column in construction order.
    fn column_degrees(&self, columns: usize) -> Vec<usize> {
        let part = self.partition(columns);
        let mut degrees = Vec::with_capacity(columns);
        for (count, &(_, degree)) in part.iter().zip(self.entries.iter()) {
            degrees.extend(std::iter::repeat(degree).take(*count));
        }
        degrees
    }
}

impl FromStr for DegreeDistribution {
    type Err = ConstructionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConstructionError::InvalidDistribution(s.to_string());

        if let Ok(degree) = s.trim().parse::<usize>() {
            if degree == 0 {
                return Err(invalid());
            }
            return Ok(Self::uniform(degree));
        }

        let mut entries = Vec::new();
        let mut total = 0.0;
        for part in s.split('/') {
            let (frac, degree) = part.split_once('x').ok_or_else(invalid)?;
            let frac: f64 = frac.trim().parse().map_err(|_| invalid())?;
            let degree: usize = degree.trim().parse().map_err(|_| invalid())?;
            if !(frac > 0.0) || degree == 0 {
                return Err(invalid());
            }
            entries.push((frac, degree));
            total += frac;
        }
        if entries.is_empty() {
            return Err(invalid());
        }
        for entry in &mut entries {
            entry.0 /= total;
        }
        Ok(Self { entries })
    }
}

/// How column entries are placed into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMethod {
    /// Each column draws its rows uniformly at random.
    EvenColumn,
    /// Rows are additionally kept as evenly loaded as possible.
    EvenBoth,
}

/// Builder for a random parity-check code.
#[derive(Debug, Clone)]
pub struct CodeBuilder {
    checks: usize,
    bits: usize,
    distribution: DegreeDistribution,
    method: PlacementMethod,
    seed: u64,
    break_four_cycles: bool,
}

impl CodeBuilder {
    pub fn new(checks: usize, bits: usize, distribution: DegreeDistribution) -> Self {
        Self {
            checks,
            bits,
            distribution,
            method: PlacementMethod::EvenBoth,
            seed: 0,
            break_four_cycles: false,
        }
    }

    pub fn method(mut self, method: PlacementMethod) -> Self {
        self.method = method;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn break_four_cycles(mut self, enable: bool) -> Self {
        self.break_four_cycles = enable;
        self
    }

    pub fn build(&self) -> Result<ParityCheckCode, ConstructionError> {
        if self.checks == 0 || self.bits == 0 {
            return Err(CodeError::InvalidDimensions.into());
        }
        let max_degree = self.distribution.max_degree();
        if max_degree > self.checks {
            return Err(ConstructionError::DegreeTooLarge(max_degree, self.checks));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let degrees = self.distribution.column_degrees(self.bits);

        let mut cols: Vec<Vec<usize>> = vec![Vec::new(); self.bits];
        match self.method {
            PlacementMethod::EvenColumn => self.place_even_column(&mut cols, &degrees, &mut rng),
            PlacementMethod::EvenBoth => self.place_even_both(&mut cols, &degrees, &mut rng),
        }

        let mut rows = transpose(&cols, self.checks);
        self.repair_row_degrees(&mut cols, &mut rows, &mut rng);
        if self.break_four_cycles {
            self.remove_four_cycles(&mut cols, &mut rows, &mut rng);
        }

        let edges: Vec<(usize, usize)> = cols
            .iter()
            .enumerate()
            .flat_map(|(v, checks)| checks.iter().map(move |&c| (v, c)))
            .collect();
        Ok(ParityCheckCode::from_edges(self.bits, self.checks, &edges)?)
    }

    fn place_even_column(
        &self,
        cols: &mut [Vec<usize>],
        degrees: &[usize],
        rng: &mut ChaCha8Rng,
    ) {
        for (col, &degree) in cols.iter_mut().zip(degrees.iter()) {
            for _ in 0..degree {
                loop {
                    let row = rng.gen_range(0..self.checks);
                    if !col.contains(&row) {
                        col.push(row);
                        break;
                    }
                }
            }
        }
    }

    fn place_even_both(&self, cols: &mut [Vec<usize>], degrees: &[usize], rng: &mut ChaCha8Rng) {
        let total: usize = degrees.iter().sum();
        // Pool of row slots cycling through all rows, consumed front to back
        let mut slots: Vec<usize> = (0..total).map(|k| k % self.checks).collect();
        let mut consumed = 0;
        let mut fallback = 0usize;

        for (col, &degree) in cols.iter_mut().zip(degrees.iter()) {
            for _ in 0..degree {
                // Any unconsumed slot left that does not collide with this column?
                let usable = (consumed..total).any(|i| !col.contains(&slots[i]));
                if !usable {
                    fallback += 1;
                    loop {
                        let row = rng.gen_range(0..self.checks);
                        if !col.contains(&row) {
                            col.push(row);
                            break;
                        }
                    }
                    continue;
                }
                loop {
                    let pick = consumed + rng.gen_range(0..total - consumed);
                    if !col.contains(&slots[pick]) {
                        col.push(slots[pick]);
                        slots.swap(pick, consumed);
                        consumed += 1;
                        break;
                    }
                }
            }
        }

        if fallback > 0 {
            debug!(fallback, "placed entries unevenly across rows");
        }
    }

    /// Rows with fewer than two entries get extra ones so that every check
    /// constrains at least two bits.
    fn repair_row_degrees(
        &self,
        cols: &mut [Vec<usize>],
        rows: &mut [Vec<usize>],
        rng: &mut ChaCha8Rng,
    ) {
        let mut added = 0;
        for row in 0..self.checks {
            if rows[row].is_empty() {
                let col = rng.gen_range(0..self.bits);
                cols[col].push(row);
                rows[row].push(col);
                added += 1;
            }
            if rows[row].len() == 1 && self.bits > 1 {
                let existing = rows[row][0];
                loop {
                    let col = rng.gen_range(0..self.bits);
                    if col != existing && !cols[col].contains(&row) {
                        cols[col].push(row);
                        rows[row].push(col);
                        added += 1;
                        break;
                    }
                }
            }
        }
        if added > 0 {
            debug!(added, "added entries to bring row degrees up to two");
        }
    }

    /// Breaks 4-cycles by relocating one offending entry per cycle found.
    /// A few passes normally suffice; construction gives up after ten.
    fn remove_four_cycles(
        &self,
        cols: &mut [Vec<usize>],
        rows: &mut [Vec<usize>],
        rng: &mut ChaCha8Rng,
    ) {
        let mut broken = 0;
        for _ in 0..10 {
            let mut found = 0;
            for col in 0..self.bits {
                if let Some((row1, _)) = find_four_cycle(cols, rows, col) {
                    // col -> row1 -> col2 -> row2 -> col closes a 4-cycle;
                    // move (row1, col) elsewhere
                    remove_entry(cols, rows, row1, col);
                    loop {
                        let row = rng.gen_range(0..self.checks);
                        if !cols[col].contains(&row) {
                            cols[col].push(row);
                            rows[row].push(col);
                            break;
                        }
                    }
                    broken += 1;
                    found += 1;
                }
            }
            if found == 0 {
                break;
            }
        }
        if broken > 0 {
            debug!(broken, "relocated entries to break length-four cycles");
        }
    }
}

fn transpose(cols: &[Vec<usize>], checks: usize) -> Vec<Vec<usize>> {
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); checks];
    for (col, col_rows) in cols.iter().enumerate() {
        for &row in col_rows {
            rows[row].push(col);
        }
    }
    rows
}

/// Finds one 4-cycle through `col`, returning the (row, other column) pair of
/// the entry to relocate.
fn find_four_cycle(
    cols: &[Vec<usize>],
    rows: &[Vec<usize>],
    col: usize,
) -> Option<(usize, usize)> {
    for &row1 in &cols[col] {
        for &col2 in &rows[row1] {
            if col2 == col {
                continue;
            }
            for &row2 in &cols[col2] {
                if row2 != row1 && cols[col].contains(&row2) {
                    return Some((row1, col2));
                }
            }
        }
    }
    None
}

fn remove_entry(cols: &mut [Vec<usize>], rows: &mut [Vec<usize>], row: usize, col: usize) {
    if let Some(pos) = cols[col].iter().position(|&r| r == row) {
        cols[col].remove(pos);
    }
    if let Some(pos) = rows[row].iter().position(|&c| c == col) {
        rows[row].remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_parsing() {
        let single: DegreeDistribution = "3".parse().unwrap();
        assert_eq!(single, DegreeDistribution::uniform(3));
        assert_eq!(single.max_degree(), 3);

        let mixed: DegreeDistribution = "0.5x3/0.5x6".parse().unwrap();
        assert_eq!(mixed.max_degree(), 6);
        let degrees = mixed.column_degrees(10);
        assert_eq!(degrees.iter().filter(|&&d| d == 3).count(), 5);
        assert_eq!(degrees.iter().filter(|&&d| d == 6).count(), 5);

        assert!("".parse::<DegreeDistribution>().is_err());
        assert!("0".parse::<DegreeDistribution>().is_err());
        assert!("0.5x3/abc".parse::<DegreeDistribution>().is_err());
        assert!("-1x3".parse::<DegreeDistribution>().is_err());
    }

    #[test]
    fn test_partition_covers_all_columns() {
        let dist: DegreeDistribution = "0.3x2/0.7x3".parse().unwrap();
        let part = dist.partition(100);
        assert_eq!(part.iter().sum::<usize>(), 100);
        assert!(part[0] >= 28 && part[0] <= 32);
    }

    #[test]
    fn test_build_regular_code() {
        let code = CodeBuilder::new(50, 100, DegreeDistribution::uniform(3))
            .method(PlacementMethod::EvenColumn)
            .seed(12345)
            .build()
            .unwrap();
        assert_eq!(code.n(), 100);
        assert_eq!(code.m(), 50);
        // Column degrees stay at 3 except where row repair added entries
        let mut total = 0;
        for v in 0..code.n() {
            assert!(code.var_degree(v) >= 3);
            total += code.var_degree(v);
        }
        assert!(total >= 300 && total < 320);
        for c in 0..code.m() {
            assert!(code.check_degree(c) >= 2);
        }
    }

    #[test]
    fn test_even_both_balances_rows() {
        let code = CodeBuilder::new(30, 60, DegreeDistribution::uniform(4))
            .seed(123)
            .build()
            .unwrap();
        let mut weights: Vec<usize> = (0..code.m()).map(|c| code.check_degree(c)).collect();
        weights.sort_unstable();
        assert!(weights[weights.len() - 1] - weights[0] <= 3);
    }

    #[test]
    fn test_construction_is_deterministic() {
        let build = || {
            CodeBuilder::new(25, 50, DegreeDistribution::uniform(3))
                .seed(7777)
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.edge_count(), b.edge_count());
        for v in 0..a.n() {
            assert_eq!(a.var_neighbors(v), b.var_neighbors(v));
        }
    }

    #[test]
    fn test_degree_larger_than_checks_rejected() {
        let err = CodeBuilder::new(5, 10, DegreeDistribution::uniform(6))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConstructionError::DegreeTooLarge(6, 5)));
    }

    #[test]
    fn test_four_cycle_breaking_builds() {
        let code = CodeBuilder::new(20, 40, DegreeDistribution::uniform(3))
            .seed(999)
            .break_four_cycles(true)
            .build()
            .unwrap();
        assert_eq!(code.n(), 40);
    }
}
