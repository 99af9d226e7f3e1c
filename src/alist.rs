//! Reader for parity-check matrices in the alist format.
//!
//! The format is line oriented: `n m`, then the maximum column and row
//! degrees, then the n column degrees, the m row degrees, n lines of 1-based
//! check indices (one per variable) and m lines of 1-based variable indices
//! (one per check). Zero entries used for padding are ignored.

use crate::code::{CodeError, ParityCheckCode};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("line {line}: expected {expected} entries, found {found}")]
    WrongDegree { line: usize, expected: usize, found: usize },
    #[error("line {line}: index {index} out of range")]
    IndexOutOfRange { line: usize, index: usize },
    #[error("adjacency blocks disagree on edge ({variable}, {check})")]
    InconsistentAdjacency { variable: usize, check: usize },
    #[error("{0}")]
    Code(#[from] CodeError),
}

/// Reads a parity-check code from an alist file.
pub fn read_alist(path: impl AsRef<Path>) -> Result<ParityCheckCode, AlistError> {
    parse_alist(&fs::read_to_string(path)?)
}

/// Parses alist text into a parity-check code.
pub fn parse_alist(text: &str) -> Result<ParityCheckCode, AlistError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines.next().ok_or(AlistError::UnexpectedEnd)?;
    let dims = parse_ints(header)?;
    if dims.len() != 2 {
        return Err(AlistError::WrongDegree { line: 1, expected: 2, found: dims.len() });
    }
    let (n, m) = (dims[0], dims[1]);

    // Maximum degrees: present in the format but implied by the degree lists.
    let _ = lines.next().ok_or(AlistError::UnexpectedEnd)?;

    let var_degrees = expect_row(lines.next(), n)?;
    let check_degrees = expect_row(lines.next(), m)?;

    let mut edges = Vec::new();
    for (v, expected) in var_degrees.iter().copied().enumerate() {
        let (lineno, line) = lines.next().ok_or(AlistError::UnexpectedEnd)?;
        let entries = nonzero_entries(line)?;
        if entries.len() != expected {
            return Err(AlistError::WrongDegree {
                line: lineno + 1,
                expected,
                found: entries.len(),
            });
        }
        for c in entries {
            if c > m {
                return Err(AlistError::IndexOutOfRange { line: lineno + 1, index: c });
            }
            edges.push((v, c - 1));
        }
    }

    // The check-side block must mirror the variable-side edges exactly.
    let mut mirror = Vec::new();
    for (c, expected) in check_degrees.iter().copied().enumerate() {
        let (lineno, line) = lines.next().ok_or(AlistError::UnexpectedEnd)?;
        let entries = nonzero_entries(line)?;
        if entries.len() != expected {
            return Err(AlistError::WrongDegree {
                line: lineno + 1,
                expected,
                found: entries.len(),
            });
        }
        for v in entries {
            if v > n {
                return Err(AlistError::IndexOutOfRange { line: lineno + 1, index: v });
            }
            mirror.push((v - 1, c));
        }
    }

    let mut sorted_edges = edges.clone();
    sorted_edges.sort_unstable();
    mirror.sort_unstable();
    if sorted_edges != mirror {
        let (variable, check) = sorted_edges
            .iter()
            .zip(mirror.iter())
            .find(|(a, b)| a != b)
            .map(|(&a, _)| a)
            .unwrap_or_else(|| *sorted_edges.last().unwrap_or(&(0, 0)));
        return Err(AlistError::InconsistentAdjacency { variable, check });
    }

    Ok(ParityCheckCode::from_edges(n, m, &edges)?)
}

fn parse_ints(line: &str) -> Result<Vec<usize>, AlistError> {
    line.split_whitespace()
        .map(|tok| tok.parse().map_err(|_| AlistError::InvalidInteger(tok.to_string())))
        .collect()
}

fn expect_row(
    item: Option<(usize, &str)>,
    expected: usize,
) -> Result<Vec<usize>, AlistError> {
    let (lineno, line) = item.ok_or(AlistError::UnexpectedEnd)?;
    let values = parse_ints(line)?;
    if values.len() != expected {
        return Err(AlistError::WrongDegree {
            line: lineno + 1,
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

fn nonzero_entries(line: &str) -> Result<Vec<usize>, AlistError> {
    let values = parse_ints(line)?;
    Ok(values.into_iter().filter(|&x| x != 0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    // H = [[1,1,1,0],[0,1,1,1]]
    const SMALL: &str = "\
4 2
2 3
1 2 2 1
3 3
1
1 2
1 2
2
1 2 3
2 3 4
";

    #[test]
    fn test_parse_small_code() {
        let code = parse_alist(SMALL).unwrap();
        assert_eq!(code.n(), 4);
        assert_eq!(code.m(), 2);
        assert_eq!(code.edge_count(), 6);
        assert_eq!(code.var_degree(0), 1);
        assert_eq!(code.var_degree(1), 2);
        assert_eq!(code.check_degree(0), 3);
        let checks: Vec<usize> = code.var_neighbors(1).iter().map(|e| e.node).collect();
        assert_eq!(checks, vec![0, 1]);
    }

    #[test]
    fn test_zero_padding_is_ignored() {
        let padded = "\
4 2
2 3
1 2 2 1
3 3
1 0
1 2
1 2
2 0
1 2 3
2 3 4
";
        let code = parse_alist(padded).unwrap();
        assert_eq!(code.edge_count(), 6);
    }

    #[test]
    fn test_inconsistent_blocks_rejected() {
        let broken = "\
4 2
2 3
1 2 2 1
3 3
1
1 2
1 2
2
1 2 4
2 3 4
";
        assert!(matches!(
            parse_alist(broken),
            Err(AlistError::InconsistentAdjacency { .. })
        ));
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(parse_alist("4 2\n2 3\n"), Err(AlistError::UnexpectedEnd)));
    }

    #[test]
    fn test_bad_token() {
        assert!(matches!(
            parse_alist("4 x\n"),
            Err(AlistError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_degree_mismatch() {
        let broken = "\
4 2
2 3
1 2 2 1
3 3
1 2
1 2
1 2
2
1 2 3
2 3 4
";
        assert!(matches!(parse_alist(broken), Err(AlistError::WrongDegree { .. })));
    }
}
