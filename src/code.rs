//! Sparse parity-check code representation.
//!
//! A [`ParityCheckCode`] holds the Tanner graph of an LDPC code as two
//! adjacency views: variable node -> incident checks and check node ->
//! incident variables. Every edge carries a stable id so that decoder
//! messages can live in flat arrays indexed by edge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodeError {
    #[error("code dimensions must be nonzero")]
    InvalidDimensions,
    #[error("edge ({0}, {1}) out of bounds")]
    EdgeOutOfBounds(usize, usize),
    #[error("duplicate edge ({0}, {1})")]
    DuplicateEdge(usize, usize),
}

/// One endpoint of a Tanner-graph edge: the neighbor node index and the flat
/// edge id shared by both adjacency views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRef {
    pub node: usize,
    pub edge: usize,
}

/// Immutable sparse H matrix, stored as consistent transposed adjacency lists.
#[derive(Debug, Clone)]
pub struct ParityCheckCode {
    n: usize,
    m: usize,
    edge_count: usize,
    var_adj: Vec<Vec<EdgeRef>>,
    check_adj: Vec<Vec<EdgeRef>>,
}

impl ParityCheckCode {
    /// Builds a code with `n` variable nodes and `m` check nodes from a list
    /// of `(variable, check)` edges.
    ///
    /// Edge ids are assigned in variable-major order, with each variable's
    /// checks sorted ascending. Out-of-range and duplicate edges are
    /// rejected.
    pub fn from_edges(n: usize, m: usize, edges: &[(usize, usize)]) -> Result<Self, CodeError> {
        if n == 0 || m == 0 {
            return Err(CodeError::InvalidDimensions);
        }

        let mut per_var: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(v, c) in edges {
            if v >= n || c >= m {
                return Err(CodeError::EdgeOutOfBounds(v, c));
            }
            per_var[v].push(c);
        }

        let mut var_adj: Vec<Vec<EdgeRef>> = vec![Vec::new(); n];
        let mut check_adj: Vec<Vec<EdgeRef>> = vec![Vec::new(); m];
        let mut edge_count = 0;
        for (v, checks) in per_var.iter_mut().enumerate() {
            checks.sort_unstable();
            for pair in checks.windows(2) {
                if pair[0] == pair[1] {
                    return Err(CodeError::DuplicateEdge(v, pair[0]));
                }
            }
            for &c in checks.iter() {
                var_adj[v].push(EdgeRef { node: c, edge: edge_count });
                check_adj[c].push(EdgeRef { node: v, edge: edge_count });
                edge_count += 1;
            }
        }

        Ok(Self { n, m, edge_count, var_adj, check_adj })
    }

    /// Code length (number of variable nodes).
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of parity checks.
    pub fn m(&self) -> usize {
        self.m
    }

    /// Information length, assuming full-rank H.
    pub fn k(&self) -> usize {
        self.n.saturating_sub(self.m)
    }

    /// Code rate (n - m) / n. Negative when H has more checks than columns.
    pub fn rate(&self) -> f64 {
        (self.n as f64 - self.m as f64) / self.n as f64
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Checks incident to variable `v`, with edge ids.
    pub fn var_neighbors(&self, v: usize) -> &[EdgeRef] {
        &self.var_adj[v]
    }

    /// Variables incident to check `c`, with edge ids.
    pub fn check_neighbors(&self, c: usize) -> &[EdgeRef] {
        &self.check_adj[c]
    }

    pub fn var_degree(&self, v: usize) -> usize {
        self.var_adj[v].len()
    }

    pub fn check_degree(&self, c: usize) -> usize {
        self.check_adj[c].len()
    }

    pub fn max_check_degree(&self) -> usize {
        self.check_adj.iter().map(Vec::len).max().unwrap_or(0)
    }
}
