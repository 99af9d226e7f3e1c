//! Iterative belief propagation on the Tanner graph.
//!
//! Messages live in two flat arrays indexed by edge id, one per direction.
//! The check update is either the exact sum-product rule or a scaled min-sum
//! approximation, selected at runtime.

use crate::code::ParityCheckCode;
use std::sync::Arc;

/// 1 - 2^-30. Tanh products are clamped into (-1, 1) by this amount before
/// `atanh`, which also bounds every check-to-variable message.
const PRODUCT_CLAMP: f64 = 1.0 - 9.313_225_746_154_785e-10;

/// Check-node update rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateRule {
    /// Exact tanh-product rule.
    SumProduct,
    /// Sign product times minimum magnitude, scaled by `scale`.
    MinSum { scale: f64 },
}

impl Default for UpdateRule {
    fn default() -> Self {
        UpdateRule::SumProduct
    }
}

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Iteration cap; decode always runs at least one iteration.
    pub max_iterations: usize,
    /// Stop as soon as the hard decisions satisfy every check.
    pub early_termination: bool,
    pub update_rule: UpdateRule,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            early_termination: true,
            update_rule: UpdateRule::SumProduct,
        }
    }
}

/// Belief-propagation decoder for one worker.
#[derive(Debug, Clone)]
pub struct BpDecoder {
    code: Arc<ParityCheckCode>,
    config: DecoderConfig,
    /// Largest representable message magnitude, matching the product clamp.
    message_limit: f64,
    var_to_check: Vec<f64>,
    check_to_var: Vec<f64>,
    llr_out: Vec<f64>,
    syndrome: Vec<u8>,
    scratch: Vec<f64>,
}

impl BpDecoder {
    pub fn new(code: Arc<ParityCheckCode>, config: DecoderConfig) -> Self {
        let edges = code.edge_count();
        let scratch = vec![0.0; code.max_check_degree()];
        Self {
            message_limit: 2.0 * PRODUCT_CLAMP.atanh(),
            var_to_check: vec![0.0; edges],
            check_to_var: vec![0.0; edges],
            llr_out: vec![0.0; code.n()],
            syndrome: vec![0; code.m()],
            scratch,
            config,
            code,
        }
    }

    /// Runs message passing on `channel_llrs` and returns the number of
    /// iterations executed, in `1..=max_iterations`.
    ///
    /// Afterwards [`llr_out`](Self::llr_out) holds the a posteriori LLRs and
    /// [`syndrome`](Self::syndrome) the parity of their hard decisions, both
    /// consistent with the last completed iteration. Numerical divergence is
    /// not signalled; it surfaces as a nonzero syndrome or bit errors.
    pub fn decode(&mut self, channel_llrs: &[f64]) -> usize {
        assert_eq!(channel_llrs.len(), self.code.n());

        self.var_to_check.fill(0.0);
        self.check_to_var.fill(0.0);

        let iterations = self.config.max_iterations.max(1);
        for iteration in 1..=iterations {
            self.update_variable_messages(channel_llrs);
            self.update_check_messages();
            self.update_outputs(channel_llrs);
            if self.config.early_termination && self.syndrome_clear() {
                return iteration;
            }
        }
        iterations
    }

    /// A posteriori LLRs from the last decode.
    pub fn llr_out(&self) -> &[f64] {
        &self.llr_out
    }

    /// Syndrome of the last decode's hard decisions, one {0,1} per check.
    pub fn syndrome(&self) -> &[u8] {
        &self.syndrome
    }

    pub fn is_codeword(&self) -> bool {
        self.syndrome_clear()
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn code(&self) -> &ParityCheckCode {
        &self.code
    }

    // msg(v -> c) = llr(v) + sum of incoming messages except the one from c
    fn update_variable_messages(&mut self, channel_llrs: &[f64]) {
        for v in 0..self.code.n() {
            let incident = self.code.var_neighbors(v);
            let total: f64 = channel_llrs[v]
                + incident.iter().map(|e| self.check_to_var[e.edge]).sum::<f64>();
            for e in incident {
                self.var_to_check[e.edge] = total - self.check_to_var[e.edge];
            }
        }
    }

    fn update_check_messages(&mut self) {
        match self.config.update_rule {
            UpdateRule::SumProduct => self.update_checks_sum_product(),
            UpdateRule::MinSum { scale } => self.update_checks_min_sum(scale),
        }
    }

    // msg(c -> v) = 2 atanh( prod of tanh(msg(v' -> c) / 2), v' != v )
    fn update_checks_sum_product(&mut self) {
        for c in 0..self.code.m() {
            let incident = self.code.check_neighbors(c);
            if let [only] = incident {
                // The nonlinearity over a single message is the identity:
                // a degree-one check forwards its incoming message unchanged
                self.check_to_var[only.edge] = self.var_to_check[only.edge];
                continue;
            }
            for (slot, e) in self.scratch.iter_mut().zip(incident.iter()) {
                *slot = (self.var_to_check[e.edge] / 2.0).tanh();
            }
            for (i, e) in incident.iter().enumerate() {
                let mut product = 1.0;
                for j in 0..incident.len() {
                    if j != i {
                        product *= self.scratch[j];
                    }
                }
                let product = product.clamp(-PRODUCT_CLAMP, PRODUCT_CLAMP);
                self.check_to_var[e.edge] = 2.0 * product.atanh();
            }
        }
    }

    // Sign product times minimum magnitude over the other edges, scaled.
    fn update_checks_min_sum(&mut self, scale: f64) {
        for c in 0..self.code.m() {
            let incident = self.code.check_neighbors(c);
            if let [only] = incident {
                // Degree-one check: forward the incoming message unchanged
                self.check_to_var[only.edge] = self.var_to_check[only.edge];
                continue;
            }
            for (slot, e) in self.scratch.iter_mut().zip(incident.iter()) {
                *slot = self.var_to_check[e.edge];
            }
            for (i, e) in incident.iter().enumerate() {
                let mut sign = 1.0;
                let mut magnitude = f64::INFINITY;
                for j in 0..incident.len() {
                    if j != i {
                        let msg = self.scratch[j];
                        if msg < 0.0 {
                            sign = -sign;
                        }
                        magnitude = magnitude.min(msg.abs());
                    }
                }
                let magnitude = (scale * magnitude).min(self.message_limit);
                self.check_to_var[e.edge] = sign * magnitude;
            }
        }
    }

    fn update_outputs(&mut self, channel_llrs: &[f64]) {
        for v in 0..self.code.n() {
            self.llr_out[v] = channel_llrs[v]
                + self
                    .code
                    .var_neighbors(v)
                    .iter()
                    .map(|e| self.check_to_var[e.edge])
                    .sum::<f64>();
        }
        for c in 0..self.code.m() {
            let mut parity = 0u8;
            for e in self.code.check_neighbors(c) {
                parity ^= (self.llr_out[e.node] <= 0.0) as u8;
            }
            self.syndrome[c] = parity;
        }
    }

    fn syndrome_clear(&self) -> bool {
        self.syndrome.iter().all(|&s| s == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::ParityCheckCode;

    fn decoder(code: ParityCheckCode, rule: UpdateRule) -> BpDecoder {
        BpDecoder::new(
            Arc::new(code),
            DecoderConfig { max_iterations: 10, early_termination: true, update_rule: rule },
        )
    }

    // H = [[1,1,1,0],[0,1,1,1]]
    fn small_code() -> ParityCheckCode {
        ParityCheckCode::from_edges(4, 2, &[(0, 0), (1, 0), (1, 1), (2, 0), (2, 1), (3, 1)])
            .unwrap()
    }

    #[test]
    fn test_clean_llrs_decode_in_one_iteration() {
        for rule in [UpdateRule::SumProduct, UpdateRule::MinSum { scale: 0.75 }] {
            let mut dec = decoder(small_code(), rule);
            let iterations = dec.decode(&[8.0, 8.0, 8.0, 8.0]);
            assert_eq!(iterations, 1);
            assert!(dec.is_codeword());
            assert!(dec.llr_out().iter().all(|&l| l > 0.0));
        }
    }

    #[test]
    fn test_syndrome_matches_hard_decisions() {
        let mut dec = decoder(small_code(), UpdateRule::SumProduct);
        // Conflicting LLRs so some checks stay unsatisfied
        dec.decode(&[5.0, -3.0, 2.0, -1.0]);
        let code = dec.code().clone();
        for c in 0..code.m() {
            let mut parity = 0u8;
            for e in code.check_neighbors(c) {
                parity ^= (dec.llr_out()[e.node] <= 0.0) as u8;
            }
            assert_eq!(dec.syndrome()[c], parity);
        }
    }

    #[test]
    fn test_early_termination_implies_zero_syndrome() {
        let mut dec = decoder(small_code(), UpdateRule::SumProduct);
        let iterations = dec.decode(&[4.0, -0.5, 3.0, 3.0]);
        if iterations < dec.config().max_iterations {
            assert!(dec.syndrome().iter().all(|&s| s == 0));
        }
    }

    #[test]
    fn test_single_error_corrected() {
        // Two overlapping checks pin down a single weak bit
        let mut dec = decoder(small_code(), UpdateRule::SumProduct);
        let iterations = dec.decode(&[6.0, -1.0, 6.0, 6.0]);
        assert!(iterations <= dec.config().max_iterations);
        assert!(dec.is_codeword());
        assert!(dec.llr_out().iter().all(|&l| l > 0.0));
    }

    #[test]
    fn test_iteration_cap_respected() {
        let mut dec = BpDecoder::new(
            Arc::new(small_code()),
            DecoderConfig {
                max_iterations: 3,
                early_termination: true,
                update_rule: UpdateRule::SumProduct,
            },
        );
        // All-zero LLRs never converge: every hard decision is one
        let iterations = dec.decode(&[0.0; 4]);
        assert_eq!(iterations, 3);
        assert!(!dec.is_codeword());
    }

    #[test]
    fn test_no_early_termination_runs_full_budget() {
        let mut dec = BpDecoder::new(
            Arc::new(small_code()),
            DecoderConfig {
                max_iterations: 7,
                early_termination: false,
                update_rule: UpdateRule::SumProduct,
            },
        );
        let iterations = dec.decode(&[8.0, 8.0, 8.0, 8.0]);
        assert_eq!(iterations, 7);
        assert!(dec.is_codeword());
    }

    #[test]
    fn test_degree_zero_variable_keeps_channel_llr() {
        let code = ParityCheckCode::from_edges(3, 1, &[(0, 0), (1, 0)]).unwrap();
        let mut dec = decoder(code, UpdateRule::SumProduct);
        dec.decode(&[2.0, 2.0, -1.5]);
        assert_eq!(dec.llr_out()[2], -1.5);
    }

    #[test]
    fn test_degree_one_check_forwards_its_message() {
        // Check 1 touches only variable 2, and variable 2 touches only check 1,
        // so its v -> c message equals the channel LLR every iteration and the
        // degree-one check must hand it back unchanged
        let code = ParityCheckCode::from_edges(3, 2, &[(0, 0), (1, 0), (2, 1)]).unwrap();
        for rule in [UpdateRule::SumProduct, UpdateRule::MinSum { scale: 0.75 }] {
            let mut dec = decoder(code.clone(), rule);
            dec.decode(&[3.0, 3.0, -0.25]);
            // llr_out = channel LLR + forwarded message, sign preserved
            assert_eq!(dec.llr_out()[2], -0.5);
        }
    }

    #[test]
    fn test_infinite_llrs_stay_decodable() {
        // BSC at p = 0 produces infinite LLRs
        let mut dec = decoder(small_code(), UpdateRule::SumProduct);
        let iterations = dec.decode(&[f64::INFINITY; 4]);
        assert_eq!(iterations, 1);
        assert!(dec.is_codeword());
    }

    #[test]
    fn test_min_sum_messages_bounded() {
        let mut dec = decoder(small_code(), UpdateRule::MinSum { scale: 1.0 });
        dec.decode(&[f64::INFINITY; 4]);
        let limit = 2.0 * PRODUCT_CLAMP.atanh();
        assert!(dec.check_to_var.iter().all(|&m| m.abs() <= limit));
    }
}
