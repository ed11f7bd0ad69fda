use crate::codec::Bit;

/// One node of the binary context tree: the Krichevsky-Trofimov estimate
/// for the subsequence routed through this context, and the weighted
/// mixture over "split here" vs "keep splitting" that makes CTW a mixture
/// over every depth-bounded Markov model at once.
pub struct CtwNode {
    pub counts: [u64; 2],
    pub log_kt: f64,
    pub log_w: f64,
    pub children: [Option<Box<CtwNode>>; 2],
}

impl Default for CtwNode {
    fn default() -> Self {
        Self {
            counts: [0, 0],
            log_kt: 0.0,
            log_w: 0.0,
            children: [None, None],
        }
    }
}

impl CtwNode {
    pub fn is_leaf(&self) -> bool {
        self.children[0].is_none() && self.children[1].is_none()
    }

    /// log P_kt(s | counts) under the KT estimator, computed from the
    /// counts as they stand *before* `s` is folded in.
    fn log_kt_mult(&self, s: Bit) -> f64 {
        let a = self.counts[0] as f64;
        let b = self.counts[1] as f64;
        let count_s = self.counts[s as usize] as f64;
        ((count_s + 0.5) / (a + b + 1.0)).ln()
    }

    /// Fold in an observed bit: multiplier first (pre-increment counts),
    /// then `log_w`, then the count itself.
    pub fn update(&mut self, s: Bit) {
        self.log_kt += self.log_kt_mult(s);
        self.recompute_log_w();
        self.counts[s as usize] += 1;
    }

    /// Undo `update(s)`. Counts saturate at zero so a revert that outruns
    /// the node's own history is harmless (the tree-level caller is
    /// responsible for not doing that on a live path).
    pub fn revert(&mut self, s: Bit) {
        let idx = s as usize;
        self.counts[idx] = self.counts[idx].saturating_sub(1);
        self.log_kt -= self.log_kt_mult(s);
        self.recompute_log_w();
    }

    /// `log_w = log_kt` at a leaf; otherwise the log-space 50/50 mixture
    /// of `log_kt` (stop splitting here) and the children's combined
    /// `log_w` (keep splitting), via the standard log-sum-exp identity so
    /// that deep trees (D up to 30+) don't underflow.
    pub fn recompute_log_w(&mut self) {
        if self.is_leaf() {
            self.log_w = self.log_kt;
            return;
        }
        let children_log_w = self.children[0].as_ref().map_or(0.0, |n| n.log_w)
            + self.children[1].as_ref().map_or(0.0, |n| n.log_w);
        let a = self.log_kt.max(children_log_w);
        let b = self.log_kt.min(children_log_w);
        self.log_w = -std::f64::consts::LN_2 + a + (b - a).exp().ln_1p();
        debug_assert!(self.log_w <= 1e-9, "log_w must stay non-positive: {}", self.log_w);
    }

    pub fn total_visits(&self) -> u64 {
        self.counts[0] + self.counts[1]
    }
}
