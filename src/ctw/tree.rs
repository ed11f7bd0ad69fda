use log::trace;
use rand::Rng;

use crate::codec::Bit;
use crate::ctw::history::History;
use crate::ctw::node::CtwNode;

/// Owns the root node, the bit history, and the context-path scratch space.
/// `depth` bounds how many bits of context each prediction conditions on;
/// every Markov model of order `0..=depth` is mixed together via the
/// nodes' `log_w`.
pub struct CtwTree {
    depth: u32,
    root: CtwNode,
    history: History,
    size: usize,
}

impl CtwTree {
    pub fn new(depth: u32) -> Self {
        Self {
            depth,
            root: CtwNode::default(),
            history: History::new(),
            size: 1,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn root_log_w(&self) -> f64 {
        self.root.log_w
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Learn from `bits` in order: each one updates every node on its
    /// context path (when enough history exists), then is appended.
    pub fn update(&mut self, bits: &[Bit]) {
        for &s in bits {
            if self.history.len() >= self.depth as usize {
                let context = self.context_bits();
                Self::update_path(&mut self.root, &context, s, &mut self.size);
            }
            self.history.push(s);
        }
    }

    /// Append bits without touching any node — conditions future
    /// predictions on them without learning from them.
    pub fn update_history(&mut self, bits: &[Bit]) {
        for &s in bits {
            self.history.push(s);
        }
    }

    /// Undo the last `k` `update` calls, one bit at a time. Running past
    /// the start of history is a silent no-op, by design (§4.3).
    pub fn revert(&mut self, k: usize) {
        for _ in 0..k {
            let s = match self.history.pop() {
                Some(s) => s,
                None => return,
            };
            if self.history.len() >= self.depth as usize {
                let context = self.context_bits();
                Self::revert_path(&mut self.root, &context, s, &mut self.size);
            }
        }
    }

    /// Undo the last `k` `update_history` calls. Unlike `revert`, running
    /// past available history is a contract violation, not a no-op.
    pub fn revert_history(&mut self, k: usize) {
        assert!(
            k <= self.history.len(),
            "revert_history({k}) exceeds history length {}",
            self.history.len()
        );
        self.history.truncate_from_end(k);
    }

    /// Probability of observing `bits` next, computed by sandwiching a
    /// real `update`/`revert` around a `root.log_w` snapshot so the tree is
    /// left bitwise unchanged.
    pub fn predict(&mut self, bits: &[Bit]) -> f64 {
        if self.history.len() + bits.len() <= self.depth as usize {
            return 0.5_f64.powi(bits.len() as i32);
        }
        let before = self.root.log_w;
        self.update(bits);
        let after = self.root.log_w;
        self.revert(bits.len());
        let p = (after - before).exp();
        debug_assert!((0.0..=1.0 + 1e-9).contains(&p), "predict produced {p}");
        p.clamp(0.0, 1.0)
    }

    /// Sample `n` bits from the predictive distribution and learn from
    /// them as they're drawn (used for simulated percepts during search).
    pub fn generate_random_symbols_and_update<R: Rng + ?Sized>(
        &mut self,
        n: usize,
        rng: &mut R,
    ) -> Vec<Bit> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            let p1 = self.predict(&[1]);
            let bit = if rng.random::<f64>() < p1 { 1 } else { 0 };
            self.update(&[bit]);
            out.push(bit);
        }
        out
    }

    /// Sample `n` bits without learning from them: equivalent to
    /// `generate_random_symbols_and_update` followed by a full revert.
    pub fn generate_random_symbols<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Vec<Bit> {
        let bits = self.generate_random_symbols_and_update(n, rng);
        self.revert(n);
        bits
    }

    pub fn clear(&mut self) {
        self.root = CtwNode::default();
        self.history.clear();
        self.size = 1;
    }

    /// Context bits at offsets `1..=depth` back from the end, in that
    /// order — the sequence `update_path`/`revert_path` consume while
    /// descending from the root.
    fn context_bits(&self) -> Vec<Bit> {
        (1..=self.depth as usize).map(|i| self.history.from_end(i)).collect()
    }

    /// Descend along `remaining`, creating children lazily, then fold `s`
    /// into every node on the path deepest-first (post-order), so a
    /// parent's `log_w` recompute always sees already-updated children.
    fn update_path(node: &mut CtwNode, remaining: &[Bit], s: Bit, size: &mut usize) {
        if let Some((&bit, rest)) = remaining.split_first() {
            let idx = bit as usize;
            if node.children[idx].is_none() {
                node.children[idx] = Some(Box::new(CtwNode::default()));
                *size += 1;
            }
            Self::update_path(node.children[idx].as_mut().unwrap(), rest, s, size);
        }
        node.update(s);
        trace!("ctw update: depth remaining {}, bit {}", remaining.len(), s);
    }

    /// Mirror of `update_path`: revert deepest-first, and once a child's
    /// revert leaves it with zero visits, prune it (its own subtree was
    /// already pruned on the way back up, so removing it drops exactly
    /// one node).
    fn revert_path(node: &mut CtwNode, remaining: &[Bit], s: Bit, size: &mut usize) {
        if let Some((&bit, rest)) = remaining.split_first() {
            let idx = bit as usize;
            if let Some(child) = node.children[idx].as_mut() {
                Self::revert_path(child, rest, s, size);
                if child.total_visits() == 0 {
                    node.children[idx] = None;
                    *size -= 1;
                }
            }
        }
        node.revert(s);
        trace!("ctw revert: depth remaining {}, bit {}", remaining.len(), s);
    }
}
