use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::codec::{self, Bit};
use crate::config::AgentConfig;
use crate::ctw::tree::CtwTree;
use crate::environment::Environment;
use crate::search::node::SearchNode;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LastUpdate {
    Action,
    Percept,
}

/// Scalar agent state sufficient, together with the CTW's own history
/// length, to reverse an arbitrary simulation. See `Agent::restore`.
#[derive(Clone, Copy, Debug)]
struct SavePoint {
    age: u64,
    total_reward: u64,
    history_length: usize,
    last_update: LastUpdate,
}

/// Ties the CTW predictor and the rho-UCT planner together: serializes
/// actions/percepts into the CTW's bit alphabet, drives the learning-period
/// switch, and exposes `search()` as the planner's entry point.
pub struct Agent<E: Environment> {
    environment: E,
    ctw: CtwTree,
    config: AgentConfig,
    rng: StdRng,
    age: u64,
    total_reward: u64,
    last_update: LastUpdate,
}

impl<E: Environment> Agent<E> {
    pub fn new(environment: E, config: AgentConfig, seed: u64) -> Self {
        let ctw = CtwTree::new(config.ct_depth);
        Self {
            environment,
            ctw,
            config,
            rng: StdRng::seed_from_u64(seed),
            age: 0,
            total_reward: 0,
            last_update: LastUpdate::Action,
        }
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.environment
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn total_reward(&self) -> u64 {
        self.total_reward
    }

    pub fn last_update(&self) -> LastUpdate {
        self.last_update
    }

    pub fn model_size(&self) -> usize {
        self.ctw.size()
    }

    /// Probability of observing `bits` next, per the CTW's predictive
    /// distribution — the raw query underlying `predicted_action_probability`
    /// and `percept_probability`, exposed directly for callers that want to
    /// predict an arbitrary bit string rather than a whole action or percept.
    pub fn predict(&mut self, bits: &[Bit]) -> f64 {
        self.ctw.predict(bits)
    }

    /// The root node's log-weighted probability. Exposed mainly for
    /// tests that check save-point restore leaves the CTW bitwise
    /// identical (§8, invariant 6).
    pub fn model_log_w(&self) -> f64 {
        self.ctw.root_log_w()
    }

    pub fn average_reward(&self) -> f64 {
        if self.age == 0 {
            0.0
        } else {
            self.total_reward as f64 / self.age as f64
        }
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn percept_bits(reward: u64, reward_bits: u32, observation: u64, observation_bits: u32) -> Vec<Bit> {
        let mut bits = codec::encode(reward, reward_bits).expect("reward must fit in reward_bits");
        bits.extend(codec::encode(observation, observation_bits).expect("observation must fit in observation_bits"));
        bits
    }

    /// Step 2 of the external environment cycle (§4.6): requires the last
    /// update to have been an action. Learns from the percept unless the
    /// learning period has elapsed, in which case it only conditions on it.
    pub fn model_update_percept(&mut self, observation: u64, reward: u64) {
        assert_eq!(
            self.last_update,
            LastUpdate::Action,
            "model_update_percept called out of order: last update was a percept"
        );
        let bits = Self::percept_bits(
            reward,
            self.environment.reward_bits(),
            observation,
            self.environment.observation_bits(),
        );
        if self.config.learning_period > 0 && self.age > self.config.learning_period as u64 {
            debug!(
                "learning period {} elapsed at age {}: percept conditioned but not learned",
                self.config.learning_period, self.age
            );
            self.ctw.update_history(&bits);
        } else {
            self.ctw.update(&bits);
        }
        self.total_reward += reward;
        self.last_update = LastUpdate::Percept;
    }

    /// Step 5 of the external environment cycle: requires the last update
    /// to have been a percept. Actions are only ever conditioned on, never
    /// learned from.
    pub fn model_update_action(&mut self, action: u64) {
        assert_eq!(
            self.last_update,
            LastUpdate::Percept,
            "model_update_action called out of order: last update was an action"
        );
        let bits = codec::encode(action, self.environment.action_bits()).expect("action must fit in action_bits");
        self.ctw.update_history(&bits);
        self.age += 1;
        self.last_update = LastUpdate::Action;
    }

    /// `ctw.predict(encode_action(a))`. Requires the last update to have
    /// been a percept — the same point at which `model_update_action`
    /// would legally be called.
    pub fn predicted_action_probability(&mut self, action: u64) -> f64 {
        assert_eq!(self.last_update, LastUpdate::Percept);
        let bits = codec::encode(action, self.environment.action_bits()).expect("action must fit in action_bits");
        self.ctw.predict(&bits)
    }

    /// `ctw.predict(encode_percept(o, r))`. Requires the last update to
    /// have been an action.
    pub fn percept_probability(&mut self, observation: u64, reward: u64) -> f64 {
        assert_eq!(self.last_update, LastUpdate::Action);
        let bits = Self::percept_bits(
            reward,
            self.environment.reward_bits(),
            observation,
            self.environment.observation_bits(),
        );
        self.ctw.predict(&bits)
    }

    /// Samples `action_bits` bits from the CTW without updating it, then
    /// decodes them into an action.
    pub fn generate_action(&mut self) -> u64 {
        assert_eq!(self.last_update, LastUpdate::Percept);
        let width = self.environment.action_bits();
        if self.ctw.history_len() < self.ctw.depth() as usize {
            warn!("generate_action: insufficient context, falling back to uniform sampling");
        }
        let bits = self.ctw.generate_random_symbols(width as usize, &mut self.rng);
        codec::decode(&bits, width).expect("sampled bits must decode at the requested width")
    }

    /// Samples `percept_bits` bits from the CTW *with* update, decodes
    /// into `(observation, reward)`, and folds the reward into the
    /// agent's running total. This is the chance-node transition in
    /// `search`: it stands in for a real environment step during planning.
    pub fn generate_percept_and_update(&mut self) -> (u64, u64) {
        assert_eq!(
            self.last_update,
            LastUpdate::Action,
            "generate_percept_and_update called out of order: last update was a percept"
        );
        let reward_bits = self.environment.reward_bits();
        let observation_bits = self.environment.observation_bits();
        if self.ctw.history_len() < self.ctw.depth() as usize {
            warn!("generate_percept_and_update: insufficient context, falling back to uniform sampling");
        }
        let bits = self
            .ctw
            .generate_random_symbols_and_update((reward_bits + observation_bits) as usize, &mut self.rng);
        let reward = codec::decode(&bits[..reward_bits as usize], reward_bits)
            .expect("sampled reward bits must decode at the requested width");
        let observation = codec::decode(&bits[reward_bits as usize..], observation_bits)
            .expect("sampled observation bits must decode at the requested width");
        self.total_reward += reward;
        self.last_update = LastUpdate::Percept;
        (observation, reward)
    }

    /// A uniform-random rollout used to seed a freshly expanded decision
    /// node's value estimate: `horizon` action+percept cycles, each
    /// picking a uniformly random valid action.
    pub(crate) fn playout(&mut self, horizon: u32) -> f64 {
        let mut total = 0.0;
        for _ in 0..horizon {
            let actions = self.environment.valid_actions();
            debug_assert!(!actions.is_empty(), "environment must offer at least one valid action");
            let action = actions[self.rng.random_range(0..actions.len())];
            self.model_update_action(action);
            let (_observation, reward) = self.generate_percept_and_update();
            total += reward as f64;
        }
        total
    }

    /// The planner entry point (rho-UCT / predictive UCT): run
    /// `mc_simulations` sampled trajectories from a fresh decision root,
    /// restoring the agent's model after each one, then pick the valid
    /// action whose child has the greatest mean return.
    pub fn search(&mut self) -> u64 {
        let mut root = SearchNode::new_decision();
        let save = self.save();
        for _ in 0..self.config.mc_simulations {
            root.sample(self, self.config.agent_horizon);
            self.restore(&save);
        }

        let valid_actions = self.environment.valid_actions();
        let mut best_action = None;
        let mut best_priority = f64::NEG_INFINITY;
        for action in &valid_actions {
            if let Some(child) = root.child(*action) {
                let priority = child.mean() + self.rng.random::<f64>() * 1e-4;
                if priority > best_priority {
                    best_priority = priority;
                    best_action = Some(*action);
                }
            }
        }
        let chosen = best_action.unwrap_or_else(|| {
            warn!("search: no action was ever sampled, falling back to a uniform random action");
            valid_actions[self.rng.random_range(0..valid_actions.len())]
        });
        debug!(
            "search: horizon={}, simulations={}, chosen={}, model_size={}",
            self.config.agent_horizon,
            self.config.mc_simulations,
            chosen,
            self.ctw.size()
        );
        chosen
    }

    fn save(&self) -> SavePoint {
        SavePoint {
            age: self.age,
            total_reward: self.total_reward,
            history_length: self.ctw.history_len(),
            last_update: self.last_update,
        }
    }

    /// Undoes exactly the tree-affecting operations performed since
    /// `save` was taken. Percept frames were learned (`update`) and so
    /// must be reverted through the node machinery; action frames were
    /// only appended (`update_history`) and so only need truncating. This
    /// asymmetry is what `last_update` alternates through as it unwinds.
    fn restore(&mut self, save: &SavePoint) {
        while self.ctw.history_len() > save.history_length {
            match self.last_update {
                LastUpdate::Percept => {
                    let width = self.environment.reward_bits() + self.environment.observation_bits();
                    self.ctw.revert(width as usize);
                    self.last_update = LastUpdate::Action;
                }
                LastUpdate::Action => {
                    let width = self.environment.action_bits();
                    self.ctw.revert_history(width as usize);
                    self.last_update = LastUpdate::Percept;
                }
            }
        }
        self.age = save.age;
        self.total_reward = save.total_reward;
        self.last_update = save.last_update;
    }
}
