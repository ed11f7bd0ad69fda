use std::collections::HashMap;

use log::trace;
use rand::Rng;

use crate::agent::Agent;
use crate::environment::Environment;

/// A node in the Monte-Carlo (predictive-UCT / rho-UCT) search tree.
/// Decision nodes branch on the action the agent takes; chance nodes
/// branch on the observation the (simulated) environment returns. Reward
/// never keys a branch — it only accumulates into the backed-up mean.
enum Kind {
    Decision,
    Chance,
}

pub struct SearchNode {
    kind: Kind,
    children: HashMap<u64, SearchNode>,
    visits: u64,
    mean: f64,
}

impl SearchNode {
    pub fn new_decision() -> Self {
        Self {
            kind: Kind::Decision,
            children: HashMap::new(),
            visits: 0,
            mean: 0.0,
        }
    }

    fn new_chance() -> Self {
        Self {
            kind: Kind::Chance,
            children: HashMap::new(),
            visits: 0,
            mean: 0.0,
        }
    }

    pub fn visits(&self) -> u64 {
        self.visits
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn child(&self, key: u64) -> Option<&SearchNode> {
        self.children.get(&key)
    }

    /// Run one simulated trajectory rooted at this node and return its
    /// accumulated reward. Mutates `agent`'s CTW/counters in place; the
    /// caller (`Agent::search`) is responsible for restoring them from a
    /// save-point after each call.
    pub fn sample<E: Environment>(&mut self, agent: &mut Agent<E>, horizon: u32) -> f64 {
        if horizon == 0 {
            return 0.0;
        }
        let total = match self.kind {
            Kind::Chance => {
                let (observation, reward) = agent.generate_percept_and_update();
                let child = self
                    .children
                    .entry(observation)
                    .or_insert_with(SearchNode::new_decision);
                reward as f64 + child.sample(agent, horizon - 1)
            }
            Kind::Decision => {
                if self.visits == 0 {
                    agent.playout(horizon)
                } else {
                    let action = self.select_action(agent, horizon);
                    agent.model_update_action(action);
                    let child = self.children.entry(action).or_insert_with(SearchNode::new_chance);
                    // Horizon is NOT decremented across the action edge:
                    // a unit of horizon is one action+percept cycle, and
                    // the percept edge (chance node, above) is what
                    // completes and decrements it.
                    child.sample(agent, horizon)
                }
            }
        };
        self.backprop(total);
        total
    }

    fn backprop(&mut self, reward: f64) {
        let visits = self.visits;
        self.mean = (reward + visits as f64 * self.mean) / (visits as f64 + 1.0);
        self.visits = visits + 1;
    }

    /// UCB action selection: `U` for any action with an absent or
    /// never-visited child, otherwise the mean plus an exploration bonus
    /// scaled by `horizon * maximum_reward` so it tracks the reward's
    /// actual magnitude rather than an assumed [0,1] range. Ties (and
    /// near-ties) are broken by a small uniform jitter.
    fn select_action<E: Environment>(&self, agent: &mut Agent<E>, horizon: u32) -> u64 {
        let unexplored_bias = agent.config().unexplored_bias;
        let exploration_constant = agent.config().exploration_constant;
        let k = horizon as f64 * agent.environment().maximum_reward() as f64;
        let ln_visits = (self.visits as f64).ln();
        let actions = agent.environment().valid_actions();

        let mut best_action = None;
        let mut best_priority = f64::NEG_INFINITY;
        for action in actions {
            let base = match self.children.get(&action) {
                None => unexplored_bias,
                Some(child) if child.visits == 0 => unexplored_bias,
                Some(child) => {
                    child.mean + k * (exploration_constant * ln_visits / child.visits as f64).sqrt()
                }
            };
            let priority = base + agent.rng_mut().random::<f64>() * 1e-3;
            if priority > best_priority {
                best_priority = priority;
                best_action = Some(action);
            }
        }
        let action = best_action.expect("environment must offer at least one valid action");
        trace!("select_action: horizon={horizon}, chosen={action}, priority={best_priority}");
        action
    }
}
