//! Core of a tractable AIXI-approximate agent: a binary Context Tree
//! Weighting predictor paired with a predictive-UCT (rho-UCT) Monte-Carlo
//! planner that uses the predictor as its generative environment model.
//!
//! Concrete environments, a CLI driver, and a uniform-random baseline
//! agent are deliberately out of scope — see [`Environment`] for the
//! contract this crate consumes.

pub mod agent;
pub mod codec;
pub mod config;
pub mod ctw;
pub mod environment;
pub mod search;

pub use agent::{Agent, LastUpdate};
pub use codec::{bits_for_maximum, decode, encode, Bit, CodecError};
pub use config::AgentConfig;
pub use ctw::tree::CtwTree;
pub use environment::Environment;
pub use search::node::SearchNode;
