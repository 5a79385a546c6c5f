pub mod qtable;

use std::error::Error;
use std::path::Path;

use rand::Rng;

use crate::game::Action;
use crate::nn::Network;
use crate::state::EncodedState;
use qtable::QTable;

/// Dual value estimator: an exact table keyed on the state bitstring plus a
/// small feed-forward approximator, updated together with one-step targets.
/// Owns both representations for the lifetime of a run; nothing here is
/// shared or global.
pub struct ValueEstimator {
    table: QTable,
    network: Network,
    discount: f32,
}

impl ValueEstimator {
    pub fn new(state_len: usize, hidden_width: usize, learning_rate: f32, discount: f32) -> Self {
        Self {
            table: QTable::new(state_len),
            network: Network::value_net(state_len, hidden_width, Action::ALL.len(), learning_rate),
            discount,
        }
    }

    /// Wrap an existing network, e.g. one restored from disk.
    pub fn from_network(network: Network, state_len: usize, discount: f32) -> Self {
        Self {
            table: QTable::new(state_len),
            network,
            discount,
        }
    }

    /// With probability `epsilon` a uniformly random action, otherwise the
    /// network's greedy choice. A non-positive epsilon is always greedy.
    pub fn epsilon_greedy(&mut self, state: &EncodedState, epsilon: f32) -> Action {
        if rand::rng().random::<f32>() < epsilon {
            Action::random()
        } else {
            self.greedy_action(state)
        }
    }

    /// Index of the highest network output; ties keep the lowest index.
    pub fn greedy_action(&mut self, state: &EncodedState) -> Action {
        let output = self.network.predict(&state.to_tensor());
        let values = output.read();

        let mut best = 0;
        for i in 1..values.len() {
            if values[i] > values[best] {
                best = i;
            }
        }

        Action::ALL[best]
    }

    /// One-step update. The target `reward + discount * max_a' Q(next, a')`
    /// is written into the table, then the network takes one supervised step
    /// toward its own forward output with only the acted component replaced
    /// by the target. The other three components are trained toward their
    /// stale values as a side effect; that is the intended rule here, not an
    /// oversight to repair.
    pub fn update(
        &mut self,
        state: &EncodedState,
        action: Action,
        reward: f32,
        next_state: &EncodedState,
    ) {
        let max_next_q = self.table.max_for_state(&next_state.bitstring());
        let target = reward + self.discount * max_next_q;

        self.table.set(&state.bitstring(), action, target);

        let input = state.to_tensor();
        let output = self.network.predict(&input);
        let label = output.deep_clone();
        label.write()[action.index()] = target;
        self.network.train_on_batch(&input, &label);
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn discount(&self) -> f32 {
        self.discount
    }

    /// Persist the approximator's parameters. The table is a per-run
    /// artifact and is not saved.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        self.network.save(path)
    }

    /// Replace the approximator with one restored from `path`.
    pub fn load_network(&mut self, path: &Path) -> Result<(), Box<dyn Error>> {
        self.network = Network::load(path)?;
        Ok(())
    }
}
