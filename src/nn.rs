pub mod layer;
pub mod loss;
pub mod optimizer;
pub mod tensor;

use std::error::Error;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use layer::{Dense, Layer, ReLU};
use loss::{Loss, MeanSquaredError};
use optimizer::{Optimizer, SGD};
use tensor::Tensor;

/// Feed-forward stack of layers trained against a loss with an optimizer.
#[derive(Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Box<dyn Layer>>,
    pub loss: Box<dyn Loss>,
    pub optimizer: Box<dyn Optimizer>,
}

impl Network {
    pub fn new(
        layers: Vec<Box<dyn Layer>>,
        loss: Box<dyn Loss>,
        optimizer: Box<dyn Optimizer>,
    ) -> Self {
        Self {
            layers,
            loss,
            optimizer,
        }
    }

    /// Value head for the agent: two hidden ReLU layers of `hidden_width`,
    /// a linear output unit per action, mean squared error, plain SGD.
    pub fn value_net(
        inputs: usize,
        hidden_width: usize,
        outputs: usize,
        learning_rate: f32,
    ) -> Self {
        let layers: Vec<Box<dyn Layer>> = vec![
            Box::new(Dense::new(inputs, hidden_width)),
            Box::new(ReLU::new()),
            Box::new(Dense::new(hidden_width, hidden_width)),
            Box::new(ReLU::new()),
            Box::new(Dense::new(hidden_width, outputs)),
        ];

        Network::new(layers, Box::new(MeanSquaredError), Box::new(SGD::new(learning_rate)))
    }

    pub fn predict(&mut self, input: &Tensor) -> Tensor {
        let mut output = input.clone();
        for layer in &mut self.layers {
            output = layer.forward(&output);
        }
        output
    }

    /// One supervised step toward `y_batch`.
    pub fn train_on_batch(&mut self, x_batch: &Tensor, y_batch: &Tensor) {
        let y_pred = self.predict(x_batch);
        let mut d_output = self.loss.gradient(&y_pred, y_batch);
        for layer in self.layers.iter_mut().rev() {
            d_output = layer.backward(&d_output);
        }
        self.optimizer.step(&mut self.layers);
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let file = File::create(path)?;
        bincode::serialize_into(file, self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path)?;
        let network: Network = bincode::deserialize_from(file)?;
        Ok(network)
    }
}

impl Clone for Network {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.iter().map(|layer| layer.clone_box()).collect(),
            loss: self.loss.clone_box(),
            optimizer: self.optimizer.clone_box(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn assert_vec_approx_eq(a: &[f32], b: &[f32]) {
        let tolerance = 1e-6;
        assert_eq!(a.len(), b.len(), "vectors have different lengths");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < tolerance, "mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    #[test]
    fn test_value_net_output_shape() {
        let mut network = Network::value_net(20, 16, 4, 0.001);
        let input = Tensor::zeros(1, 20);

        let output = network.predict(&input);

        assert_eq!(output.rows(), 1);
        assert_eq!(output.cols(), 4);
    }

    #[test]
    fn test_train_on_batch_updates_weights() {
        let mut dense = Dense::new(2, 1);
        dense.weights = Tensor::from_vec(vec![0.5, -0.5], 2, 1);
        dense.biases = Tensor::from_vec(vec![0.1], 1, 1);
        let initial_weights = dense.weights.deep_clone();

        let mut network = Network::new(
            vec![Box::new(dense)],
            Box::new(MeanSquaredError),
            Box::new(SGD::new(0.1)),
        );

        let x = Tensor::from_vec(vec![1.0, 2.0], 1, 2);
        let y = Tensor::from_vec(vec![1.0], 1, 1);
        network.train_on_batch(&x, &y);

        let updated = network.layers[0].as_any().downcast_ref::<Dense>().unwrap();
        assert_ne!(*initial_weights.read(), *updated.weights.read(), "weights did not update");
    }

    #[test]
    fn test_repeated_training_reduces_loss() {
        let mut network = Network::value_net(4, 8, 2, 0.01);
        let x = Tensor::from_vec(vec![1.0, 0.0, 1.0, 0.0], 1, 4);
        let y = Tensor::from_vec(vec![0.5, -0.5], 1, 2);

        let initial = {
            let pred = network.predict(&x);
            network.loss.calculate(&pred, &y)
        };
        for _ in 0..50 {
            network.train_on_batch(&x, &y);
        }
        let trained = {
            let pred = network.predict(&x);
            network.loss.calculate(&pred, &y)
        };

        assert!(trained < initial, "loss did not decrease: {} -> {}", initial, trained);
    }

    #[test]
    fn test_clone_is_independent() {
        let network = Network::value_net(4, 8, 2, 0.01);
        let cloned = network.clone();

        let original_dense = network.layers[0].as_any().downcast_ref::<Dense>().unwrap();
        let cloned_dense = cloned.layers[0].as_any().downcast_ref::<Dense>().unwrap();

        assert_vec_approx_eq(&original_dense.weights.read(), &cloned_dense.weights.read());
        assert!(!Arc::ptr_eq(&original_dense.weights.data, &cloned_dense.weights.data));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = Path::new("test_network_roundtrip.bin");
        let mut network = Network::value_net(6, 8, 4, 0.001);

        network.save(path).unwrap();
        let mut loaded = Network::load(path).unwrap();

        let input = Tensor::from_vec(vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0], 1, 6);
        let original_out = network.predict(&input);
        let loaded_out = loaded.predict(&input);

        assert_vec_approx_eq(&original_out.read(), &loaded_out.read());

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(Network::load(Path::new("does_not_exist.bin")).is_err());
    }
}
