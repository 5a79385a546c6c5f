use serde::{Deserialize, Serialize};

use super::layer::{Dense, Layer};

#[typetag::serde(tag = "type")]
pub trait Optimizer {
    fn step(&self, layers: &mut [Box<dyn Layer>]);
    fn clone_box(&self) -> Box<dyn Optimizer>;
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SGD {
    learning_rate: f32,
}

impl SGD {
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

#[typetag::serde]
impl Optimizer for SGD {
    fn step(&self, layers: &mut [Box<dyn Layer>]) {
        for layer in layers {
            let Some(dense) = layer.as_any_mut().downcast_mut::<Dense>() else {
                continue;
            };
            if let (Some(d_weights), Some(d_biases)) = (&dense.d_weights, &dense.d_biases) {
                dense.weights = dense
                    .weights
                    .map2(d_weights, |w, dw| w - self.learning_rate * dw);
                dense.biases = dense
                    .biases
                    .map2(d_biases, |b, db| b - self.learning_rate * db);
            }
        }
    }

    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}
