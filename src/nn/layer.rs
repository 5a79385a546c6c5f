use std::any::Any;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tensor::Tensor;

#[typetag::serde(tag = "type")]
pub trait Layer {
    fn forward(&mut self, input: &Tensor) -> Tensor;
    fn backward(&mut self, d_output: &Tensor) -> Tensor;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clone_box(&self) -> Box<dyn Layer>;
}

// fully connected layer

#[derive(Serialize, Deserialize, Clone)]
pub struct Dense {
    pub weights: Tensor,
    pub biases: Tensor,
    cached_input: Option<Tensor>, // for back propagation
    pub d_weights: Option<Tensor>,
    pub d_biases: Option<Tensor>,
}

impl Dense {
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            weights: Tensor::randn(input_size, output_size),
            biases: Tensor::zeros(1, output_size),
            cached_input: None,
            d_weights: None,
            d_biases: None,
        }
    }
}

#[typetag::serde]
impl Layer for Dense {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());

        let output = input.matmul(&self.weights);

        {
            let mut output_data = output.write();
            let biases = self.biases.read();
            let output_size = output.cols();

            output_data.par_chunks_mut(output_size).for_each(|row| {
                for j in 0..output_size {
                    row[j] += biases[j];
                }
            });
        }

        output
    }

    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let cached_input = self
            .cached_input
            .as_ref()
            .expect("complete forward pass first");

        // dL/dW = input.T @ dL/dY
        self.d_weights = Some(cached_input.transpose().matmul(d_output));
        // dL/db = column sums of dL/dY
        self.d_biases = Some(d_output.sum_rows());
        // dL/dX = dL/dY @ W.T
        d_output.matmul(&self.weights.transpose())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}

// rectifier

#[derive(Serialize, Deserialize, Clone)]
pub struct ReLU {
    cached_input: Option<Tensor>,
}

impl ReLU {
    pub fn new() -> Self {
        Self { cached_input: None }
    }
}

impl Default for ReLU {
    fn default() -> Self {
        Self::new()
    }
}

#[typetag::serde]
impl Layer for ReLU {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        self.cached_input = Some(input.clone());
        input.map(|x| x.max(0.0))
    }

    fn backward(&mut self, d_output: &Tensor) -> Tensor {
        let cached_input = self
            .cached_input
            .as_ref()
            .expect("complete forward pass first");

        cached_input.map2(d_output, |input_val, grad| {
            if input_val > 0.0 { grad } else { 0.0 }
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }
}
