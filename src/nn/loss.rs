use serde::{Deserialize, Serialize};

use super::tensor::Tensor;

#[typetag::serde(tag = "type")]
pub trait Loss {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32;
    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor;
    fn clone_box(&self) -> Box<dyn Loss>;
}

#[derive(Serialize, Deserialize, Clone)]
pub struct MeanSquaredError;

#[typetag::serde]
impl Loss for MeanSquaredError {
    fn calculate(&self, y_pred: &Tensor, y_true: &Tensor) -> f32 {
        let diff = y_pred.map2(y_true, |pred, truth| pred - truth);
        let squared = diff.map(|x| x * x);
        squared.read().iter().sum::<f32>() / y_pred.rows() as f32
    }

    fn gradient(&self, y_pred: &Tensor, y_true: &Tensor) -> Tensor {
        let batch_size = y_pred.rows() as f32;
        y_pred
            .map2(y_true, |pred, truth| pred - truth)
            .map(move |x| 2.0 * x / batch_size)
    }

    fn clone_box(&self) -> Box<dyn Loss> {
        Box::new(self.clone())
    }
}
