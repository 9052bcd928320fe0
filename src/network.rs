use crate::{Error, Layer, LayerCache, LayerGradients, Loss, Matrix, Result};

/// An ordered stack of dense layers plus the loss they are trained against.
///
/// The layer sequence is fixed after construction. Use [`crate::NetworkBuilder`] to create one
/// from layer specs, or [`Network::new`] from already-built layers.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    loss: Loss,
    last_loss: Option<f32>,
}

/// Everything a training-mode forward pass recorded, one cache per layer.
///
/// Returned by [`Network::forward`] and consumed by [`Network::backward`].
#[derive(Debug, Clone)]
pub struct ForwardPass {
    caches: Vec<LayerCache>,
}

impl ForwardPass {
    /// Final-layer output (shape `(batch, output_dim)`).
    pub fn output(&self) -> &Matrix {
        self.caches
            .last()
            .expect("forward pass must have at least one layer cache")
            .output()
    }

    /// Post-activation output of layer `idx`.
    pub fn layer_output(&self, idx: usize) -> &Matrix {
        self.caches[idx].output()
    }

    pub fn into_output(mut self) -> Matrix {
        self.caches
            .pop()
            .expect("forward pass must have at least one layer cache")
            .into_output()
    }
}

/// Parameter gradients of a whole network, one entry per layer in forward order.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    layers: Vec<LayerGradients>,
}

impl Gradients {
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> &LayerGradients {
        &self.layers[idx]
    }

    /// All gradient matrices in parameter order: weights then bias, layer by layer.
    pub fn iter(&self) -> impl Iterator<Item = &Matrix> + '_ {
        self.layers
            .iter()
            .flat_map(|g| [&g.d_weights, &g.d_bias])
    }

    /// L2 norm over every gradient entry.
    pub fn global_norm(&self) -> f32 {
        self.iter()
            .map(|m| m.as_slice().iter().map(|v| v * v).sum::<f32>())
            .sum::<f32>()
            .sqrt()
    }
}

impl Network {
    /// Assemble a network from layers whose widths chain (`layers[i].out_dim == layers[i + 1].in_dim`).
    pub fn new(layers: Vec<Layer>, loss: Loss) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }
        for (idx, pair) in layers.windows(2).enumerate() {
            if pair[0].out_dim() != pair[1].in_dim() {
                return Err(Error::InvalidConfig(format!(
                    "layer {idx} out_dim {} does not match layer {} in_dim {}",
                    pair[0].out_dim(),
                    idx + 1,
                    pair[1].in_dim()
                )));
            }
        }
        Ok(Self {
            layers,
            loss,
            last_loss: None,
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layers
            .first()
            .expect("network must have at least one layer")
            .in_dim()
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layers
            .last()
            .expect("network must have at least one layer")
            .out_dim()
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> &Layer {
        &self.layers[idx]
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> &mut Layer {
        &mut self.layers[idx]
    }

    #[inline]
    pub fn loss(&self) -> Loss {
        self.loss
    }

    /// Loss of the most recent [`Network::train_step`], if any.
    #[inline]
    pub fn last_loss(&self) -> Option<f32> {
        self.last_loss
    }

    pub(crate) fn set_last_loss(&mut self, loss: f32) {
        self.last_loss = Some(loss);
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }

    /// Borrowed parameters in a stable order: weights then bias, layer by layer.
    pub fn params(&self) -> Vec<&Matrix> {
        self.layers
            .iter()
            .flat_map(|l| [l.weights(), l.bias()])
            .collect()
    }

    /// Owned copies of [`Network::params`].
    pub fn export_params(&self) -> Vec<Matrix> {
        self.params().into_iter().cloned().collect()
    }

    pub(crate) fn params_mut(&mut self) -> impl Iterator<Item = &mut Matrix> + '_ {
        self.layers.iter_mut().flat_map(Layer::params_mut)
    }

    /// Training-mode forward pass for a batch `(batch, input_dim)`.
    ///
    /// Panics if the input width does not match `input_dim()`.
    pub fn forward(&self, input: &Matrix) -> ForwardPass {
        assert_eq!(
            input.cols(),
            self.input_dim(),
            "input width {} does not match network input_dim {}",
            input.cols(),
            self.input_dim()
        );

        let mut caches: Vec<LayerCache> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let layer_input = match caches.last() {
                Some(prev) => prev.output().clone(),
                None => input.clone(),
            };
            caches.push(layer.forward(layer_input));
        }
        ForwardPass { caches }
    }

    /// Backward pass for the batch recorded in `pass`.
    ///
    /// `d_output` is `dL/d(output)`, usually from [`Loss::backward`]. Layers are visited in
    /// reverse order; each layer's input gradient becomes the previous layer's output gradient.
    ///
    /// Returns the per-layer parameter gradients (forward order) and `dL/d(input)`.
    pub fn backward(&self, pass: ForwardPass, d_output: &Matrix) -> (Gradients, Matrix) {
        assert_eq!(
            pass.caches.len(),
            self.layers.len(),
            "forward pass has {} layer caches, network has {} layers",
            pass.caches.len(),
            self.layers.len()
        );

        let mut grads = Vec::with_capacity(self.layers.len());
        let mut upstream = d_output.clone();
        for (layer, cache) in self.layers.iter().zip(pass.caches).rev() {
            let (d_input, layer_grads) = layer.backward(cache, &upstream);
            grads.push(layer_grads);
            upstream = d_input;
        }
        grads.reverse();

        (Gradients { layers: grads }, upstream)
    }

    /// One forward/backward cycle on a batch; parameters are not updated.
    ///
    /// Returns the batch loss and the gradients, and records the loss as `last_loss()`.
    pub fn train_step(&mut self, input: &Matrix, target: &Matrix) -> (f32, Gradients) {
        let pass = self.forward(input);
        let (loss, d_output) = self.loss.backward(pass.output(), target);
        let (grads, _) = self.backward(pass, &d_output);
        self.last_loss = Some(loss);
        (loss, grads)
    }

    /// Inference: raw final-layer output, no caches kept.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        assert_eq!(
            input.cols(),
            self.input_dim(),
            "input width {} does not match network input_dim {}",
            input.cols(),
            self.input_dim()
        );
        let mut out = self.layers[0].predict(input);
        for layer in &self.layers[1..] {
            out = layer.predict(&out);
        }
        out
    }

    /// Inference with the loss's output transform applied (softmax probabilities for
    /// softmax cross-entropy, raw output for MSE).
    pub fn predict_output(&self, input: &Matrix) -> Matrix {
        self.loss.output(&self.predict(input))
    }

    /// Loss over `(inputs, targets)` without touching `last_loss`.
    pub fn evaluate_loss(&self, inputs: &Matrix, targets: &Matrix) -> Result<f32> {
        self.check_batch(inputs, targets)?;
        Ok(self.loss.forward(&self.predict(inputs), targets))
    }

    pub(crate) fn check_batch(&self, inputs: &Matrix, targets: &Matrix) -> Result<()> {
        if inputs.rows() != targets.rows() {
            return Err(Error::InvalidData(format!(
                "inputs have {} rows but targets have {}",
                inputs.rows(),
                targets.rows()
            )));
        }
        if inputs.cols() != self.input_dim() {
            return Err(Error::InvalidData(format!(
                "input width {} does not match network input_dim {}",
                inputs.cols(),
                self.input_dim()
            )));
        }
        if targets.cols() != self.output_dim() {
            return Err(Error::InvalidData(format!(
                "target width {} does not match network output_dim {}",
                targets.cols(),
                self.output_dim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{Activation, Init};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_close(analytic: f32, numeric: f32, abs_tol: f32, rel_tol: f32) {
        let diff = (analytic - numeric).abs();
        let scale = analytic.abs().max(numeric.abs()).max(1.0);
        assert!(
            diff <= abs_tol || diff / scale <= rel_tol,
            "analytic={analytic} numeric={numeric} diff={diff}"
        );
    }

    fn small_net(loss: Loss, seed: u64) -> Network {
        let mut rng = StdRng::seed_from_u64(seed);
        let hidden = Layer::new_with_rng(2, 3, Init::Glorot, Activation::Tanh, &mut rng).unwrap();
        let out = Layer::new_with_rng(3, 2, Init::Glorot, Activation::Sigmoid, &mut rng).unwrap();
        Network::new(vec![hidden, out], loss).unwrap()
    }

    #[test]
    fn new_rejects_empty_and_unchained_layers() {
        assert!(Network::new(vec![], Loss::MeanSquaredError).is_err());

        let a = Layer::from_parts(Matrix::zeros(2, 3), Matrix::zeros(1, 3), Activation::Linear)
            .unwrap();
        let b = Layer::from_parts(Matrix::zeros(4, 1), Matrix::zeros(1, 1), Activation::Linear)
            .unwrap();
        let err = Network::new(vec![a, b], Loss::MeanSquaredError).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn params_are_weight_then_bias_in_layer_order() {
        let net = small_net(Loss::MeanSquaredError, 0);
        let shapes: Vec<_> = net.params().iter().map(|m| m.shape()).collect();
        assert_eq!(shapes, vec![(2, 3), (1, 3), (3, 2), (1, 2)]);
        assert_eq!(net.parameter_count(), 6 + 3 + 6 + 2);
        assert_eq!(net.export_params().len(), 4);
    }

    #[test]
    fn forward_and_predict_agree() {
        let net = small_net(Loss::MeanSquaredError, 5);
        let x = Matrix::from_array(&[[0.3, -0.7], [1.0, 0.5], [-0.2, 0.0]]);
        let pass = net.forward(&x);
        assert_eq!(pass.output().shape(), (3, 2));
        assert_eq!(pass.layer_output(0).shape(), (3, 3));
        assert_eq!(pass.into_output(), net.predict(&x));
    }

    #[test]
    fn backward_matches_numeric_gradients() {
        for loss in [Loss::MeanSquaredError, Loss::SoftmaxCrossEntropy] {
            let mut net = small_net(loss, 1);
            let x = Matrix::from_array(&[[0.3, -0.7], [0.9, 0.1]]);
            let y = Matrix::from_array(&[[0.0, 1.0], [1.0, 0.0]]);
            // MSE gradients are normalized by rows only; the loss value averages over columns too.
            let scale = match loss {
                Loss::MeanSquaredError => y.cols() as f32,
                Loss::SoftmaxCrossEntropy => 1.0,
            };

            let (_, grads) = net.train_step(&x, &y);
            let pass = net.forward(&x);
            let (_, d_out) = net.loss().backward(pass.output(), &y);
            let (_, d_input) = net.backward(pass, &d_out);

            let eps = 1e-2_f32;
            let abs_tol = 1e-3_f32;
            let rel_tol = 1e-2_f32;

            let analytic: Vec<Matrix> = grads.iter().cloned().collect();
            for (p, g) in analytic.iter().enumerate() {
                for r in 0..g.rows() {
                    for c in 0..g.cols() {
                        let orig = net.params()[p].get(r, c);

                        net.params_mut().nth(p).unwrap().set(r, c, orig + eps);
                        let plus = net.evaluate_loss(&x, &y).unwrap();
                        net.params_mut().nth(p).unwrap().set(r, c, orig - eps);
                        let minus = net.evaluate_loss(&x, &y).unwrap();
                        net.params_mut().nth(p).unwrap().set(r, c, orig);

                        let numeric = scale * (plus - minus) / (2.0 * eps);
                        assert_close(g.get(r, c), numeric, abs_tol, rel_tol);
                    }
                }
            }

            for r in 0..x.rows() {
                for c in 0..x.cols() {
                    let mut plus = x.clone();
                    plus.set(r, c, x.get(r, c) + eps);
                    let mut minus = x.clone();
                    minus.set(r, c, x.get(r, c) - eps);
                    let numeric = scale
                        * (net.evaluate_loss(&plus, &y).unwrap()
                            - net.evaluate_loss(&minus, &y).unwrap())
                        / (2.0 * eps);
                    assert_close(d_input.get(r, c), numeric, abs_tol, rel_tol);
                }
            }
        }
    }

    #[test]
    fn train_step_records_last_loss_without_updating() {
        let mut net = small_net(Loss::MeanSquaredError, 2);
        let before = net.export_params();
        assert_eq!(net.last_loss(), None);

        let x = Matrix::from_array(&[[0.1, 0.2]]);
        let y = Matrix::from_array(&[[1.0, 0.0]]);
        let (loss, grads) = net.train_step(&x, &y);

        assert_eq!(net.last_loss(), Some(loss));
        assert_eq!(net.export_params(), before);
        assert_eq!(grads.num_layers(), 2);
        assert!(grads.global_norm() > 0.0);
    }

    #[test]
    fn predict_output_applies_softmax_for_cross_entropy() {
        let net = small_net(Loss::SoftmaxCrossEntropy, 3);
        let x = Matrix::from_array(&[[0.5, -0.5], [2.0, 1.0]]);
        let probs = net.predict_output(&x);
        for r in 0..probs.rows() {
            assert!((probs.row(r).sum() - 1.0).abs() < 1e-5);
        }
        let raw = small_net(Loss::MeanSquaredError, 3);
        assert_eq!(raw.predict_output(&x), raw.predict(&x));
    }

    #[test]
    fn evaluate_loss_rejects_mismatched_rows() {
        let net = small_net(Loss::MeanSquaredError, 0);
        let err = net
            .evaluate_loss(&Matrix::zeros(3, 2), &Matrix::zeros(2, 2))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    #[should_panic(expected = "does not match network input_dim")]
    fn forward_panics_on_input_width_mismatch() {
        let net = small_net(Loss::MeanSquaredError, 0);
        let _ = net.forward(&Matrix::zeros(1, 3));
    }
}
