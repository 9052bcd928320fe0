//! Network builder.
//!
//! `NetworkBuilder` is the recommended way to define a network. It makes the structure explicit:
//! the input width, then an ordered list of `(out_dim, activation, init)` layer specs, then the
//! loss. Each spec's input width is the previous layer's `out_dim`.
//!
//! The builder is plain data, so with the `serde` feature it can be deserialized as part of a
//! training config (see `config`).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Activation, Error, Init, Layer, Loss, Network, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
/// One dense layer of a [`NetworkBuilder`].
pub struct LayerSpec {
    pub out_dim: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub activation: Activation,
    #[cfg_attr(feature = "serde", serde(default))]
    pub init: Init,
}

impl LayerSpec {
    pub fn new(out_dim: usize, activation: Activation, init: Init) -> Self {
        Self {
            out_dim,
            activation,
            init,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.out_dim == 0 {
            return Err(Error::InvalidConfig("layer out_dim must be > 0".to_owned()));
        }
        self.init.validate()
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
/// Builder for a [`Network`].
///
/// Example:
///
/// ```rust
/// use rust_nn::{Activation, Init, Loss, NetworkBuilder};
///
/// # fn main() -> rust_nn::Result<()> {
/// let net = NetworkBuilder::new(2)?
///     .add_layer_with_init(4, Activation::Sigmoid, Init::Glorot)?
///     .add_layer(1, Activation::Linear)?
///     .loss(Loss::MeanSquaredError)
///     .build_with_seed(0)?;
/// assert_eq!(net.num_layers(), 2);
/// # Ok(())
/// # }
/// ```
pub struct NetworkBuilder {
    input_dim: usize,
    layers: Vec<LayerSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    loss: Loss,
}

impl NetworkBuilder {
    /// Start building a network that accepts inputs of width `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            layers: Vec::new(),
            loss: Loss::default(),
        })
    }

    /// Convenience constructor from a full list of layer specs.
    pub fn from_specs(input_dim: usize, specs: &[LayerSpec], loss: Loss) -> Result<Self> {
        let mut b = Self::new(input_dim)?.loss(loss);
        for spec in specs {
            b = b.add_spec(*spec)?;
        }
        Ok(b)
    }

    /// Add a dense layer with the default initializer ([`Init::Random`]).
    pub fn add_layer(self, out_dim: usize, activation: Activation) -> Result<Self> {
        self.add_layer_with_init(out_dim, activation, Init::default())
    }

    /// Add a dense layer with an explicit initializer.
    pub fn add_layer_with_init(
        self,
        out_dim: usize,
        activation: Activation,
        init: Init,
    ) -> Result<Self> {
        self.add_spec(LayerSpec::new(out_dim, activation, init))
    }

    pub fn add_spec(mut self, spec: LayerSpec) -> Result<Self> {
        spec.validate()?;
        self.layers.push(spec);
        Ok(self)
    }

    /// Set the loss the network will be trained against.
    pub fn loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// Check the whole definition. Deserialized builders skip the per-call checks, so this runs
    /// again before every build.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        if self.layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }
        for (idx, spec) in self.layers.iter().enumerate() {
            spec.validate()
                .map_err(|e| Error::InvalidConfig(format!("layer {idx}: {e}")))?;
        }
        Ok(())
    }

    /// Build using a deterministic seed.
    pub fn build_with_seed(&self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Build with OS entropy; results differ from run to run.
    pub fn build(&self) -> Result<Network> {
        self.build_with_rng(&mut rand::thread_rng())
    }

    /// Build using the provided RNG. Layers draw their parameters in order, weights before bias.
    pub fn build_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Network> {
        self.validate()?;

        let mut layers = Vec::with_capacity(self.layers.len());
        let mut in_dim = self.input_dim;
        for spec in &self.layers {
            let layer = Layer::new_with_rng(in_dim, spec.out_dim, spec.init, spec.activation, rng)?;
            layers.push(layer);
            in_dim = spec.out_dim;
        }

        Network::new(layers, self.loss)
    }
}
