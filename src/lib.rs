//! A from-scratch neural network engine.
//!
//! `rust-nn` implements a dense feed-forward network on top of a small row-major matrix type,
//! with hand-derived backpropagation (no autodiff graph), mean-squared-error and softmax
//! cross-entropy losses, SGD / momentum optimizers with learning-rate schedules, and a
//! mini-batch training loop.
//!
//! # Design goals
//!
//! - Correctness first: every operation returns a fresh [`Matrix`]; the only in-place helpers
//!   are the ones [`Standardizer`] uses to pre-scale datasets.
//! - Explicit state: forward passes return a [`ForwardPass`] that the matching backward pass
//!   consumes, and randomness always comes from an RNG handle the caller provides (or a seed).
//! - Small closed sets of building blocks: [`Activation`], [`Loss`], [`Init`], [`Optimizer`],
//!   [`LrSchedule`] are plain enums.
//!
//! # Panics vs `Result`
//!
//! This crate exposes two layers of API:
//!
//! - Low-level numerical primitives (panic on misuse):
//!   - [`Matrix`] arithmetic, [`Layer::forward`], [`Layer::backward`]
//!   - [`Network::forward`], [`Network::backward`], [`Loss::backward`]
//!     Shape mismatches are programmer error and panic via `assert!`.
//!
//! - High-level APIs (validated):
//!   - [`NetworkBuilder`], [`Dataset`] constructors, [`Trainer::fit`], [`Network::fit`],
//!     [`Metric::evaluate`]
//!     These validate inputs and return [`Result`].
//!
//! # Shapes
//!
//! - Scalars are `f32`; matrices are rank 2 and row-major.
//! - A batch is `(batch_size, features)`: one sample per row.
//! - Layer weights are `(in_dim, out_dim)`, biases `(1, out_dim)` broadcast over rows.
//!
//! # Quick start
//!
//! ```rust
//! use rust_nn::{
//!     Activation, Dataset, FitConfig, Init, LrSchedule, Loss, NetworkBuilder, Optimizer, Shuffle,
//! };
//!
//! # fn main() -> rust_nn::Result<()> {
//! let xs: Vec<Vec<f32>> = (0..16).map(|i| vec![i as f32 / 16.0, (i % 4) as f32 / 4.0]).collect();
//! let ys: Vec<Vec<f32>> = xs.iter().map(|x| vec![x[0] - x[1]]).collect();
//! let train = Dataset::from_rows(&xs, &ys)?;
//!
//! let mut net = NetworkBuilder::new(2)?
//!     .add_layer_with_init(8, Activation::Tanh, Init::Glorot)?
//!     .add_layer(1, Activation::Linear)?
//!     .loss(Loss::MeanSquaredError)
//!     .build_with_seed(0)?;
//!
//! let report = net.fit(
//!     &train,
//!     FitConfig {
//!         epochs: 50,
//!         batch_size: 4,
//!         shuffle: Shuffle::Seeded(0),
//!         optimizer: Optimizer::SgdMomentum { momentum: 0.9 },
//!         lr_schedule: LrSchedule::constant(0.05),
//!         ..FitConfig::default()
//!     },
//! )?;
//! assert_eq!(report.steps, 50 * 4);
//! assert_eq!(report.params.len(), 4);
//! # Ok(())
//! # }
//! ```
//!
//! # Driving training yourself
//!
//! ```rust
//! use rust_nn::{Activation, LrSchedule, Matrix, NetworkBuilder, Optimizer};
//!
//! # fn main() -> rust_nn::Result<()> {
//! let mut net = NetworkBuilder::new(3)?
//!     .add_layer(4, Activation::Sigmoid)?
//!     .add_layer(2, Activation::Linear)?
//!     .build_with_seed(0)?;
//! let mut opt = Optimizer::Sgd.state(&net, LrSchedule::constant(0.01))?;
//!
//! let x = Matrix::from_array(&[[0.1, -0.2, 0.3]]);
//! let t = Matrix::from_array(&[[0.0, 1.0]]);
//!
//! let pass = net.forward(&x);
//! let (_loss, d_output) = net.loss().backward(pass.output(), &t);
//! let (grads, _d_input) = net.backward(pass, &d_output);
//! opt.update(&mut net, &grads, 0);
//! # Ok(())
//! # }
//! ```
//!
//! # MSRV
//!
//! This crate's minimum supported Rust version (MSRV) is specified in `Cargo.toml`.

pub mod activation;
pub mod builder;
#[cfg(feature = "serde")]
pub mod config;
pub mod data;
pub mod error;
pub mod init;
pub mod layer;
pub mod loss;
pub(crate) mod matmul;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod optim;
pub mod schedule;
pub mod train;

pub use activation::Activation;
pub use builder::{LayerSpec, NetworkBuilder};
#[cfg(feature = "serde")]
pub use config::TrainingConfig;
pub use data::{
    DataSource, Dataset, FunctionDataSource, SimpleDataSource, Standardizer, permutation,
};
pub use error::{Error, Result};
pub use init::Init;
pub use layer::{Layer, LayerCache, LayerGradients};
pub use loss::Loss;
pub use matrix::{Axis, Matrix};
pub use metrics::{Metric, accuracy};
pub use network::{ForwardPass, Gradients, Network};
pub use optim::{Optimizer, OptimizerState};
pub use schedule::LrSchedule;
pub use train::{EvalReport, FitConfig, FitReport, Shuffle, Trainer};
