//! Mini-batch training loop.
//!
//! Per epoch the trainer:
//! - permutes the training rows (per [`Shuffle`]),
//! - walks contiguous batches of `batch_size` rows (the last one may be shorter),
//! - runs forward/backward and one optimizer update per batch,
//! - every `eval_every` epochs, evaluates a metric on the evaluation split (or on the training
//!   split when the data source has none).
//!
//! Progress goes through the `log` facade; install any logger to see it.

use std::borrow::Cow;

use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{DataSource, Dataset, Error, LrSchedule, Matrix, Metric, Network, Optimizer, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How training rows are reordered at the start of every epoch.
pub enum Shuffle {
    /// Reproducible permutation from a seeded generator owned by the run.
    Seeded(u64),
    /// Permutation from OS entropy; runs differ.
    Random,
    /// Keep the original row order.
    None,
}

impl Default for Shuffle {
    fn default() -> Self {
        Shuffle::Seeded(0)
    }
}

impl Shuffle {
    fn rng(self) -> Option<StdRng> {
        match self {
            Shuffle::Seeded(seed) => Some(StdRng::seed_from_u64(seed)),
            Shuffle::Random => Some(StdRng::from_entropy()),
            Shuffle::None => None,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Evaluate after every `eval_every`-th epoch.
    pub eval_every: usize,
    pub shuffle: Shuffle,
    pub optimizer: Optimizer,
    pub lr_schedule: LrSchedule,
    /// Metric used by [`Trainer::fit`]; `fit_with` takes its own.
    pub metric: Metric,
    /// Log the batch loss at debug level every N steps (0 disables).
    pub log_every_steps: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            eval_every: 1,
            shuffle: Shuffle::default(),
            optimizer: Optimizer::default(),
            lr_schedule: LrSchedule::default(),
            metric: Metric::default(),
            log_every_steps: 0,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be > 0".to_owned()));
        }
        if self.eval_every == 0 {
            return Err(Error::InvalidConfig("eval_every must be > 0".to_owned()));
        }
        self.optimizer.validate()?;
        self.lr_schedule.validate()
    }
}

/// One evaluation checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// 1-based epoch after which the metric was computed.
    pub epoch: usize,
    pub metric: f32,
}

#[derive(Debug, Clone)]
pub struct FitReport {
    /// Loss of the last training batch.
    pub final_loss: f32,
    /// Optimizer steps taken.
    pub steps: usize,
    pub evals: Vec<EvalReport>,
    /// Trained parameters: weights then bias, layer by layer.
    pub params: Vec<Matrix>,
}

/// Drives training runs. Owns the step and epoch counters, which reset at the start of every
/// run.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: FitConfig,
    memo: Option<String>,
    steps: usize,
    epochs_completed: usize,
}

impl Trainer {
    pub fn new(config: FitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            memo: None,
            steps: 0,
            epochs_completed: 0,
        })
    }

    /// Attach a free-text note that is included in every log line of this trainer.
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    #[inline]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    #[inline]
    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    /// Optimizer steps taken by the current (or last) run.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    #[inline]
    pub fn epochs_completed(&self) -> usize {
        self.epochs_completed
    }

    /// Train with the configured [`Metric`] for evaluation.
    pub fn fit<D>(&mut self, network: &mut Network, data: &D) -> Result<FitReport>
    where
        D: DataSource + ?Sized,
    {
        let metric = self.config.metric;
        self.run(network, data, metric.name(), |net, x, y| {
            metric.evaluate(net, x, y)
        })
    }

    /// Train with a caller-supplied evaluation function `(network, inputs, targets) -> metric`.
    pub fn fit_with<D, F>(
        &mut self,
        network: &mut Network,
        data: &D,
        eval_fn: F,
    ) -> Result<FitReport>
    where
        D: DataSource + ?Sized,
        F: Fn(&Network, &Matrix, &Matrix) -> Result<f32>,
    {
        self.run(network, data, "custom metric", eval_fn)
    }

    fn run<D, F>(
        &mut self,
        network: &mut Network,
        data: &D,
        metric_name: &str,
        eval_fn: F,
    ) -> Result<FitReport>
    where
        D: DataSource + ?Sized,
        F: Fn(&Network, &Matrix, &Matrix) -> Result<f32>,
    {
        let train = data.train();
        let eval = data.eval().unwrap_or(train);
        validate_data(network, train, "train")?;
        validate_data(network, eval, "eval")?;

        let cfg = self.config;
        let mut optimizer = cfg.optimizer.state(network, cfg.lr_schedule)?;
        let mut rng = cfg.shuffle.rng();
        let tag = self.tag();

        self.steps = 0;
        self.epochs_completed = 0;

        info!(
            "{tag}training started: {} train rows, {} eval rows, batch_size={}, epochs={}, loss={}",
            train.len(),
            eval.len(),
            cfg.batch_size,
            cfg.epochs,
            network.loss().name()
        );

        let mut last_loss = f32::NAN;
        let mut last_lr = cfg.lr_schedule.rate(0);
        let mut warned_non_finite = false;
        let mut evals = Vec::new();

        for epoch in 1..=cfg.epochs {
            let epoch_data: Cow<'_, Dataset> = match rng.as_mut() {
                Some(rng) => Cow::Owned(train.permute(rng)),
                None => Cow::Borrowed(train),
            };

            let mut start = 0;
            while start < epoch_data.len() {
                let end = (start + cfg.batch_size).min(epoch_data.len());
                let (x, y) = epoch_data.batch(start..end);
                start = end;

                let (loss, grads) = network.train_step(&x, &y);
                last_lr = optimizer.update(network, &grads, self.steps);
                self.steps += 1;
                last_loss = loss;

                if !loss.is_finite() && !warned_non_finite {
                    warn!(
                        "{tag}non-finite training loss {loss} at epoch {epoch}, step {}",
                        self.steps
                    );
                    warned_non_finite = true;
                }
                if cfg.log_every_steps > 0 && self.steps.is_multiple_of(cfg.log_every_steps) {
                    debug!(
                        "{tag}step {} epoch {epoch}: batch loss {loss:.6}, lr {last_lr:.6}",
                        self.steps
                    );
                }
            }
            self.epochs_completed = epoch;

            if epoch.is_multiple_of(cfg.eval_every) {
                let metric = eval_fn(network, eval.inputs(), eval.targets())?;
                info!(
                    "{tag}epoch {epoch}/{}: eval {metric_name} {metric:.6}, lr {last_lr:.6}, train loss {last_loss:.6}",
                    cfg.epochs
                );
                evals.push(EvalReport { epoch, metric });
            }
        }

        info!(
            "{tag}training finished after {} steps: final batch loss {last_loss:.6}",
            self.steps
        );

        Ok(FitReport {
            final_loss: last_loss,
            steps: self.steps,
            evals,
            params: network.export_params(),
        })
    }

    fn tag(&self) -> String {
        match &self.memo {
            Some(memo) => format!("[{memo}] "),
            None => String::new(),
        }
    }
}

fn validate_data(network: &Network, data: &Dataset, split: &str) -> Result<()> {
    if data.is_empty() {
        return Err(Error::InvalidData(format!("{split} dataset must not be empty")));
    }
    network
        .check_batch(data.inputs(), data.targets())
        .map_err(|e| Error::InvalidData(format!("{split} dataset: {e}")))
}

impl Network {
    /// Train with a fresh [`Trainer`] built from `config`.
    ///
    /// This is a "batteries included" API; use [`Trainer`] directly for a memo or a custom
    /// evaluation function.
    pub fn fit<D>(&mut self, data: &D, config: FitConfig) -> Result<FitReport>
    where
        D: DataSource + ?Sized,
    {
        Trainer::new(config)?.fit(self, data)
    }
}
