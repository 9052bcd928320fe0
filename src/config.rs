//! JSON training configuration (feature: `serde`).
//!
//! A [`TrainingConfig`] bundles a network definition with the fit settings, so a whole run can
//! be described in one file:
//!
//! ```json
//! {
//!   "network": {
//!     "input_dim": 2,
//!     "layers": [
//!       { "out_dim": 4, "activation": { "kind": "sigmoid" }, "init": { "kind": "glorot" } },
//!       { "out_dim": 1 }
//!     ],
//!     "loss": "mean_squared_error"
//!   },
//!   "fit": {
//!     "epochs": 100,
//!     "batch_size": 17,
//!     "optimizer": { "kind": "sgd_momentum", "momentum": 0.9 },
//!     "lr_schedule": { "kind": "constant", "lr": 0.0015 },
//!     "shuffle": { "seeded": 7 }
//!   }
//! }
//! ```
//!
//! Omitted `fit` fields take their [`FitConfig::default`] values; omitted layer activations and
//! initializers take `Linear` and `Random`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, FitConfig, NetworkBuilder, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub network: NetworkBuilder,
    #[serde(default)]
    pub fit: FitConfig,
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.fit.validate()
    }

    /// Parse and validate a config from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: TrainingConfig = serde_json::from_str(s)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a config from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("failed to serialize config: {e}")))
    }
}
