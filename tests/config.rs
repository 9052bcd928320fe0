#![cfg(feature = "serde")]

use std::io::Write;

use rust_nn::{Dataset, Error, Shuffle, TrainingConfig};

const RUN: &str = r#"{
    "network": {
        "input_dim": 2,
        "layers": [
            { "out_dim": 3, "activation": { "kind": "tanh" }, "init": { "kind": "glorot" } },
            { "out_dim": 1 }
        ]
    },
    "fit": {
        "epochs": 20,
        "batch_size": 4,
        "lr_schedule": { "kind": "constant", "lr": 0.05 },
        "shuffle": { "seeded": 3 }
    }
}"#;

#[test]
fn loads_a_config_file_and_trains_from_it() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(RUN.as_bytes()).unwrap();

    let cfg = TrainingConfig::load_json(file.path()).unwrap();
    assert_eq!(cfg.fit.shuffle, Shuffle::Seeded(3));
    assert_eq!(cfg.fit.batch_size, 4);

    let xs: Vec<Vec<f32>> = (0..8).map(|i| vec![i as f32 / 8.0, 1.0 - i as f32 / 8.0]).collect();
    let ys: Vec<Vec<f32>> = xs.iter().map(|x| vec![x[0] - 0.5 * x[1]]).collect();
    let data = Dataset::from_rows(&xs, &ys).unwrap();

    let mut net = cfg.network.build_with_seed(0).unwrap();
    let before = net.evaluate_loss(data.inputs(), data.targets()).unwrap();
    let report = net.fit(&data, cfg.fit).unwrap();
    assert_eq!(report.steps, 20 * 2);
    assert_eq!(report.evals.len(), 20);
    assert!(report.final_loss.is_finite());
    let after = net.evaluate_loss(data.inputs(), data.targets()).unwrap();
    assert!(after < before, "loss went from {before} to {after}");
}

#[test]
fn saved_config_loads_back_unchanged() {
    let cfg = TrainingConfig::from_json_str(RUN).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");
    std::fs::write(&path, cfg.to_json_string_pretty().unwrap()).unwrap();

    assert_eq!(TrainingConfig::load_json(&path).unwrap(), cfg);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TrainingConfig::load_json(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)), "{err}");
}
