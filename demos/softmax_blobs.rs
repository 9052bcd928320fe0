use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rust_nn::{
    Activation, FitConfig, Init, Loss, LrSchedule, Matrix, Metric, NetworkBuilder, Optimizer,
    Shuffle, SimpleDataSource, Standardizer, Trainer, accuracy,
};

/// Three noisy 2D blobs with one-hot labels.
fn blobs(per_class: usize, rng: &mut StdRng) -> rust_nn::Result<(Matrix, Matrix)> {
    let centers = [[-1.0_f32, -1.0], [1.0, -1.0], [0.0, 1.0]];
    let mut xs = Vec::with_capacity(centers.len() * per_class);
    let mut ys = Vec::with_capacity(centers.len() * per_class);
    for (class, center) in centers.iter().enumerate() {
        for _ in 0..per_class {
            xs.push(vec![
                center[0] + rng.gen_range(-0.4..0.4),
                center[1] + rng.gen_range(-0.4..0.4),
            ]);
            let mut one_hot = vec![0.0_f32; centers.len()];
            one_hot[class] = 1.0;
            ys.push(one_hot);
        }
    }
    Ok((Matrix::from_rows(&xs)?, Matrix::from_rows(&ys)?))
}

fn main() -> rust_nn::Result<()> {
    let mut rng = StdRng::seed_from_u64(240514);
    let (mut x_train, y_train) = blobs(128, &mut rng)?;
    let (mut x_test, y_test) = blobs(32, &mut rng)?;

    // Scale both splits with statistics from the training inputs only.
    let scaler = Standardizer::fit(&x_train)?;
    scaler.apply(&mut x_train);
    scaler.apply(&mut x_test);
    println!("standardized with mean={:.3} std={:.3}", scaler.mean(), scaler.std());

    let data = SimpleDataSource::new(x_train, y_train, x_test, y_test)?;

    let mut net = NetworkBuilder::new(2)?
        .add_layer_with_init(16, Activation::Tanh, Init::Glorot)?
        .add_layer_with_init(3, Activation::Linear, Init::Glorot)?
        .loss(Loss::SoftmaxCrossEntropy)
        .build_with_seed(240514)?;

    let epochs = 10;
    let batch_size = 32;
    let steps = epochs * 384 / batch_size;
    let mut trainer = Trainer::new(FitConfig {
        epochs,
        batch_size,
        eval_every: 1,
        shuffle: Shuffle::Seeded(0),
        optimizer: Optimizer::SgdMomentum { momentum: 0.9 },
        lr_schedule: LrSchedule::decay_between(0.19, 0.05, steps)?,
        metric: Metric::Accuracy,
        log_every_steps: 0,
    })?
    .with_memo("blobs");

    let report = trainer.fit_with(&mut net, &data, |net, x, y| {
        accuracy(&net.predict_output(x), y)
    })?;

    for eval in &report.evals {
        println!("epoch {:>2}: test accuracy={:.3}", eval.epoch, eval.metric);
    }
    println!("final batch loss={:.4} after {} steps", report.final_loss, report.steps);
    Ok(())
}
