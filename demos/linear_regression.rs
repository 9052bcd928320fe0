use rust_nn::{Activation, FitConfig, FunctionDataSource, LrSchedule, Matrix, NetworkBuilder, Shuffle};

fn main() -> rust_nn::Result<()> {
    // Learn f(x) = -x0 - x1 with a single linear unit.
    let arguments = Matrix::from_array(&[[1.0, 2.0], [2.0, 3.0], [3.0, 4.0]]);
    let data = FunctionDataSource::new(arguments, |x| -x[0] - x[1], 0.0)?;

    let mut net = NetworkBuilder::new(2)?
        .add_layer(1, Activation::Linear)?
        .build_with_seed(0)?;

    let report = net.fit(
        &data,
        FitConfig {
            epochs: 1500,
            batch_size: 3,
            eval_every: 500,
            shuffle: Shuffle::None,
            lr_schedule: LrSchedule::constant(0.01),
            ..FitConfig::default()
        },
    )?;

    for eval in &report.evals {
        println!("epoch {:>5}: loss={:.6}", eval.epoch, eval.metric);
    }
    println!("weights:\n{}", report.params[0]);
    println!("bias: {}", report.params[1]);
    println!("last batch loss: {:?}", net.last_loss());

    let probe = Matrix::from_array(&[[4.0, 5.0]]);
    println!("f(4, 5) ~ {}", net.predict(&probe).get(0, 0));
    Ok(())
}
