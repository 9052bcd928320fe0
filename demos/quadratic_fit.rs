use rust_nn::{
    Activation, DataSource, FitConfig, FunctionDataSource, LrSchedule, Matrix, NetworkBuilder,
    Shuffle,
};

fn main() -> rust_nn::Result<()> {
    // f(x) = 2*x0^2 - 6*x1 + 4.5, fitted with one small sigmoid hidden layer.
    let arguments = Matrix::from_array(&[
        [1.0, 2.0],
        [2.0, 3.0],
        [3.0, 4.0],
        [4.0, 5.0],
        [5.0, 6.0],
        [0.0, 0.0],
        [-2.0, -6.0],
        [-3.0, -2.0],
        [1.0, 6.0],
        [-3.0, 0.0],
        [3.0, 0.0],
        [-2.0, 0.0],
        [-2.5, 1.0],
        [-4.0, 5.0],
        [-5.0, 7.0],
        [-1.0, 3.0],
        [-3.0, 1.0],
    ]);
    let data = FunctionDataSource::new(arguments, |x| 2.0 * x[0] * x[0] - 6.0 * x[1] + 4.5, 0.0)?;

    let mut net = NetworkBuilder::new(2)?
        .add_layer(4, Activation::Sigmoid)?
        .add_layer(1, Activation::Linear)?
        .build_with_seed(0)?;
    println!("parameters: {}", net.parameter_count());

    let report = net.fit(
        &data,
        FitConfig {
            epochs: 39_500,
            batch_size: 17,
            eval_every: 2_500,
            shuffle: Shuffle::None,
            lr_schedule: LrSchedule::constant(0.0015),
            ..FitConfig::default()
        },
    )?;

    for eval in &report.evals {
        println!("epoch {:>6}: mse={:.4}", eval.epoch, eval.metric);
    }

    let train = data.train();
    let pred = net.predict(train.inputs());
    for r in 0..train.len() {
        println!(
            "x=({:>4}, {:>4})  target={:>7.2}  pred={:>7.2}",
            train.inputs().get(r, 0),
            train.inputs().get(r, 1),
            train.targets().get(r, 0),
            pred.get(r, 0)
        );
    }
    Ok(())
}
