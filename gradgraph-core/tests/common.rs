use gradgraph_core::Matrix;
use rand::Rng;

// Shared by several test crates; each one uses only part of it.
#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn random_matrix<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Matrix<f64> {
    let data = (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Matrix::new(data, rows, cols).expect("Random matrix creation failed")
}
