// Exact t-SNE down to two dimensions.
//
// Rows are processed in parallel with rayon, but every reduction is done per row
// and then summed sequentially, so a given seed gives the same layout whatever
// the thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::config::SimilaritySettings;

const ENTROPY_TOLERANCE: f64 = 1e-5;
const MAX_BINARY_SEARCH_STEPS: usize = 100;
const MIN_GAIN: f64 = 0.01;
const MIN_PROBABILITY: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct TsneParams {
    pub perplexity: f64,
    pub iterations: usize,
    pub learning_rate: f64,
    pub early_exaggeration: f64,
    pub seed: u64,
}

impl Default for TsneParams {
    fn default() -> Self {
        TsneParams::from(&SimilaritySettings::default())
    }
}

impl From<&SimilaritySettings> for TsneParams {
    fn from(settings: &SimilaritySettings) -> Self {
        TsneParams {
            perplexity: settings.perplexity,
            iterations: settings.iterations,
            learning_rate: settings.learning_rate,
            early_exaggeration: settings.early_exaggeration,
            seed: settings.seed,
        }
    }
}

fn min_rows_per_task(n: usize) -> usize {
    (n / num_cpus::get().max(1)).max(1)
}

/// Row-major n x n squared euclidean distances
fn squared_distances(data: &[Vec<f64>]) -> Vec<f64> {
    let n = data.len();
    let mut d2 = vec![0.0; n * n];
    d2.par_chunks_mut(n)
        .with_min_len(min_rows_per_task(n))
        .enumerate()
        .for_each(|(i, row)| {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = data[i]
                    .iter()
                    .zip(&data[j])
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
            }
        });
    d2
}

/// Conditional probabilities p(j|i) for one row, with the gaussian bandwidth
/// binary-searched so the row's entropy matches ln(perplexity)
fn row_affinities(distances: &[f64], i: usize, target_entropy: f64) -> Vec<f64> {
    let n = distances.len();
    let mut p = vec![0.0; n];
    if n < 2 {
        return p;
    }

    // shift by the nearest distance so exp() does not underflow for far-off rows
    let d_min = distances
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(_, &d)| d)
        .fold(f64::INFINITY, f64::min);

    let mut beta = 1.0;
    let mut beta_min = 0.0;
    let mut beta_max = f64::INFINITY;

    for _ in 0..MAX_BINARY_SEARCH_STEPS {
        let mut sum = 0.0;
        let mut weighted = 0.0;
        for (j, &d) in distances.iter().enumerate() {
            if j == i {
                p[j] = 0.0;
                continue;
            }
            let shifted = d - d_min;
            let v = (-shifted * beta).exp();
            p[j] = v;
            sum += v;
            weighted += shifted * v;
        }

        let entropy = sum.ln() + beta * weighted / sum;
        let diff = entropy - target_entropy;
        if diff.abs() < ENTROPY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() { beta * 2.0 } else { (beta + beta_max) / 2.0 };
        } else {
            beta_max = beta;
            beta = (beta + beta_min) / 2.0;
        }
    }

    let sum: f64 = p.iter().sum();
    if sum > 0.0 {
        p.iter_mut().for_each(|v| *v /= sum);
    }
    p
}

/// Symmetric joint probabilities P = (P_cond + P_cond^T) / 2n
fn joint_probabilities(data: &[Vec<f64>], perplexity: f64) -> Vec<f64> {
    let n = data.len();
    let d2 = squared_distances(data);
    let target_entropy = perplexity.ln();

    let mut conditional = vec![0.0; n * n];
    conditional
        .par_chunks_mut(n)
        .with_min_len(min_rows_per_task(n))
        .enumerate()
        .for_each(|(i, row)| {
            row.copy_from_slice(&row_affinities(&d2[i * n..(i + 1) * n], i, target_entropy));
        });

    let mut joint = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                joint[i * n + j] =
                    ((conditional[i * n + j] + conditional[j * n + i]) / (2.0 * n as f64)).max(MIN_PROBABILITY);
            }
        }
    }
    joint
}

/// Standard normal sample (Box-Muller)
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Embed `data` (one feature vector per row) into the plane
pub fn embed(data: &[Vec<f64>], params: &TsneParams) -> Vec<[f64; 2]> {
    let n = data.len();
    if n < 2 {
        return vec![[0.0, 0.0]; n];
    }

    // perplexity has to stay well below the number of neighbours
    let perplexity = params.perplexity.min((n - 1) as f64 / 3.0).max(1.0);
    debug!("Embedding {} rows with perplexity {:.2}", n, perplexity);
    let p = joint_probabilities(data, perplexity);

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut y: Vec<[f64; 2]> = (0..n)
        .map(|_| [gaussian(&mut rng) * 1e-4, gaussian(&mut rng) * 1e-4])
        .collect();
    let mut velocity = vec![[0.0f64; 2]; n];
    let mut gains = vec![[1.0f64; 2]; n];

    let exaggeration_phase = (params.iterations / 4).min(250);
    let mut kernel = vec![0.0; n * n];

    for iteration in 0..params.iterations {
        let (exaggeration, momentum) = if iteration < exaggeration_phase {
            (params.early_exaggeration, 0.5)
        } else {
            (1.0, 0.8)
        };

        // student-t kernel 1 / (1 + |yi - yj|^2)
        kernel
            .par_chunks_mut(n)
            .with_min_len(min_rows_per_task(n))
            .enumerate()
            .for_each(|(i, row)| {
                for (j, cell) in row.iter_mut().enumerate() {
                    *cell = if i == j {
                        0.0
                    } else {
                        let dx = y[i][0] - y[j][0];
                        let dy = y[i][1] - y[j][1];
                        1.0 / (1.0 + dx * dx + dy * dy)
                    };
                }
            });
        let row_sums: Vec<f64> = kernel.par_chunks(n).map(|row| row.iter().sum()).collect();
        let z: f64 = row_sums.iter().sum::<f64>().max(f64::MIN_POSITIVE);

        let gradient: Vec<[f64; 2]> = (0..n)
            .into_par_iter()
            .with_min_len(min_rows_per_task(n))
            .map(|i| {
                let mut g = [0.0, 0.0];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let k = kernel[i * n + j];
                    let force = (exaggeration * p[i * n + j] - k / z) * k;
                    g[0] += 4.0 * force * (y[i][0] - y[j][0]);
                    g[1] += 4.0 * force * (y[i][1] - y[j][1]);
                }
                g
            })
            .collect();

        for i in 0..n {
            for d in 0..2 {
                let same_direction = (gradient[i][d] > 0.0) == (velocity[i][d] > 0.0);
                gains[i][d] = if same_direction { gains[i][d] * 0.8 } else { gains[i][d] + 0.2 };
                gains[i][d] = gains[i][d].max(MIN_GAIN);
                velocity[i][d] = momentum * velocity[i][d] - params.learning_rate * gains[i][d] * gradient[i][d];
                y[i][d] += velocity[i][d];
            }
        }

        let mean_x = y.iter().map(|v| v[0]).sum::<f64>() / n as f64;
        let mean_y = y.iter().map(|v| v[1]).sum::<f64>() / n as f64;
        for v in y.iter_mut() {
            v[0] -= mean_x;
            v[1] -= mean_y;
        }
    }

    y
}

/// Row-major n x n euclidean distances between embedded points
pub fn pairwise_distances(points: &[[f64; 2]]) -> Vec<f64> {
    let n = points.len();
    let mut out = vec![0.0; n * n];
    out.par_chunks_mut(n.max(1))
        .with_min_len(min_rows_per_task(n))
        .enumerate()
        .for_each(|(i, row)| {
            for (j, cell) in row.iter_mut().enumerate() {
                let dx = points[i][0] - points[j][0];
                let dy = points[i][1] - points[j][1];
                *cell = (dx * dx + dy * dy).sqrt();
            }
        });
    out
}
