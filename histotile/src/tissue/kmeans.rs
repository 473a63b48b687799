//! K-means clustering of RGB samples with k-means++ seeding.

use glam::DVec3;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::KMeansConfig;

/// Result of the best k-means run.
#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centers: Vec<DVec3>,
    /// Sum of squared distances of samples to their nearest center.
    pub inertia: f64,
    pub iterations: usize,
}

/// Cluster `points` into `k` groups, keeping the run with the lowest inertia.
///
/// `points` must hold at least `k` samples.
pub fn kmeans(
    points: &[DVec3],
    k: usize,
    config: &KMeansConfig,
    seed: Option<u64>,
) -> KMeansResult {
    assert!(k > 0, "k must be positive");
    assert!(
        points.len() >= k,
        "need at least {k} points, got {}",
        points.len()
    );

    let mut rng: ChaCha8Rng = match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };

    let tolerance = config.tolerance * mean_variance(points);

    let mut run = || {
        let centers = init_plus_plus(points, k, &mut rng);
        lloyd(points, centers, config.max_iterations, tolerance)
    };

    let mut best = run();
    for _ in 1..config.restarts {
        let result = run();
        if result.inertia < best.inertia {
            best = result;
        }
    }
    best
}

/// Mean of the per-channel variances.
fn mean_variance(points: &[DVec3]) -> f64 {
    let n = points.len() as f64;
    let mean = points.iter().copied().sum::<DVec3>() / n;
    let var = points
        .iter()
        .map(|&p| (p - mean) * (p - mean))
        .sum::<DVec3>()
        / n;
    var.element_sum() / 3.0
}

/// k-means++ seeding: each new center is drawn with probability proportional
/// to the squared distance to the closest center chosen so far.
fn init_plus_plus(points: &[DVec3], k: usize, rng: &mut ChaCha8Rng) -> Vec<DVec3> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.random_range(0..points.len())]);

    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| p.distance_squared(centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = points.len() - 1;
            for (i, &d) in closest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // All samples coincide with a center already.
            rng.random_range(0..points.len())
        };

        let center = points[next];
        centers.push(center);
        for (d, p) in closest.iter_mut().zip(points) {
            *d = d.min(p.distance_squared(center));
        }
    }

    centers
}

fn nearest(point: DVec3, centers: &[DVec3]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = point.distance_squared(*c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn lloyd(
    points: &[DVec3],
    mut centers: Vec<DVec3>,
    max_iterations: usize,
    tolerance: f64,
) -> KMeansResult {
    let k = centers.len();
    let mut assignments: Vec<(usize, f64)> = Vec::with_capacity(points.len());
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;

        assignments.clear();
        assignments.par_extend(points.par_iter().map(|&p| nearest(p, &centers)));

        let mut sums = vec![DVec3::ZERO; k];
        let mut counts = vec![0usize; k];
        for (p, &(cluster, _)) in points.iter().zip(&assignments) {
            sums[cluster] += *p;
            counts[cluster] += 1;
        }

        let mut new_centers: Vec<DVec3> = sums
            .iter()
            .zip(&counts)
            .zip(&centers)
            .map(|((&sum, &count), &old)| if count > 0 { sum / count as f64 } else { old })
            .collect();

        // An empty cluster takes over the sample farthest from its center.
        for cluster in (0..k).filter(|&c| counts[c] == 0) {
            let farthest = assignments
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.1.total_cmp(&b.1.1))
                .map(|(i, _)| i);
            if let Some(far) = farthest {
                new_centers[cluster] = points[far];
                assignments[far].1 = 0.0;
            }
        }

        let shift: f64 = centers
            .iter()
            .zip(&new_centers)
            .map(|(a, b)| a.distance_squared(*b))
            .sum();
        centers = new_centers;

        if shift <= tolerance {
            break;
        }
    }

    // Sequential so the sum does not depend on work splitting.
    let inertia = points.iter().map(|&p| nearest(p, &centers).1).sum();

    KMeansResult {
        centers,
        inertia,
        iterations,
    }
}
