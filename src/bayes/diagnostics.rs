//! Convergence diagnostics for multi-chain samplers.

/// Split potential scale reduction factor R̂.
///
/// Every chain is cut in half and the halves are treated as separate chains
/// (Gelman et al., *Bayesian Data Analysis*, 3rd ed., §11.4). Chains are
/// truncated to the shortest length.
///
/// Returns 1 when all draws are identical and `f64::INFINITY` when the
/// halves disagree but have no within-chain spread. Returns `f64::NAN` for
/// fewer than one chain or two draws per half.
pub fn split_r_hat(chains: &[Vec<f64>]) -> f64 {
    let len = chains.iter().map(Vec::len).min().unwrap_or(0);
    let half = len / 2;
    if chains.is_empty() || half < 2 {
        return f64::NAN;
    }

    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|c| [&c[..half], &c[len - half..len]])
        .collect();
    let m = halves.len() as f64;
    let n = half as f64;

    let means: Vec<f64> = halves.iter().map(|h| h.iter().sum::<f64>() / n).collect();
    let grand = means.iter().sum::<f64>() / m;
    let between = n / (m - 1.0) * means.iter().map(|&mu| (mu - grand).powi(2)).sum::<f64>();
    let within = halves
        .iter()
        .zip(&means)
        .map(|(h, &mu)| h.iter().map(|&x| (x - mu).powi(2)).sum::<f64>() / (n - 1.0))
        .sum::<f64>()
        / m;

    if within <= 0.0 {
        return if between <= 0.0 { 1.0 } else { f64::INFINITY };
    }
    let var_plus = (n - 1.0) / n * within + between / n;
    (var_plus / within).sqrt()
}

/// Effective sample size summed over chains.
pub fn effective_sample_size(chains: &[Vec<f64>]) -> f64 {
    chains.iter().map(|c| chain_ess(c)).sum()
}

/// ESS = N / (1 + 2 Σ_k ρ_k), truncated at the first ρ_k < 0.05 or lag 50.
fn chain_ess(chain: &[f64]) -> f64 {
    let n = chain.len();
    if n < 2 {
        return n as f64;
    }

    let mean: f64 = chain.iter().sum::<f64>() / n as f64;
    let var: f64 = chain.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    if var <= 0.0 {
        return n as f64;
    }

    let mut sum_rho = 0.0;
    for k in 1..=50.min(n / 2) {
        let rho = autocorrelation(chain, k, mean, var);
        if rho < 0.05 {
            break;
        }
        sum_rho += rho;
    }
    n as f64 / (1.0 + 2.0 * sum_rho)
}

fn autocorrelation(chain: &[f64], k: usize, mean: f64, var: f64) -> f64 {
    let n = chain.len();
    if k >= n {
        return 0.0;
    }
    let cov: f64 = (0..n - k)
        .map(|i| (chain[i] - mean) * (chain[i + k] - mean))
        .sum::<f64>()
        / (n - k) as f64;
    cov / var
}
