// monitor-common/src/analysis/stats.rs
// Numerical helpers. Everything here is pure and works on plain slices.

/// Trading days per year, used to annualize daily volatility.
pub const TRADING_DAYS: f64 = 252.0;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with divisor `n`.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Z-score of `current` within `history ++ [current]`.
///
/// `None` when the combined series has zero spread or the result is not finite.
pub fn zscore_of_last(history: &[f64], current: f64) -> Option<f64> {
    let mut values = Vec::with_capacity(history.len() + 1);
    values.extend_from_slice(history);
    values.push(current);

    let m = mean(&values)?;
    let std = population_std(&values)?;
    if std == 0.0 || !std.is_finite() {
        return None;
    }

    let z = (current - m) / std;
    z.is_finite().then_some(z)
}

/// Simple returns `(p[i] - p[i-1]) / p[i-1]`. Length is `prices.len() - 1`.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

pub fn diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Population std of `returns` scaled by `sqrt(252)`.
pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    if returns.iter().any(|r| !r.is_finite()) {
        return None;
    }
    population_std(returns).map(|s| s * TRADING_DAYS.sqrt())
}

/// Pearson correlation. `None` for mismatched lengths, fewer than two points,
/// zero variance on either side or non-finite input.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }

    let ma = mean(a)?;
    let mb = mean(b)?;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - ma;
        let dy = y - mb;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }

    let r = cov / (var_a.sqrt() * var_b.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Linear-interpolated percentile, `q` in `[0, 100]`.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * weight)
}

/// Percentile rank of `score` within `values`, in `[0, 100]`.
///
/// Ties are averaged: the rank is the mean of the strict and weak positions.
pub fn percentile_of_score(values: &[f64], score: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let left = values.iter().filter(|&&v| v < score).count() as f64;
    let right = values.iter().filter(|&&v| v <= score).count() as f64;
    let plus_one = if left < right { 1.0 } else { 0.0 };

    Some((left + right + plus_one) * (50.0 / n))
}

/// Least-squares slope of `data` against its index.
pub fn linear_slope(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    if data.len() < 2 {
        return 0.0;
    }

    let x_mean = (n - 1.0) / 2.0;
    let y_mean: f64 = data.iter().sum::<f64>() / n;
    let (mut num, mut den) = (0.0, 0.0);
    for (i, &y) in data.iter().enumerate() {
        num += (i as f64 - x_mean) * (y - y_mean);
        den += (i as f64 - x_mean).powi(2);
    }

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_population_std() {
        let std = population_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!(approx(std, 2.0));
        assert_eq!(population_std(&[]), None);
    }

    #[test]
    fn test_zscore_constant_series_is_none() {
        assert_eq!(zscore_of_last(&[100.0; 30], 100.0), None);
    }

    #[test]
    fn test_zscore_includes_current() {
        // [0, 0, 0, 4]: mean 1, std sqrt(3)
        let z = zscore_of_last(&[0.0, 0.0, 0.0], 4.0).unwrap();
        assert!(approx(z, 3.0 / 3f64.sqrt()));
    }

    #[test]
    fn test_pearson() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!(approx(pearson(&a, &b).unwrap(), 1.0));
        assert!(approx(pearson(&a, &c).unwrap(), -1.0));
        assert_eq!(pearson(&a, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson(&a, &b[..3]), None);
    }

    #[test]
    fn test_percentile_linear() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx(percentile(&values, 50.0).unwrap(), 3.0));
        assert!(approx(percentile(&values, 5.0).unwrap(), 1.2));
        assert!(approx(percentile(&values, 100.0).unwrap(), 5.0));
    }

    #[test]
    fn test_percentile_of_score_ties() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!(approx(percentile_of_score(&values, 3.0).unwrap(), 75.0));
        assert!(approx(percentile_of_score(&values, 0.0).unwrap(), 0.0));
        assert!(approx(percentile_of_score(&values, 10.0).unwrap(), 100.0));
        assert!(approx(percentile_of_score(&values, 2.5).unwrap(), 50.0));
    }

    #[test]
    fn test_returns_and_slope() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert!(approx(r[0], 0.1));
        assert!(approx(r[1], -0.1));
        assert!(approx(linear_slope(&[1.0, 2.0, 3.0]), 1.0));
        assert_eq!(linear_slope(&[5.0]), 0.0);
    }
}
