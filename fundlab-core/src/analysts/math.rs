//! Shared analyst math — standalone pure functions over close series.

/// Simple return over the trailing `window` closes (last vs first of the
/// window). `None` when fewer than `window + 1` closes exist or the base
/// is non-positive.
pub fn trailing_return(closes: &[f64], window: usize) -> Option<f64> {
    if closes.len() < window + 1 {
        return None;
    }
    let last = *closes.last()?;
    let base = closes[closes.len() - 1 - window];
    if base <= 0.0 {
        return None;
    }
    Some(last / base - 1.0)
}

/// Arithmetic mean of the trailing `window` closes.
pub fn moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Standard deviation of daily returns over the trailing `window` returns.
pub fn realized_volatility(closes: &[f64], window: usize) -> Option<f64> {
    if closes.len() < window + 1 {
        return None;
    }
    let tail = &closes[closes.len() - window - 1..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    Some(var.sqrt())
}

/// Discount of the last close from the trailing high: 0.15 means the price
/// sits 15% below the highest close in the window.
pub fn discount_from_high(closes: &[f64], window: usize) -> Option<f64> {
    if closes.is_empty() {
        return None;
    }
    let start = closes.len().saturating_sub(window);
    let high = closes[start..].iter().copied().fold(f64::MIN, f64::max);
    if high <= 0.0 {
        return None;
    }
    Some(1.0 - closes.last()? / high)
}
