// Summary statistics over per-frame feature tracks

/// Population mean and standard deviation; (0.0, 0.0) for an empty input
pub fn mean_std<I>(values: I) -> (f32, f32)
where
    I: IntoIterator<Item = f32>,
{
    // Accumulate in f64 so long clips don't lose precision
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for value in values {
        let v = value as f64;
        count += 1;
        sum += v;
        sum_sq += v * v;
    }

    if count == 0 {
        return (0.0, 0.0);
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
    (mean as f32, variance.sqrt() as f32)
}
