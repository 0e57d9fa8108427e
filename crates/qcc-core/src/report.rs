use qcc_training::ValidationOutput;

/// Renders the final report line, e.g. `Observed miss rate of 8.42%.`
///
/// The percentage is rounded to two decimals with ties away from zero, so
/// 12.125 prints as `12.13`.
pub fn format_miss_rate(miss_rate: f64) -> String {
    let percent = (100.0 * miss_rate * 100.0).round() / 100.0;
    format!("Observed miss rate of {percent:.2}%.")
}

pub fn format_validation(output: &ValidationOutput) -> String {
    format_miss_rate(output.miss_rate())
}
