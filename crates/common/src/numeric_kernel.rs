use std::f64;

/// Converts an exchange rate into its edge weight, `-ln(rate)`.
pub fn rate_to_weight(rate: f64) -> f64 {
    -rate.ln()
}

/// Recovers the multiplicative rate from an edge weight, `e^(-weight)`.
pub fn weight_to_rate(weight: f64) -> f64 {
    (-weight).exp()
}

/// Weight of a market hop after fees.
///
/// `no_fee_rate` is the quote-per-base price of the market. Selling base gives
/// `rate * (1 - fee)` quote per base; buying base gives `(1 - fee) / rate` base per quote.
pub fn fee_adjusted_weight(no_fee_rate: f64, fee: f64, sell: bool) -> f64 {
    let effective = if sell {
        no_fee_rate * (1.0 - fee)
    } else {
        (1.0 - fee) / no_fee_rate
    };
    rate_to_weight(effective)
}

/// Number of times a negative cycle must be walked so that its compounded weight
/// outweighs a positive connecting cost.
///
/// Computes `return_path_weight / |loop_weight| + 1`, then adds one when that quotient
/// is already whole and rounds up otherwise.
pub fn repeat_scalar(return_path_weight: f64, loop_weight: f64) -> f64 {
    let scalar = return_path_weight / loop_weight.abs() + 1.0;
    if scalar.fract() == 0.0 {
        scalar + 1.0
    } else {
        scalar.ceil()
    }
}
