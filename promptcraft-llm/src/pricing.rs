use promptcraft_core::Provider;

/// Per-1K-token USD rates as (input, output), loaded once at compile time
/// and never mutated. Returns `None` for models without a published rate.
pub fn rates(provider: Provider, model: &str) -> Option<(f64, f64)> {
    match provider {
        Provider::Anthropic => match model {
            "claude-sonnet-4-20250514" => Some((0.003, 0.015)),
            "claude-opus-4-20250514" => Some((0.015, 0.075)),
            "claude-haiku-35-20241022" => Some((0.00025, 0.00125)),
            _ => None,
        },
        Provider::OpenAi => match model {
            "gpt-4" => Some((0.03, 0.06)),
            "gpt-4-turbo" => Some((0.01, 0.03)),
            "gpt-4o" => Some((0.005, 0.015)),
            _ => None,
        },
    }
}

/// Estimated cost in USD for a call. Unknown models price at zero; a pricing
/// gap is a data-quality issue, not a failure.
pub fn calculate_cost(
    provider: Provider,
    model: &str,
    input_tokens: u32,
    output_tokens: u32,
) -> f64 {
    let Some((input_rate, output_rate)) = rates(provider, model) else {
        return 0.0;
    };
    f64::from(input_tokens) / 1000.0 * input_rate + f64::from(output_tokens) / 1000.0 * output_rate
}
