use crate::error::{PipelineError, Result};

/// Parse a numeric cell written with an arbitrary decimal separator
///
/// # Examples
/// ```
/// use station_lcz::utils::parse_decimal;
///
/// let value = parse_decimal("48,8566", ',').unwrap();
/// assert!((value - 48.8566).abs() < 1e-12);
/// ```
pub fn parse_decimal(raw: &str, decimal: char) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::data_format("Empty numeric value"));
    }

    let normalized = if decimal == '.' {
        trimmed.to_string()
    } else {
        if trimmed.contains('.') {
            return Err(PipelineError::data_format(format!(
                "Invalid numeric value: '{}' (decimal separator is '{}')",
                raw, decimal
            )));
        }
        trimmed.replace(decimal, ".")
    };

    let value = normalized.parse::<f64>().map_err(|_| {
        PipelineError::data_format(format!("Invalid numeric value: '{}'", raw))
    })?;

    if !value.is_finite() {
        return Err(PipelineError::data_format(format!(
            "Non-finite numeric value: '{}'",
            raw
        )));
    }

    Ok(value)
}

/// Parse an integer station identifier, tolerating a zero fractional part
/// ("12", "12.0" and "12,0" all give 12)
pub fn parse_identifier(raw: &str, decimal: char) -> Result<i64> {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Ok(id);
    }

    let value = parse_decimal(trimmed, decimal).map_err(|_| {
        PipelineError::data_format(format!("Station identifier is not an integer: '{}'", raw))
    })?;

    if value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return Err(PipelineError::data_format(format!(
            "Station identifier is not an integer: '{}'",
            raw
        )));
    }

    Ok(value as i64)
}

/// Format an ordinate the way the zone folders are named: shortest
/// round-trip digits, always with a fractional part, switching to exponent
/// notation below 1e-4 and from 1e16 onwards.
///
/// # Examples
/// ```
/// use station_lcz::utils::format_ordinate;
///
/// assert_eq!(format_ordinate(6862000.0), "6862000.0");
/// assert_eq!(format_ordinate(48.8566), "48.8566");
/// assert_eq!(format_ordinate(0.00001), "1e-05");
/// ```
pub fn format_ordinate(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let plain = format!("{}", value);
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}
