// collectors/utils.rs
// Utility functions shared by the collectors

use super::CollectorError;

/// Validate an upstream ticker before it is put into a request path.
///
/// Yahoo tickers carry punctuation (`^GSPC`, `DX-Y.NYB`, `GC=F`), so the
/// allowed set is wider than plain alphanumerics.
pub fn validate_ticker(ticker: &str) -> Result<&str, CollectorError> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(CollectorError::InvalidSymbol(
            "Ticker cannot be empty".to_string(),
        ));
    }

    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '^' | '=' | '.' | '-' | '_'))
    {
        return Err(CollectorError::InvalidSymbol(format!(
            "Ticker '{}' contains invalid characters",
            ticker
        )));
    }

    if ticker.len() > 20 {
        return Err(CollectorError::InvalidSymbol(format!(
            "Ticker '{}' has invalid length",
            ticker
        )));
    }

    Ok(ticker)
}

/// Parse an upstream numeric string; FRED and BLS report values as text.
pub fn parse_value(raw: &str) -> Result<f64, CollectorError> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|e| CollectorError::ParseError(format!("Invalid value '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_validation() {
        assert!(validate_ticker("^GSPC").is_ok());
        assert!(validate_ticker("DX-Y.NYB").is_ok());
        assert!(validate_ticker("GC=F").is_ok());
        assert!(validate_ticker("").is_err());
        assert!(validate_ticker("SPX/../x").is_err());
        assert!(validate_ticker("ABCDEFGHIJKLMNOPQRSTUVWXYZ").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(" 4.1 ").unwrap(), 4.1);
        assert_eq!(parse_value("159,288").unwrap(), 159288.0);
        assert!(parse_value(".").is_err());
    }
}
