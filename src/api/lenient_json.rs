// src/api/lenient_json.rs
//
// The service serializes metrics with Python's json module, which writes
// bare NaN / Infinity / -Infinity for values it could not compute (e.g. a
// Sharpe ratio with zero volatility). serde_json rejects those tokens, so
// they are rewritten to null before decoding.
use std::borrow::Cow;

const NON_FINITE_TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

pub fn null_non_finite(body: &str) -> Cow<'_, str> {
    if !NON_FINITE_TOKENS.iter().any(|t| body.contains(t)) {
        return Cow::Borrowed(body);
    }

    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if let Some(token) = NON_FINITE_TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str("null");
            rest = &rest[token.len()..];
            continue;
        } else if c == '"' {
            in_string = true;
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_is_borrowed() {
        let body = r#"{"Sharpe Ratio": 0.8}"#;
        assert!(matches!(null_non_finite(body), Cow::Borrowed(_)));
    }

    #[test]
    fn test_bare_tokens_become_null() {
        let body = r#"{"a": NaN, "b": -Infinity, "c": [Infinity, 1.5]}"#;
        assert_eq!(
            null_non_finite(body),
            r#"{"a": null, "b": null, "c": [null, 1.5]}"#
        );
    }

    #[test]
    fn test_tokens_inside_strings_are_kept() {
        let body = r#"{"note": "NaN \"Infinity\" here", "v": NaN}"#;
        assert_eq!(
            null_non_finite(body),
            r#"{"note": "NaN \"Infinity\" here", "v": null}"#
        );
    }

    #[test]
    fn test_rewritten_body_decodes() {
        let body = r#"{"Sharpe Ratio": NaN, "Max Drawdown": -0.2}"#;
        let value: serde_json::Value = serde_json::from_str(&null_non_finite(body)).unwrap();
        assert!(value["Sharpe Ratio"].is_null());
        assert_eq!(value["Max Drawdown"], -0.2);
    }
}
