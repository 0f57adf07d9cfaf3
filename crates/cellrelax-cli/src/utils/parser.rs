use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid triplet '{0}'. Expected three comma-separated numbers (e.g., '1,1,0.5').")]
    InvalidTriplet(String),

    #[error("Component '{component}' of '{input}' is not a number.")]
    InvalidNumber { component: String, input: String },
}

/// Parses `"a,b,c"` into three floats. Whitespace around components is ignored.
pub fn parse_triplet(input: &str) -> Result<[f64; 3], ParseError> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(ParseError::InvalidTriplet(input.to_string()));
    };
    let parse = |component: &str| {
        component
            .parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber {
                component: component.to_string(),
                input: input.to_string(),
            })
    };
    Ok([parse(a)?, parse(b)?, parse(c)?])
}

/// Splits a `KEY=VALUE` override at the first `=`.
pub fn split_key_value(pair: &str) -> Option<(&str, &str)> {
    let (key, value) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}
