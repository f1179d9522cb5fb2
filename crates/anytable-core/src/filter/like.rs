use crate::{filter::FilterError, value::Value};
use regex::Regex;

///
/// LikePattern
///
/// SQL `LIKE` pattern: `%` matches any run, `_` exactly one character,
/// everything else literally. Matching is case-insensitive and anchored.
///

#[derive(Clone, Debug)]
pub struct LikePattern {
    pattern: String,
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: &str) -> Result<Self, FilterError> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push_str("(?is)^");
        for ch in pattern.chars() {
            match ch {
                '%' => source.push_str(".*"),
                '_' => source.push('.'),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|err| FilterError::InvalidPattern(err.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn check(&self, value: &Value) -> bool {
        match value {
            Value::Text(text) => self.regex.is_match(text),
            _ => false,
        }
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}
