//! Composite house numbers: decode the suffix, keep the number.
//!
//! House numbers such as `81U` carry a plot number followed by an encoded
//! locality suffix. Sending the whole value to the converter would mangle
//! the digits, so only the suffix goes through the batch decoder and the
//! numeric prefix is put back in front of the result.

use crate::pipeline::decode::BatchDecoder;
use once_cell::sync::Lazy;
use regex::Regex;

/// Label under which suffixes are decoded, distinct from every column name.
pub const SUFFIX_FIELD: &str = "HouseSuffixes";

// The remainder must start with a non-digit so the digit run is never split.
static RE_HOUSE_NO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^([0-9]+)([^0-9].*)$").unwrap());

/// Split a trimmed house number into `(digits, suffix)`.
///
/// Returns `None` for pure digits, values without a leading digit, and
/// empty values.
pub fn split_house_number(value: &str) -> Option<(&str, &str)> {
    let caps = RE_HOUSE_NO.captures(value.trim())?;
    let (prefix, suffix) = (caps.get(1)?, caps.get(2)?);
    Some((prefix.as_str(), suffix.as_str()))
}

/// Decode the suffixes of a house-number column.
///
/// Values without a suffix come back unchanged; the rest become
/// `digits + decoded suffix`. Output length always equals input length.
pub async fn decode_house_numbers(decoder: &mut BatchDecoder<'_>, values: &[String]) -> Vec<String> {
    let mut positions = Vec::new();
    let mut prefixes = Vec::new();
    let mut suffixes = Vec::new();

    for (i, value) in values.iter().enumerate() {
        if let Some((prefix, suffix)) = split_house_number(value) {
            positions.push(i);
            prefixes.push(prefix);
            suffixes.push(suffix.to_string());
        }
    }

    let mut result = values.to_vec();
    if suffixes.is_empty() {
        return result;
    }

    let decoded = decoder.decode_column(SUFFIX_FIELD, &suffixes).await;
    for ((position, prefix), suffix) in positions.into_iter().zip(prefixes).zip(decoded) {
        result[position] = format!("{prefix}{suffix}");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::oracle::TransliterationOracle;
    use async_trait::async_trait;

    struct Lookup {
        seen: Vec<Vec<String>>,
    }

    #[async_trait]
    impl TransliterationOracle for Lookup {
        async fn decode(&mut self, batch: &[String]) -> Result<Vec<String>, OracleError> {
            self.seen.push(batch.to_vec());
            Ok(batch
                .iter()
                .map(|v| match v.as_str() {
                    "U" => "ഡി".to_string(),
                    other => other.to_lowercase(),
                })
                .collect())
        }
    }

    #[test]
    fn split_cases() {
        assert_eq!(split_house_number("81U"), Some(("81", "U")));
        assert_eq!(split_house_number(" 12/3A "), Some(("12", "/3A")));
        assert_eq!(split_house_number("42"), None);
        assert_eq!(split_house_number("812"), None);
        assert_eq!(split_house_number("U81"), None);
        assert_eq!(split_house_number(""), None);
    }

    #[test]
    fn suffix_is_decoded_and_number_kept() {
        let mut oracle = Lookup { seen: vec![] };
        let input: Vec<String> = ["81U", "42", "", "7B", "X"].iter().map(|s| s.to_string()).collect();
        let out = {
            let mut d = BatchDecoder::new(&mut oracle, 100);
            tokio_test::block_on(decode_house_numbers(&mut d, &input))
        };
        assert_eq!(out, vec!["81ഡി", "42", "", "7b", "X"]);
        assert_eq!(oracle.seen, vec![vec!["U".to_string(), "B".to_string()]]);
    }

    #[test]
    fn no_suffixes_means_no_exchange() {
        let mut oracle = Lookup { seen: vec![] };
        let input: Vec<String> = vec!["1".into(), "22".into()];
        let out = {
            let mut d = BatchDecoder::new(&mut oracle, 100);
            tokio_test::block_on(decode_house_numbers(&mut d, &input))
        };
        assert_eq!(out, input);
        assert!(oracle.seen.is_empty());
    }
}
