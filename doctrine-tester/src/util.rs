use anyhow::{Context, Result};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

pub fn parse_seeds(s: &str) -> Result<Vec<u64>> {
    split_csv(s)
        .iter()
        .map(|token| {
            let parsed = match token.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => token.parse(),
            };
            parsed.with_context(|| format!("invalid seed `{token}`"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_tokens_are_trimmed() {
        assert_eq!(split_csv(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn seeds_accept_decimal_and_hex() {
        assert_eq!(parse_seeds("1337, 0x10").expect("seeds"), vec![1337, 16]);
        assert!(parse_seeds("nope").is_err());
    }
}
