//! Fund code parsing.
//!
//! Mainland fund codes are six ASCII digits. Code lists come from config and
//! the command line as comma separated tokens.

use crate::domain::error::CodeError;
use std::collections::HashSet;

pub const FUND_CODE_LEN: usize = 6;

pub fn validate_code(input: &str) -> Result<String, CodeError> {
    let code = input.trim();
    if code.len() != FUND_CODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodeError::Malformed(code.to_string()));
    }
    Ok(code.to_string())
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, CodeError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CodeError::EmptyToken);
        }
        let code = validate_code(trimmed)?;
        if !seen.insert(code.clone()) {
            return Err(CodeError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_basic() {
        let result = parse_codes("001618,001630,008887").unwrap();
        assert_eq!(result, vec!["001618", "001630", "008887"]);
    }

    #[test]
    fn test_parse_codes_with_whitespace() {
        let result = parse_codes("  005827 , 161725 ").unwrap();
        assert_eq!(result, vec!["005827", "161725"]);
    }

    #[test]
    fn test_parse_codes_empty_token() {
        let result = parse_codes("001618,,001630");
        assert!(matches!(result, Err(CodeError::EmptyToken)));
    }

    #[test]
    fn test_parse_codes_duplicate() {
        let result = parse_codes("001618,001630,001618");
        assert!(matches!(result, Err(CodeError::DuplicateCode(s)) if s == "001618"));
    }

    #[test]
    fn test_validate_code_rejects_letters_and_length() {
        assert!(matches!(validate_code("00161A"), Err(CodeError::Malformed(_))));
        assert!(matches!(validate_code("01618"), Err(CodeError::Malformed(_))));
        assert!(matches!(validate_code("0016180"), Err(CodeError::Malformed(_))));
        assert_eq!(validate_code(" 161725 ").unwrap(), "161725");
    }
}
