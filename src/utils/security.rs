const TOKEN_MASK_PREFIX_LEN: usize = 4;
const TOKEN_MASK_SUFFIX_LEN: usize = 4;

/// Keeps the first and last characters of a secret so log lines stay correlatable.
pub(crate) fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let len = chars.len();
    if len <= TOKEN_MASK_PREFIX_LEN + TOKEN_MASK_SUFFIX_LEN {
        return "*".repeat(len.min(8));
    }

    let prefix: String = chars[..TOKEN_MASK_PREFIX_LEN].iter().collect();
    let suffix: String = chars[len - TOKEN_MASK_SUFFIX_LEN..].iter().collect();
    format!("{prefix}...{suffix}")
}
