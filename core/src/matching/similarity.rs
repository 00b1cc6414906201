/// Lowercases, splits on whitespace and sorts the tokens so word order does not matter.
pub fn token_sort_key(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Normalized Levenshtein similarity scaled to 0..=100.
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Case- and order-insensitive similarity between two names.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&token_sort_key(a), &token_sort_key(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_full() {
        assert_eq!(ratio("jahid", "jahid"), 100.0);
        assert_eq!(token_sort_ratio("Fahad Akash", "fahad  AKASH"), 100.0);
    }

    #[test]
    fn token_order_is_ignored() {
        assert_eq!(
            token_sort_ratio("Akash Fahad", "Fahad Akash"),
            token_sort_ratio("Fahad Akash", "Fahad Akash")
        );
    }

    #[test]
    fn disjoint_characters_score_zero() {
        assert_eq!(ratio("abc", "xyz"), 0.0);
        assert_eq!(ratio("ab", "wxyz"), 0.0);
        assert_eq!(ratio("", "emon"), 0.0);
    }

    #[test]
    fn score_drops_as_edits_grow() {
        let base = "fahad akash";
        let one = ratio(base, "fahad akasx");
        let two = ratio(base, "fahad akaxx");
        let three = ratio(base, "fahad akxxx");
        assert!(one >= two && two >= three);
        assert!(one > 90.0);
    }

    #[test]
    fn partial_names_fall_below_default_threshold() {
        assert!(token_sort_ratio("Akash", "Fahad Akash") < 75.0);
        assert!(token_sort_ratio("Fahad", "Fahad Akash") < 75.0);
        assert!(token_sort_ratio("Fahad Akas", "Fahad Akash") >= 90.0);
    }
}
