use super::RosterEntry;

/// Which line shape produced a roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFormat {
    /// `1. Jahid`, `3 Emon`, `12\tRaihan`
    IdentifierFirst,
    /// `Fahad Akash 08`
    NameFirst,
}

/// Parses one roster line, trying identifier-first before name-first.
pub fn parse_line(line: &str) -> Option<(RosterEntry, LineFormat)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(entry) = parse_identifier_first(line) {
        return Some((entry, LineFormat::IdentifierFirst));
    }
    parse_name_first(line).map(|entry| (entry, LineFormat::NameFirst))
}

fn parse_identifier_first(line: &str) -> Option<RosterEntry> {
    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if digits_end == 0 {
        return None;
    }

    let (identifier, rest) = line.split_at(digits_end);
    let name = rest.trim_start_matches([' ', '\t', '.']);
    if name.len() == rest.len() {
        // no separator after the digits
        return None;
    }

    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(RosterEntry::new(name, identifier))
}

fn parse_name_first(line: &str) -> Option<RosterEntry> {
    let (name, token) = line.rsplit_once(char::is_whitespace)?;
    let name = name.trim_end();
    if name.is_empty() || token.is_empty() {
        return None;
    }

    let numeric = token.chars().all(|c| c.is_ascii_digit());
    if numeric || token.chars().count() <= 3 {
        Some(RosterEntry::new(name, token))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(line: &str) -> Option<(String, String, LineFormat)> {
        parse_line(line).map(|(entry, format)| (entry.canonical_name, entry.identifier, format))
    }

    #[test]
    fn identifier_first_accepts_period_and_tab_separators() {
        assert_eq!(
            parsed("1. Jahid"),
            Some(("Jahid".into(), "1".into(), LineFormat::IdentifierFirst))
        );
        assert_eq!(
            parsed("12\tRaihan"),
            Some(("Raihan".into(), "12".into(), LineFormat::IdentifierFirst))
        );
        assert_eq!(
            parsed("3 Emon"),
            Some(("Emon".into(), "3".into(), LineFormat::IdentifierFirst))
        );
    }

    #[test]
    fn name_first_takes_trailing_token() {
        assert_eq!(
            parsed("Fahad Akash 08"),
            Some(("Fahad Akash".into(), "08".into(), LineFormat::NameFirst))
        );
        assert_eq!(
            parsed("Mitu  A1"),
            Some(("Mitu".into(), "A1".into(), LineFormat::NameFirst))
        );
    }

    #[test]
    fn lines_matching_neither_shape_are_rejected() {
        assert!(parsed("Jahid").is_none());
        assert!(parsed("Umme Hani Bithe").is_none());
        assert!(parsed("42").is_none());
        assert!(parsed("7.").is_none());
        assert!(parsed("   ").is_none());
    }
}
