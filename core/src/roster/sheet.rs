const SHEETS_PREFIX: &str = "/spreadsheets/d/";

/// Rewrites a Google Sheets sharing link into its CSV export link.
///
/// `https://docs.google.com/spreadsheets/d/<id>/edit?gid=7#gid=7` becomes
/// `https://docs.google.com/spreadsheets/d/<id>/export?format=csv&gid=7`.
/// Links that already point at an export, or are not Sheets links, come back unchanged.
pub fn sheet_export_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("/export?") {
        return url.to_string();
    }

    let Some(start) = url.find(SHEETS_PREFIX) else {
        return url.to_string();
    };
    let rest = &url[start + SHEETS_PREFIX.len()..];
    let sheet_id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if sheet_id.is_empty() {
        return url.to_string();
    }

    let gid = url
        .split(['?', '&', '#'])
        .find_map(|part| part.strip_prefix("gid="))
        .map(|value| value.chars().take_while(char::is_ascii_digit).collect::<String>())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "0".to_string());

    let origin = &url[..start];
    format!("{origin}{SHEETS_PREFIX}{sheet_id}/export?format=csv&gid={gid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_link_becomes_csv_export() {
        let url = "https://docs.google.com/spreadsheets/d/11_2Ow-Naav5/edit?gid=42#gid=42";
        assert_eq!(
            sheet_export_url(url),
            "https://docs.google.com/spreadsheets/d/11_2Ow-Naav5/export?format=csv&gid=42"
        );
    }

    #[test]
    fn missing_gid_defaults_to_first_tab() {
        let url = "https://docs.google.com/spreadsheets/d/abc123/edit";
        assert_eq!(
            sheet_export_url(url),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid=0"
        );
    }

    #[test]
    fn other_links_pass_through() {
        assert_eq!(sheet_export_url("https://example.com/roster.csv"), "https://example.com/roster.csv");
        let export = "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=3";
        assert_eq!(sheet_export_url(export), export);
    }
}
