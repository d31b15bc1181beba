use once_cell::sync::Lazy;
use regex::Regex;

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w{3})\s+(\d{4})").expect("month-year regex"));

const MONTHS: [(&str, &str); 12] = [
    ("Jan", "01"),
    ("Feb", "02"),
    ("Mar", "03"),
    ("Apr", "04"),
    ("May", "05"),
    ("Jun", "06"),
    ("Jul", "07"),
    ("Aug", "08"),
    ("Sep", "09"),
    ("Oct", "10"),
    ("Nov", "11"),
    ("Dec", "12"),
];

fn month_numeral(abbrev: &str) -> Option<&'static str> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == abbrev)
        .map(|(_, num)| *num)
}

/// `"Prescription Cost Analysis (PCA) - Jan 2021"` → `Some("202101")`.
///
/// Looks for a three-letter month abbreviation followed by a four-digit year.
/// Returns `None` when the title carries no such pair.
pub fn extract_date_from_title(title: &str) -> Option<String> {
    MONTH_YEAR.captures_iter(title).find_map(|caps| {
        let month = month_numeral(&caps[1])?;
        Some(format!("{}{}", &caps[2], month))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_month_maps_to_zero_padded_numeral() {
        for (i, (abbrev, _)) in MONTHS.iter().enumerate() {
            let title = format!("PCA - {} 2023", abbrev);
            assert_eq!(
                extract_date_from_title(&title),
                Some(format!("2023{:02}", i + 1))
            );
        }
    }

    #[test]
    fn full_title() {
        assert_eq!(
            extract_date_from_title("Prescription Cost Analysis (PCA) - Jan 2021"),
            Some("202101".to_string())
        );
    }

    #[test]
    fn skips_non_month_words_before_the_date() {
        assert_eq!(
            extract_date_from_title("PCA for the 2022 release - Oct 2022"),
            Some("202210".to_string())
        );
    }

    #[test]
    fn month_glued_to_word_characters_still_matches() {
        assert_eq!(
            extract_date_from_title("PCA_Jan 2021"),
            Some("202101".to_string())
        );
        assert_eq!(
            extract_date_from_title("PCA - Jan 20215"),
            Some("202101".to_string())
        );
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(extract_date_from_title("PCA - January 2021"), None);
        assert_eq!(extract_date_from_title("PCA - 2021"), None);
        assert_eq!(extract_date_from_title("PCA - jan 2021"), None);
        assert_eq!(extract_date_from_title(""), None);
    }
}
