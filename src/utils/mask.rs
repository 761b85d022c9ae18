// src/utils/mask.rs

const VISIBLE_PREFIX: usize = 4;

/// Public label for a leaderboard row.
///
/// Uses the participant's exam number when assigned, otherwise their identity.
/// Only a short prefix stays visible; every other character becomes `*`.
pub fn display_code(exam_number: Option<&str>, participant_id: &str) -> String {
    let source = exam_number
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .unwrap_or(participant_id);
    mask(source)
}

fn mask(value: &str) -> String {
    let len = value.chars().count();
    // Short values keep at most half their characters.
    let visible = VISIBLE_PREFIX.min(len / 2);
    value
        .chars()
        .enumerate()
        .map(|(idx, c)| if idx < visible { c } else { '*' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exam_number_is_masked() {
        assert_eq!(display_code(Some("SUMMIT0042"), "google-123"), "SUMM******");
    }

    #[test]
    fn test_falls_back_to_identity() {
        assert_eq!(display_code(None, "kakao-98765"), "kaka*******");
        assert_eq!(display_code(Some("  "), "kakao-98765"), "kaka*******");
    }

    #[test]
    fn test_short_values_hide_at_least_half() {
        assert_eq!(display_code(Some("A1"), "x"), "A*");
        assert_eq!(display_code(Some("AB12"), "x"), "AB**");
        assert_eq!(display_code(None, "x"), "*");
    }
}
