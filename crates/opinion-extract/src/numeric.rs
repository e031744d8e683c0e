use crate::model::Rating;

/// First run of ASCII digits in `text` as a rating.
///
/// Prose around the number is ignored ("4 - fairly important" is 4).
/// Text without digits, or a digit run too large for the rating type,
/// yields [`Rating::Unavailable`]. The range is not checked here.
pub fn extract_rating(text: &str) -> Rating {
    let Some(start) = text.find(|c: char| c.is_ascii_digit()) else {
        return Rating::Unavailable;
    };
    let digits = &text[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<u32>()
        .map(Rating::Value)
        .unwrap_or(Rating::Unavailable)
}
