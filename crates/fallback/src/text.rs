//! Advisory text formatting

use chrono::{Datelike, NaiveDate};

/// Format rupees with Indian digit grouping, e.g. `₹1,25,000`
pub fn format_rupees(amount: u32) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{}", digits);
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("₹{},{}", groups.join(","), tail)
}

/// Format a date window, e.g. `Nov 14–18` or `Nov 29–Dec 3`
pub(crate) fn format_window(start: NaiveDate, end: NaiveDate) -> String {
    if start.month() == end.month() && start.year() == end.year() {
        format!("{}–{}", start.format("%b %-d"), end.day())
    } else {
        format!("{}–{}", start.format("%b %-d"), end.format("%b %-d"))
    }
}

/// `value × percent / 100`, rounding ties to even
pub(crate) fn scale_percent(value: u32, percent: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(percent);
    let quotient = scaled / 100;
    let remainder = scaled % 100;
    let rounded = if remainder > 50 || (remainder == 50 && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    };
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Uppercase the first character
pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rupee_grouping() {
        assert_eq!(format_rupees(999), "₹999");
        assert_eq!(format_rupees(2100), "₹2,100");
        assert_eq!(format_rupees(125000), "₹1,25,000");
        assert_eq!(format_rupees(10000000), "₹1,00,00,000");
    }

    #[test]
    fn test_window_same_month() {
        let start = NaiveDate::from_ymd_opt(2024, 11, 14).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 11, 18).unwrap();
        assert_eq!(format_window(start, end), "Nov 14–18");
    }

    #[test]
    fn test_window_across_months() {
        let start = NaiveDate::from_ymd_opt(2024, 11, 29).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 3).unwrap();
        assert_eq!(format_window(start, end), "Nov 29–Dec 3");
    }

    #[test]
    fn test_scale_percent_ties_to_even() {
        assert_eq!(scale_percent(90, 85), 76);
        assert_eq!(scale_percent(90, 115), 104);
        assert_eq!(scale_percent(72, 85), 61);
        assert_eq!(scale_percent(0, 115), 0);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("medium"), "Medium");
        assert_eq!(capitalize(""), "");
    }
}
