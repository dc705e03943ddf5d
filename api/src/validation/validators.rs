//! Field validators
//!
//! Small pure predicates shared by every rule set. Each returns the message
//! to attach to the violation when the value is rejected.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Pragmatic email shape: local part, a single '@', dotted domain
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap();
}

/// Validate that a string is not empty after trimming
pub fn validate_required(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field_name));
    }
    Ok(())
}

/// Validate the minimum string length, counted in characters
pub fn validate_min_length(value: &str, min: usize) -> Result<(), String> {
    if value.chars().count() < min {
        return Err(format!("must be at least {} characters", min));
    }
    Ok(())
}

/// Validate the maximum string length, counted in characters
pub fn validate_max_length(value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("must be at most {} characters", max));
    }
    Ok(())
}

/// Validate that a list holds at least one item
pub fn validate_non_empty_list(len: usize) -> Result<(), String> {
    if len == 0 {
        return Err("must contain at least one item".to_string());
    }
    Ok(())
}

/// Validate that a list holds no more than `max` items
pub fn validate_max_items(len: usize, max: usize) -> Result<(), String> {
    if len > max {
        return Err(format!("must contain at most {} items", max));
    }
    Ok(())
}

/// Validate that every item of a string list fits within `max` characters
pub fn validate_item_lengths(items: &[&str], max: usize) -> Result<(), String> {
    for (i, item) in items.iter().enumerate() {
        if item.trim().is_empty() {
            return Err(format!("item at index {} cannot be empty", i));
        }
        if item.chars().count() > max {
            return Err(format!(
                "item at index {} exceeds maximum length of {} characters",
                i, max
            ));
        }
    }
    Ok(())
}

/// Validate that a number lies within `[min, max]`
pub fn validate_range(value: f64, min: i64, max: i64) -> Result<(), String> {
    if value < min as f64 || value > max as f64 {
        return Err(format!("must be between {} and {}", min, max));
    }
    Ok(())
}

/// Validate email format
pub fn validate_email(value: &str) -> Result<(), String> {
    if !EMAIL_REGEX.is_match(value.trim()) {
        return Err("must be a valid email address".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("Soup", "title").is_ok());
        assert_eq!(
            validate_required("   ", "title").unwrap_err(),
            "title is required"
        );
    }

    #[test]
    fn test_validate_lengths_count_chars() {
        assert!(validate_min_length("abc", 3).is_ok());
        assert!(validate_min_length("ab", 3).is_err());
        assert!(validate_max_length("crème", 5).is_ok());
        assert!(validate_max_length("crèmes", 5).is_err());
    }

    #[test]
    fn test_validate_lists() {
        assert!(validate_non_empty_list(0).is_err());
        assert!(validate_non_empty_list(1).is_ok());
        assert!(validate_max_items(3, 3).is_ok());
        assert!(validate_max_items(4, 3).is_err());
        assert!(validate_item_lengths(&["salt", "pepper"], 10).is_ok());
        assert!(validate_item_lengths(&["salt", " "], 10).is_err());
        assert!(validate_item_lengths(&["a very long ingredient"], 5).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(1.0, 1, 5).is_ok());
        assert!(validate_range(5.0, 1, 5).is_ok());
        assert_eq!(validate_range(6.0, 1, 5).unwrap_err(), "must be between 1 and 5");
        assert!(validate_range(0.0, 1, 5).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("chef@example.com").is_ok());
        assert!(validate_email("first.last+tag@mail.co.uk").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("two@@example.com").is_err());
    }
}
