//! Field-level request validation helpers.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::AppError;

fn slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap())
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Shape check only: something@something, no spaces.
pub fn validate_email(email: &str) -> Result<(), AppError> {
    let ok = email.len() >= 3
        && email.contains('@')
        && !email.starts_with('@')
        && !email.ends_with('@')
        && !email.contains(char::is_whitespace);
    if !ok {
        return Err(AppError::Validation("email must be a valid address".into()));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(AppError::Validation(
            "username must be between 3 and 32 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_rating(rating: i64) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation("rating must be between 1 and 5".into()));
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation("price must be a non-negative number".into()));
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if !slug_re().is_match(slug) {
        return Err(AppError::Validation(
            "slug must be lowercase letters, digits and hyphens".into(),
        ));
    }
    Ok(())
}

/// URL-friendly version of a name: lowercase, alphanumeric runs joined by hyphens.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

/// Split a comma-separated form field, dropping empty segments.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@leading").is_err());
        assert!(validate_email("spaces in@here").is_err());
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn slugify_normalizes() {
        assert_eq!(slugify("Classic Black Tee"), "classic-black-tee");
        assert_eq!(slugify("  V-Neck!  2.0 "), "v-neck-2-0");
        assert!(validate_slug(&slugify("Classic Black Tee")).is_ok());
    }

    #[test]
    fn csv_splitting_drops_empties() {
        assert_eq!(split_csv("S, M ,,L"), vec!["S", "M", "L"]);
        assert!(split_csv("  ").is_empty());
    }

    #[test]
    fn price_rejects_negative_and_nan() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(-1.0).is_err());
        assert!(validate_price(f64::NAN).is_err());
    }
}
