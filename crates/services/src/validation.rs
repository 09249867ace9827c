//! Field-level checks shared by the services.
//!
//! Limits mirror the column sizes of the relational schema.

use domains::{DomainError, DomainResult};

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 512;
pub const PRICE_MAX: i64 = i16::MAX as i64;
pub const CATEGORY_NAME_MAX: usize = 64;
pub const IMAGE_DESCRIPTION_MAX: usize = 256;
pub const USERNAME_MAX: usize = 150;
pub const NAME_MAX: usize = 150;
pub const PASSWORD_MIN: usize = 8;

/// Trims the value and checks its length in characters.
pub fn text(field: &str, value: &str, min: usize, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(if min <= 1 {
            DomainError::validation(field, "may not be blank")
        } else {
            DomainError::validation(field, format!("must be at least {min} characters"))
        });
    }
    if len > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn price(value: i64) -> DomainResult<i32> {
    if !(0..=PRICE_MAX).contains(&value) {
        return Err(DomainError::validation(
            "price",
            format!("must be between 0 and {PRICE_MAX}"),
        ));
    }
    // Range checked above.
    Ok(value as i32)
}

pub fn email(value: &str) -> DomainResult<String> {
    let value = text("email", value, 1, 254)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(value),
        _ => Err(DomainError::validation("email", "enter a valid email address")),
    }
}

/// Passwords are not trimmed; only their length is checked.
pub fn password(field: &str, value: &str) -> DomainResult<()> {
    if value.chars().count() < PASSWORD_MIN {
        return Err(DomainError::validation(
            field,
            format!("must be at least {PASSWORD_MIN} characters"),
        ));
    }
    Ok(())
}

/// Empty optional text collapses to `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => text(field, value, 1, max).map(Some),
    }
}
