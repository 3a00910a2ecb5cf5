//! Local input checks. A failure here never reaches the network.

use chrono::NaiveDate;

use crate::error::{ClientError, Result};

pub const MIN_PASSWORD_LEN: usize = 8;

fn required(value: &str, label: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(ClientError::validation(format!("{} is required", label)));
  }
  Ok(())
}

pub fn sign_in(email: &str, password: &str) -> Result<()> {
  required(email, "Email")?;
  required(password, "Password")
}

pub fn registration(email: &str, password: &str, confirm: &str) -> Result<()> {
  sign_in(email, password)?;
  if password != confirm {
    return Err(ClientError::validation("Passwords do not match"));
  }
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ClientError::validation(format!(
      "Password must be at least {} characters",
      MIN_PASSWORD_LEN
    )));
  }
  Ok(())
}

pub fn password_change(old: &str, new: &str, confirm: &str) -> Result<()> {
  required(old, "Current password")?;
  required(new, "New password")?;
  if new != confirm {
    return Err(ClientError::validation("Passwords do not match"));
  }
  if new.chars().count() < MIN_PASSWORD_LEN {
    return Err(ClientError::validation(format!(
      "Password must be at least {} characters",
      MIN_PASSWORD_LEN
    )));
  }
  if new == old {
    return Err(ClientError::validation(
      "New password must differ from the current one",
    ));
  }
  Ok(())
}

pub fn category(name: &str, color: &str) -> Result<()> {
  required(name, "Category name")?;
  if !is_hex_color(color) {
    return Err(ClientError::validation(format!(
      "'{}' is not a colour of the form #RRGGBB",
      color
    )));
  }
  Ok(())
}

pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
  if start > end {
    return Err(ClientError::validation("Start date must not be after end date"));
  }
  Ok(())
}

fn is_hex_color(color: &str) -> bool {
  color
    .strip_prefix('#')
    .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sign_in_requires_both_fields() {
    assert!(sign_in("a@b.c", "pw").is_ok());
    assert_eq!(
      sign_in("  ", "pw").unwrap_err().to_string(),
      "Email is required"
    );
    assert_eq!(
      sign_in("a@b.c", "").unwrap_err().to_string(),
      "Password is required"
    );
  }

  #[test]
  fn test_registration_rules() {
    assert!(registration("a@b.c", "password123", "password123").is_ok());
    assert_eq!(
      registration("a@b.c", "password123", "password124")
        .unwrap_err()
        .to_string(),
      "Passwords do not match"
    );
    assert_eq!(
      registration("a@b.c", "short", "short").unwrap_err().to_string(),
      "Password must be at least 8 characters"
    );
  }

  #[test]
  fn test_password_change_must_differ() {
    assert!(password_change("oldpassword", "newpassword", "newpassword").is_ok());
    assert!(password_change("samepassword", "samepassword", "samepassword").is_err());
    assert!(password_change("", "newpassword", "newpassword").is_err());
  }

  #[test]
  fn test_category_color() {
    assert!(category("Work", "#1a2B3c").is_ok());
    assert!(category("Work", "1a2b3c").is_err());
    assert!(category("Work", "#12345").is_err());
    assert!(category("Work", "#12345g").is_err());
    assert!(category(" ", "#123456").is_err());
  }

  #[test]
  fn test_date_range_order() {
    let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let b = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
    assert!(date_range(a, b).is_ok());
    assert!(date_range(a, a).is_ok());
    assert!(date_range(b, a).is_err());
  }
}
