//! Form checks done before anything is sent to the server.

use chrono::NaiveDate;

/// Allowed password length, inclusive
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 16;

pub const PASSWORD_RULES: &str = "Invalid password format. Password must be 8-16 characters long and include a number, lowercase letter, uppercase letter, and special character.";

/// `local@domain.tld` with no whitespace and exactly one `@`
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// 8-16 characters with a digit, a lowercase letter, an uppercase letter
/// and a special character, and no spaces.
pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len)
        && !password.contains(' ')
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| !c.is_alphanumeric() && c != '_')
}

/// Parse a `YYYY-MM-DD` return date that is not in the past
pub fn parse_return_date(input: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a date (expected YYYY-MM-DD)", input))?;
    if date < today {
        return Err("Return date cannot be in the past".to_string());
    }
    Ok(date)
}
