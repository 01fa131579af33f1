//! Input validation and sanitization module
//!
//! Centralized checks for:
//! - Identity input (names, usernames, emails, phone numbers, passwords)
//! - Catalog data (product names, measuring units, prices)
//! - Order payloads (order numbers, line items, charges)

/// Validation result type
pub type ValidationResult = Result<(), String>;

/// Validate a username
/// - Length: 3-50 characters
/// - Allowed: alphanumeric, underscore, hyphen, dot
/// - Must start with letter
pub fn validate_username(username: &str) -> ValidationResult {
    let trimmed = username.trim();

    let Some(first) = trimmed.chars().next() else {
        return Err("Username must not be empty".into());
    };

    if trimmed.len() < 3 || trimmed.len() > 50 {
        return Err("Username must be 3-50 characters".into());
    }

    if !first.is_alphabetic() {
        return Err("Username must start with a letter".into());
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || "_-.".contains(c))
    {
        return Err("Username may only contain letters, digits, '_', '-' and '.'".into());
    }

    Ok(())
}

/// Validate a person, company or branch name
/// - Length: 2-100 characters
pub fn validate_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Name must not be empty".into());
    }

    if trimmed.chars().count() < 2 || trimmed.chars().count() > 100 {
        return Err("Name must be 2-100 characters".into());
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err("Name contains control characters".into());
    }

    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> ValidationResult {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err("Email must not be empty".into());
    }

    if trimmed.len() > 254 {
        return Err("Email too long (max 254 characters)".into());
    }

    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err("Email must contain '@'".into());
    };

    if domain.contains('@') {
        return Err("Invalid email format".into());
    }

    if local.is_empty() || local.len() > 64 {
        return Err("Invalid email local part".into());
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email domain".into());
    }

    Ok(())
}

/// Validate phone number: 8-15 digits, optional `+`, spaces and hyphens
pub fn validate_phone(phone: &str) -> ValidationResult {
    let trimmed = phone.trim();

    if trimmed.is_empty() {
        return Err("Phone number must not be empty".into());
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || "+- ".contains(c))
    {
        return Err("Phone number contains invalid characters".into());
    }

    let digits = trimmed.chars().filter(|c| c.is_ascii_digit()).count();
    if !(8..=15).contains(&digits) {
        return Err("Phone number must have 8-15 digits".into());
    }

    Ok(())
}

/// Validate password strength
/// - Minimum length: configurable
/// - Must contain: uppercase, lowercase, number
pub fn validate_password(password: &str, min_len: usize) -> ValidationResult {
    if password.is_empty() {
        return Err("Password must not be empty".into());
    }

    if password.len() < min_len {
        return Err(format!("Password must be at least {} characters", min_len));
    }

    // bcrypt only looks at the first 72 bytes
    if password.len() > 72 {
        return Err("Password must be at most 72 characters".into());
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_upper || !has_lower || !has_digit {
        return Err("Password must contain an uppercase letter, a lowercase letter and a digit".into());
    }

    Ok(())
}

/// Validate monetary amount
/// - Must be finite and not below `min` (default 0)
/// - Maximum: 1 billion unless overridden
pub fn validate_amount(label: &str, amount: f64, min: Option<f64>, max: Option<f64>) -> ValidationResult {
    if amount.is_nan() || amount.is_infinite() {
        return Err(format!("{} is not a valid number", label));
    }

    let min_val = min.unwrap_or(0.0);
    let max_val = max.unwrap_or(1_000_000_000.0);

    if amount < min_val {
        return Err(format!("{} must be at least {}", label, min_val));
    }

    if amount > max_val {
        return Err(format!("{} must be at most {}", label, max_val));
    }

    Ok(())
}

/// Validate that a price has at most two decimal places
pub fn validate_cents(label: &str, amount: f64) -> ValidationResult {
    let cents = amount * 100.0;
    if (cents - cents.round()).abs() > 1e-6 {
        return Err(format!("{} must not have more than two decimal places", label));
    }

    Ok(())
}

/// Validate quantity
pub fn validate_quantity(qty: i64, min: Option<i64>, max: Option<i64>) -> ValidationResult {
    let min_val = min.unwrap_or(0);
    let max_val = max.unwrap_or(1_000_000);

    if qty < min_val {
        return Err(format!("Quantity must be at least {}", min_val));
    }

    if qty > max_val {
        return Err(format!("Quantity must be at most {}", max_val));
    }

    Ok(())
}

/// Validate product name
pub fn validate_product_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("Product name must not be empty".into());
    }

    if trimmed.chars().count() > 200 {
        return Err("Product name must be at most 200 characters".into());
    }

    Ok(())
}

/// Validate measuring unit (e.g. "kg", "pcs", "500 ml")
pub fn validate_measuring_unit(unit: &str) -> ValidationResult {
    let trimmed = unit.trim();

    if trimmed.is_empty() {
        return Err("Measuring unit must not be empty".into());
    }

    if trimmed.len() > 30 {
        return Err("Measuring unit must be at most 30 characters".into());
    }

    Ok(())
}

/// Validate a caller-supplied order number
pub fn validate_order_no(order_no: &str) -> ValidationResult {
    if order_no.is_empty() {
        return Err("Order number must not be empty".into());
    }

    if order_no.len() > 64 {
        return Err("Order number too long (max 64 characters)".into());
    }

    if order_no.chars().any(|c| c.is_control()) {
        return Err("Order number contains control characters".into());
    }

    Ok(())
}

/// Validate an order's line-item counts: at least one line, every count positive
pub fn validate_line_item_counts(counts: &[i64]) -> ValidationResult {
    if counts.is_empty() {
        return Err("Order must contain at least one line item".into());
    }

    for (idx, &count) in counts.iter().enumerate() {
        if count <= 0 {
            return Err(format!(
                "Line item {} has item count {}; counts must be positive",
                idx + 1,
                count
            ));
        }
        validate_quantity(count, Some(1), None)?;
    }

    Ok(())
}

/// Sanitize string input (remove control characters, trim)
pub fn sanitize_string(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("owner_1").is_ok());
        assert!(validate_username("jo").is_err());
        assert!(validate_username("1owner").is_err());
        assert!(validate_username("own er").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("Secret123", 8).is_ok());
        assert!(validate_password("Sec123", 8).is_err());
        assert!(validate_password("secret123", 8).is_err());
        assert!(validate_password("SECRETabc", 8).is_err());
    }

    #[test]
    fn emails_and_phones() {
        assert!(validate_email("shop@example.com").is_ok());
        assert!(validate_email("shop@example").is_err());
        assert!(validate_email("a@b@c.com").is_err());
        assert!(validate_phone("+62 812-3456-7890").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("0812abc45678").is_err());
    }

    #[test]
    fn amounts() {
        assert!(validate_amount("to_pay", 0.0, None, None).is_ok());
        assert!(validate_amount("to_pay", -0.01, None, None).is_err());
        assert!(validate_amount("to_pay", f64::NAN, None, None).is_err());
        assert!(validate_amount("to_pay", f64::INFINITY, None, None).is_err());
    }

    #[test]
    fn order_numbers() {
        assert!(validate_order_no("INV-2024/0001").is_ok());
        assert!(validate_order_no("INV 2024#1").is_ok());
        assert!(validate_order_no("").is_err());
        assert!(validate_order_no("bad\nno").is_err());
        assert!(validate_order_no(&"9".repeat(65)).is_err());
    }

    #[test]
    fn prices_in_cents() {
        assert!(validate_cents("cost", 12.0).is_ok());
        assert!(validate_cents("cost", 0.35).is_ok());
        assert!(validate_cents("cost", 19.99).is_ok());
        assert!(validate_cents("cost", 0.125).is_err());
        assert!(validate_cents("cost", 3.001).is_err());
    }

    #[test]
    fn line_item_counts() {
        assert!(validate_line_item_counts(&[1, 5]).is_ok());
        assert!(validate_line_item_counts(&[]).is_err());

        let err = validate_line_item_counts(&[2, 0]).unwrap_err();
        assert!(err.contains("Line item 2"));
        assert!(validate_line_item_counts(&[-3]).is_err());
    }

    #[test]
    fn sanitizes_control_characters() {
        assert_eq!(sanitize_string("  Tea\u{0}\n "), "Tea");
    }
}
