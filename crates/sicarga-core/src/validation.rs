//! # Validation Module
//!
//! Input validation for registration, quoting and shipping forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Browser (React forms)                                        │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: API handler (Rust)                                           │
//! │  ├── Type validation (serde)                                           │
//! │  └── THIS MODULE: field rules, decimal parsing                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE constraints (email, username, item_no, tracking)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use sicarga_core::validation::{validate_email, validate_password};
//!
//! validate_email("cliente@example.com").unwrap();
//! assert!(validate_password("12345678", "juan").is_err());
//! ```

use crate::error::ValidationError;
use crate::measure::Weight;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum characters before the tariff autocomplete runs a search.
pub const AUTOCOMPLETE_MIN_CHARS: usize = 3;

/// Invoice uploads accepted by the shipping request form.
pub const INVOICE_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Largest declared value a quote accepts: 1,000,000.00 USD.
pub const MAX_DECLARED_VALUE: Money = Money::from_cents(100_000_000);

/// Heaviest article or shipment accepted: 10,000 lb.
pub const MAX_WEIGHT: Weight = Weight::from_hundredths(1_000_000);

/// Longest package side accepted, in hundredths of an inch: 1,000 in.
pub const MAX_PACKAGE_SIDE: i64 = 100_000;

// =============================================================================
// Fixed-Point Decimals
// =============================================================================

/// Parses decimal text into an integer scaled by `10^places`.
///
/// ```text
/// parse_fixed("peso", "12.5", 2)  → 1250
/// parse_fixed("dai",  "0.15", 4)  → 1500
/// parse_fixed("peso", "1.234", 2) → InvalidFormat (too many decimals)
/// ```
pub fn parse_fixed(field: &str, text: &str, places: u32) -> ValidationResult<i64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(ValidationError::invalid(field, "must be a decimal number"));
    }

    if frac_part.len() > places as usize {
        return Err(ValidationError::invalid(
            field,
            format!("no more than {} decimal places allowed", places),
        ));
    }

    let overflow = || ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    };

    let scale = 10_i64.pow(places);
    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| overflow())?
    };

    let mut frac: i64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().map_err(|_| overflow())?
    };
    for _ in frac_part.len()..places as usize {
        frac *= 10;
    }

    let value = whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(overflow)?;

    Ok(if negative { -value } else { value })
}

/// Formats a scaled integer back to decimal text with exactly `places` digits.
pub fn format_fixed(value: i64, places: u32) -> String {
    let scale = 10_i64.pow(places);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / scale as u64,
        abs % scale as u64,
        width = places as usize
    )
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates a login username.
///
/// ## Rules
/// - 1 to 150 characters
/// - Letters, digits and `@ . + - _` only
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();

    if username.is_empty() {
        return Err(ValidationError::Required {
            field: "username".to_string(),
        });
    }

    if username.chars().count() > 150 {
        return Err(ValidationError::TooLong {
            field: "username".to_string(),
            max: 150,
        });
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::invalid(
            "username",
            "may contain only letters, numbers, and @/./+/-/_ characters",
        ));
    }

    Ok(())
}

/// Validates an email address.
///
/// Structural check only: one `@`, non-empty local part, dotted domain,
/// no whitespace.
///
/// ## Example
/// ```rust
/// use sicarga_core::validation::validate_email;
///
/// assert!(validate_email("ana@sicargabox.com").is_ok());
/// assert!(validate_email("ana@localhost").is_err());
/// assert!(validate_email("ana sicargabox.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::invalid("email", "enter a valid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a new password.
///
/// ## Rules
/// - At least 8 characters
/// - Not entirely numeric
/// - Not the same as the username
pub fn validate_password(password: &str, username: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid("password", "is entirely numeric"));
    }

    if !username.is_empty() && password.eq_ignore_ascii_case(username.trim()) {
        return Err(ValidationError::invalid(
            "password",
            "is too similar to the username",
        ));
    }

    Ok(())
}

/// Confirms the repeated password matches.
pub fn validate_passwords_match(password: &str, confirmation: &str) -> ValidationResult<()> {
    if password != confirmation {
        return Err(ValidationError::Mismatch {
            field: "password2".to_string(),
            other: "password".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Generic Field Validators
// =============================================================================

/// Returns the trimmed value, or `Required` when blank.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Rejects values longer than `max` characters.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

pub fn validate_positive_money(field: &str, value: Money) -> ValidationResult<()> {
    if !value.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_weight(field: &str, value: Weight) -> ValidationResult<()> {
    if value.hundredths() <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn out_of_range(field: &str, max: i64) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max,
    }
}

/// A declared value: positive and at most [`MAX_DECLARED_VALUE`].
pub fn validate_declared_value(field: &str, value: Money) -> ValidationResult<Money> {
    validate_positive_money(field, value)?;
    if value > MAX_DECLARED_VALUE {
        return Err(out_of_range(field, MAX_DECLARED_VALUE.cents() / 100));
    }
    Ok(value)
}

/// A weight in pounds: positive and at most [`MAX_WEIGHT`].
pub fn validate_weight(field: &str, value: Weight) -> ValidationResult<Weight> {
    validate_positive_weight(field, value)?;
    if value > MAX_WEIGHT {
        return Err(out_of_range(field, MAX_WEIGHT.hundredths() / 100));
    }
    Ok(value)
}

/// One package side in hundredths of an inch.
pub fn validate_package_side(field: &str, hundredths: i64) -> ValidationResult<i64> {
    if hundredths <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    if hundredths > MAX_PACKAGE_SIDE {
        return Err(out_of_range(field, MAX_PACKAGE_SIDE / 100));
    }
    Ok(hundredths)
}

// =============================================================================
// Search & Shipping Validators
// =============================================================================

/// Validates a free-text search query.
///
/// ## Returns
/// The trimmed query string (may be empty).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Returns the query when it is long enough for the autocomplete.
///
/// Short queries are not an error; the widget simply shows nothing.
pub fn autocomplete_query(query: &str) -> Option<String> {
    let query = query.trim();
    if query.chars().count() < AUTOCOMPLETE_MIN_CHARS {
        return None;
    }
    Some(query.chars().take(100).collect())
}

/// Validates a carrier tracking number (UPS, FedEx, USPS, Amazon...).
pub fn validate_tracking_number(tracking: &str) -> ValidationResult<String> {
    let tracking = validate_required("tracking_number", tracking)?;

    validate_max_len("tracking_number", &tracking, 100)?;

    if !tracking.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::invalid(
            "tracking_number",
            "must not contain spaces or special characters",
        ));
    }

    Ok(tracking)
}

/// Returns the lower-case extension of an invoice upload.
///
/// ## Example
/// ```rust
/// use sicarga_core::validation::validate_invoice_filename;
///
/// assert_eq!(validate_invoice_filename("Factura.PDF").unwrap(), "pdf");
/// assert!(validate_invoice_filename("factura.exe").is_err());
/// ```
pub fn validate_invoice_filename(filename: &str) -> ValidationResult<String> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if !INVOICE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ValidationError::NotAllowed {
            field: "factura_compra".to_string(),
            allowed: INVOICE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        });
    }

    Ok(ext)
}

// =============================================================================
// Error Collection
// =============================================================================

/// Collects field errors so a form can report everything at once.
///
/// ## Example
/// ```rust
/// use sicarga_core::validation::{validate_email, validate_username, FieldErrors};
///
/// let mut errors = FieldErrors::new();
/// errors.check(validate_username(""));
/// errors.check(validate_email("bad"));
/// assert_eq!(errors.len(), 2);
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Default, Clone)]
pub struct FieldErrors(Vec<ValidationError>);

impl FieldErrors {
    pub fn new() -> Self {
        FieldErrors(Vec::new())
    }

    /// Records the error (if any) and passes the value through.
    pub fn check<T>(&mut self, result: ValidationResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.0.push(err);
                None
            }
        }
    }

    pub fn push(&mut self, err: ValidationError) {
        self.0.push(err);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// `Ok(())` when nothing was recorded, otherwise every error.
    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed() {
        assert_eq!(parse_fixed("peso", "12.5", 2).unwrap(), 1250);
        assert_eq!(parse_fixed("peso", "12", 2).unwrap(), 1200);
        assert_eq!(parse_fixed("peso", "12.", 2).unwrap(), 1200);
        assert_eq!(parse_fixed("dai", "0.15", 4).unwrap(), 1500);
        assert_eq!(parse_fixed("x", "-3.25", 2).unwrap(), -325);

        assert!(matches!(
            parse_fixed("peso", "", 2),
            Err(ValidationError::Required { .. })
        ));
        assert!(parse_fixed("peso", ".", 2).is_err());
        assert!(parse_fixed("peso", "1.2.3", 2).is_err());
        assert!(parse_fixed("peso", "1e5", 2).is_err());
        assert!(parse_fixed("peso", "+1", 2).is_err());
        assert!(parse_fixed("peso", "99999999999999999999", 2).is_err());
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(1250, 2), "12.50");
        assert_eq!(format_fixed(7, 2), "0.07");
        assert_eq!(format_fixed(-325, 2), "-3.25");
        assert_eq!(format_fixed(1500, 4), "0.1500");
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("juan.perez").is_ok());
        assert!(validate_username("ana+box@x").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("a@@b.com").is_err());
        assert!(validate_email("a@b.").is_err());
        assert!(validate_email("@b.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("testpass123", "testuser").is_ok());
        assert!(matches!(
            validate_password("short1", "u"),
            Err(ValidationError::TooShort { min: 8, .. })
        ));
        assert!(validate_password("1234567890", "u").is_err());
        assert!(validate_password("TestUser1", "testuser1").is_err());
    }

    #[test]
    fn test_passwords_match() {
        assert!(validate_passwords_match("abc", "abc").is_ok());
        assert!(matches!(
            validate_passwords_match("abc", "abd"),
            Err(ValidationError::Mismatch { .. })
        ));
    }

    #[test]
    fn test_positive_amounts() {
        assert!(validate_positive_money("valor", Money::from_cents(1)).is_ok());
        assert!(validate_positive_money("valor", Money::zero()).is_err());
        assert!(validate_positive_weight("peso", Weight::from_hundredths(0)).is_err());
        assert!(validate_positive_weight("peso", Weight::from_hundredths(50)).is_ok());
    }

    #[test]
    fn test_quote_ceilings() {
        assert!(validate_declared_value("valor", MAX_DECLARED_VALUE).is_ok());
        assert_eq!(
            validate_declared_value("valor", MAX_DECLARED_VALUE + Money::from_cents(1)),
            Err(ValidationError::OutOfRange {
                field: "valor".to_string(),
                min: 0,
                max: 1_000_000,
            })
        );
        assert!(matches!(
            validate_declared_value("valor", Money::zero()),
            Err(ValidationError::MustBePositive { .. })
        ));

        assert!(validate_weight("peso", MAX_WEIGHT).is_ok());
        assert!(matches!(
            validate_weight("peso", Weight::from_hundredths(1_000_001)),
            Err(ValidationError::OutOfRange { max: 10_000, .. })
        ));

        assert_eq!(validate_package_side("largo", 100_000), Ok(100_000));
        assert!(matches!(
            validate_package_side("largo", 100_001),
            Err(ValidationError::OutOfRange { max: 1_000, .. })
        ));
        assert!(validate_package_side("alto", 0).is_err());
    }

    #[test]
    fn test_autocomplete_query() {
        assert_eq!(autocomplete_query("  ca "), None);
        assert_eq!(autocomplete_query("caf").as_deref(), Some("caf"));
        assert_eq!(autocomplete_query("  café  ").as_deref(), Some("café"));
    }

    #[test]
    fn test_validate_tracking_number() {
        assert_eq!(
            validate_tracking_number(" 1Z999AA10123456784 ").unwrap(),
            "1Z999AA10123456784"
        );
        assert!(validate_tracking_number("").is_err());
        assert!(validate_tracking_number("1Z 999").is_err());
        assert!(validate_tracking_number(&"9".repeat(101)).is_err());
    }

    #[test]
    fn test_invoice_filename() {
        assert_eq!(validate_invoice_filename("a.jpeg").unwrap(), "jpeg");
        assert!(validate_invoice_filename("noext").is_err());
        assert!(validate_invoice_filename("virus.pdf.exe").is_err());
    }

    #[test]
    fn test_field_errors() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.check(validate_required("nombre", " Ana ")), Some("Ana".to_string()));
        assert!(errors.is_empty());

        assert_eq!(errors.check(validate_required("apellido", "")), None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].field(), "apellido");
    }
}
