//! # Identifiers and Display Names
//!
//! Customer codes, short names for warehouse labels, and internal tracking
//! numbers.
//!
//! ```text
//! Client #42, prefix "000015"       → codigo_cliente  "000015-000042"
//! "Juan Carlos" / "Pérez López"     → nombre_corto    "J.C.Pérez L"
//! new shipment                      → tracking        "SC-3F9A0C12BE"
//! ```

use uuid::Uuid;

/// Default client code prefix when the system parameter is not set.
pub const DEFAULT_CLIENT_CODE_PREFIX: &str = "000015";

/// Prefix of internally generated tracking numbers.
pub const TRACKING_PREFIX: &str = "SC-";

/// Short names are printed on warehouse labels; keep them label-sized.
pub const SHORT_NAME_MAX_CHARS: usize = 50;

/// Builds the label name: given-name initials, first surname, then the
/// initials of any further surnames.
///
/// ## Example
/// ```rust
/// use sicarga_core::naming::short_name;
///
/// assert_eq!(short_name("Juan Carlos", "Pérez López"), "J.C.Pérez L");
/// assert_eq!(short_name("ana", "reyes"), "A.reyes");
/// assert_eq!(short_name("", "Reyes"), "");
/// ```
pub fn short_name(first_names: &str, last_names: &str) -> String {
    if first_names.trim().is_empty() || last_names.trim().is_empty() {
        return String::new();
    }

    let initials: String = first_names
        .split_whitespace()
        .filter_map(|name| name.chars().next())
        .flat_map(|c| c.to_uppercase().chain(std::iter::once('.')))
        .collect();

    let mut surnames = last_names.split_whitespace();
    let Some(first_surname) = surnames.next() else {
        return initials;
    };

    let other_initials: String = surnames
        .filter_map(|name| name.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    let name = format!("{}{} {}", initials, first_surname, other_initials);
    name.trim_end().chars().take(SHORT_NAME_MAX_CHARS).collect()
}

/// Formats the customer code shown on the mailbox address.
///
/// ## Example
/// ```rust
/// use sicarga_core::naming::client_code;
///
/// assert_eq!(client_code("000015", 42), "000015-000042");
/// assert_eq!(client_code("HN", 1_234_567), "HN-1234567");
/// ```
pub fn client_code(prefix: &str, client_id: i64) -> String {
    format!("{}-{:06}", prefix.trim(), client_id)
}

/// `"first last"`, trimmed, for greetings and admin lists.
pub fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

/// Generates an internal tracking number: `SC-` and ten upper-case hex digits.
///
/// Collisions are possible in principle; the database column is UNIQUE and
/// callers retry on conflict.
pub fn generate_tracking_number() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", TRACKING_PREFIX, hex[..10].to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_single_surname_has_no_trailing_space() {
        assert_eq!(short_name("María José", "Fernández"), "M.J.Fernández");
    }

    #[test]
    fn test_short_name_three_surnames() {
        assert_eq!(
            short_name("Luis", "de la Cruz"),
            "L.de LC"
        );
    }

    #[test]
    fn test_short_name_accented_initials() {
        assert_eq!(short_name("Ángel", "Ñúñez Órtiz"), "Á.Ñúñez Ó");
    }

    #[test]
    fn test_short_name_blank_parts() {
        assert_eq!(short_name("Ana", "   "), "");
        assert_eq!(short_name("  ", "Reyes"), "");
    }

    #[test]
    fn test_short_name_truncated() {
        let long = "X".repeat(80);
        assert_eq!(short_name("Ana", &long).chars().count(), SHORT_NAME_MAX_CHARS);
    }

    #[test]
    fn test_client_code_padding() {
        assert_eq!(client_code(DEFAULT_CLIENT_CODE_PREFIX, 1), "000015-000001");
        assert_eq!(client_code(" 000015 ", 999_999), "000015-999999");
    }

    #[test]
    fn test_full_name() {
        assert_eq!(full_name(" Ana ", "Reyes"), "Ana Reyes");
        assert_eq!(full_name("", "Reyes"), "Reyes");
        assert_eq!(full_name("", ""), "");
    }

    #[test]
    fn test_tracking_number_format() {
        let tracking = generate_tracking_number();
        assert!(tracking.starts_with(TRACKING_PREFIX));
        assert_eq!(tracking.len(), 13);
        assert!(tracking[3..]
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_ne!(tracking, generate_tracking_number());
    }
}
