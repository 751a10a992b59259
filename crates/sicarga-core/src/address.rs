//! # Addresses and Contact Links
//!
//! Text the customer copies into online stores (their Miami mailbox
//! address) and links to reach the local office.
//!
//! ## Mailbox Address
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ Ana Reyes - 000015-000042                    │  ← who the package is for
//! │ 7801 NW 37th St, Doral, FL 33195             │  ← consolidator warehouse
//! └──────────────────────────────────────────────┘
//! ```

use url::form_urlencoded::byte_serialize;

/// Composes the Miami mailbox address a customer pastes at checkout.
///
/// ## Example
/// ```rust
/// use sicarga_core::address::compose_mailbox_address;
///
/// let text = compose_mailbox_address("Ana Reyes", Some("000015-000042"), "7801 NW 37th St");
/// assert_eq!(text, "Ana Reyes - 000015-000042\n7801 NW 37th St");
/// ```
pub fn compose_mailbox_address(name: &str, client_code: Option<&str>, consolidator: &str) -> String {
    let header = match client_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => format!("{} - {}", name.trim(), code),
        None => name.trim().to_string(),
    };

    let consolidator = consolidator.trim();
    if consolidator.is_empty() {
        header
    } else {
        format!("{}\n{}", header, consolidator)
    }
}

/// Joins the non-empty parts of a Honduran delivery address with `", "`.
///
/// ## Example
/// ```rust
/// use sicarga_core::address::compose_delivery_address;
///
/// assert_eq!(
///     compose_delivery_address("Col. Trejo, 5 calle", "San Pedro Sula", "Cortés"),
///     "Col. Trejo, 5 calle, San Pedro Sula, Cortés"
/// );
/// assert_eq!(compose_delivery_address("Barrio Abajo", "", "Cortés"), "Barrio Abajo, Cortés");
/// ```
pub fn compose_delivery_address(address: &str, city: &str, department: &str) -> String {
    [address, city, department]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keeps only the digits of a phone number (`"+504 9548-8535"` → `"50495488535"`).
pub fn whatsapp_digits(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn encode(text: &str) -> String {
    byte_serialize(text.as_bytes()).collect()
}

/// `https://wa.me/<digits>` with an optional pre-filled message.
pub fn whatsapp_url(number: &str, message: Option<&str>) -> String {
    let base = format!("https://wa.me/{}", whatsapp_digits(number));
    match message.filter(|m| !m.is_empty()) {
        Some(message) => format!("{}?text={}", base, encode(message)),
        None => base,
    }
}

pub fn google_maps_url(address: &str) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        encode(address)
    )
}

pub fn waze_url(address: &str) -> String {
    format!("https://waze.com/ul?q={}", encode(address))
}

// =============================================================================
// Unit Tests
// =============================================================================
