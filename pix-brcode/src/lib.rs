//! # PIX BR Code payloads
//!
//! This crate builds the EMV-QRCPS "Copia e Cola" payload that Brazilian
//! banking apps scan to pre-fill a PIX transfer, and validates the PIX keys
//! that go into it.
//!
//! ## Overview
//!
//! 1. Normalize and validate the recipient key with [`validate_key`]. An
//!    11-digit key is ambiguous between CPF and phone; check [`is_ambiguous`]
//!    and resolve it with [`resolve_key`].
//! 2. Describe the charge with [`PixPayloadBuilder`] (or a
//!    [`PixPaymentRequest`] directly).
//! 3. Encode it with [`encode_payload`]. The result ends in a CRC-16/CCITT-FALSE
//!    checksum and is ready to be shown as text or rendered as a QR code.
//!
//! ```rust
//! use pix_brcode::{validate_key, PixPayloadBuilder};
//!
//! let key = validate_key("test@example.com")?;
//! let payload = PixPayloadBuilder::new(&key, "Joao Silva", "sao paulo")
//!     .amount(10.0)
//!     .txid("TX123")
//!     .encode()?;
//! assert!(payload.starts_with("000201"));
//! assert!(payload.ends_with("6304775B"));
//! # Ok::<(), pix_brcode::Error>(())
//! ```
//!
//! Everything here is a pure function of its input; nothing is cached or
//! shared between calls.

mod amount;
mod config;
mod crc;
mod error;
mod key;
mod payload;
mod session;
pub mod tlv;

#[cfg(feature = "qrcode")]
mod qr;

pub use amount::{
    evaluate_expression, format_amount_input, format_brl, is_expression, parse_amount,
};
pub use config::{ConfigSet, RecipientConfig};
pub use crc::{crc16_ccitt, crc16_hex};
pub use error::{Error, Result};
pub use key::{
    classify, format_as_cpf, format_as_phone, format_key, is_ambiguous, resolve_key,
    validate_key, validate_key_report, KeyHint, KeyValidation, PixKey, PixKeyKind, MAX_KEY_LEN,
};
pub use payload::{
    encode_payload, format_amount, generate_txid, parse_payload, verify_crc, PixPayload,
    PixPayloadBuilder, PixPaymentRequest,
};
pub use session::{generate_session_id, is_session_id, session_url};

#[cfg(feature = "qrcode")]
pub use qr::{qr_data_uri, render_qr, QrFormat, QrOptions};

/// Globally unique identifier of the PIX arrangement (field 26/00)
pub const PIX_GUI: &str = "BR.GOV.BCB.PIX";

/// Payload format indicator value (field 00)
pub const PAYLOAD_FORMAT_INDICATOR: &str = "01";

/// Merchant category code; PIX leaves it unset
pub const MERCHANT_CATEGORY_CODE: &str = "0000";

/// ISO 4217 numeric code for BRL
pub const CURRENCY_BRL: &str = "986";

/// ISO 3166 country code
pub const COUNTRY_CODE: &str = "BR";

/// Merchant name is cut to this many characters
pub const MAX_NAME_LEN: usize = 25;

/// Merchant city is cut to this many characters
pub const MAX_CITY_LEN: usize = 15;

/// Transaction id is cut to this many characters
pub const MAX_TXID_LEN: usize = 25;

/// Description is cut to this many characters
pub const MAX_DESCRIPTION_LEN: usize = 72;

/// Field tags, top level and nested
pub mod tags {
    pub const PAYLOAD_FORMAT: &str = "00";
    pub const MERCHANT_ACCOUNT: &str = "26";
    pub const MERCHANT_CATEGORY: &str = "52";
    pub const CURRENCY: &str = "53";
    pub const AMOUNT: &str = "54";
    pub const COUNTRY: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const ADDITIONAL_DATA: &str = "62";
    pub const CRC: &str = "63";

    /// Inside 26
    pub const ACCOUNT_GUI: &str = "00";
    pub const ACCOUNT_KEY: &str = "01";

    /// Inside 62
    pub const ADDITIONAL_DESCRIPTION: &str = "02";
    pub const ADDITIONAL_TXID: &str = "05";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(PIX_GUI, "BR.GOV.BCB.PIX");
        assert_eq!(CURRENCY_BRL, "986");
        // 26 template: "0014" + GUI + "01" + "77" + key
        assert_eq!(4 + PIX_GUI.len() + 4 + MAX_KEY_LEN, tlv::MAX_VALUE_LEN);
    }
}
