//! BR Code ("PIX Copia e Cola") payload encoding and decoding
//!
//! ## Field layout
//!
//! ```text
//! 00 Payload Format Indicator   "01"
//! 26 Merchant Account Info      { 00 GUI "BR.GOV.BCB.PIX", 01 key }
//! 52 Merchant Category Code     "0000"
//! 53 Transaction Currency       "986"
//! 54 Transaction Amount         "12.50"      (omitted for open amounts)
//! 58 Country Code               "BR"
//! 59 Merchant Name              <= 25 chars
//! 60 Merchant City              <= 15 chars, uppercase
//! 62 Additional Data            { 05 txid, 02 description }   (optional)
//! 63 CRC16                      4 hex digits over everything before them
//! ```
//!
//! Oversized name, city, txid and description values are truncated silently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::crc::crc16_hex;
use crate::key::PixKey;
use crate::tlv::{self, read_fields, truncate_bytes, truncate_chars};
use crate::{
    tags, Error, Result, COUNTRY_CODE, CURRENCY_BRL, MAX_CITY_LEN, MAX_DESCRIPTION_LEN,
    MAX_NAME_LEN, MAX_TXID_LEN, MERCHANT_CATEGORY_CODE, PAYLOAD_FORMAT_INDICATOR, PIX_GUI,
};

/// Longest amount string the BR Code allows in tag 54
const MAX_AMOUNT_LEN: usize = 13;

/// Literal that opens the CRC field: tag 63, length 04
const CRC_PREFIX: &str = "6304";

/// Input to [`encode_payload`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixPaymentRequest {
    /// Validated PIX key, copied verbatim into field 26/01
    pub pix_key: String,
    /// Amount in BRL; 0 leaves the amount open
    pub amount: f64,
    pub merchant_name: String,
    pub merchant_city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PixPaymentRequest {
    /// Encode this request into a BR Code payload
    pub fn encode(&self) -> Result<String> {
        encode_payload(self)
    }
}

/// Builder for [`PixPaymentRequest`]
pub struct PixPayloadBuilder {
    request: PixPaymentRequest,
}

impl PixPayloadBuilder {
    /// Start a request for a validated key with an open amount
    pub fn new(
        key: &PixKey,
        merchant_name: impl Into<String>,
        merchant_city: impl Into<String>,
    ) -> Self {
        Self {
            request: PixPaymentRequest {
                pix_key: key.as_str().to_string(),
                amount: 0.0,
                merchant_name: merchant_name.into(),
                merchant_city: merchant_city.into(),
                txid: None,
                description: None,
            },
        }
    }

    /// Set the amount in BRL
    pub fn amount(mut self, amount: f64) -> Self {
        self.request.amount = amount;
        self
    }

    /// Set the transaction id
    pub fn txid(mut self, txid: impl Into<String>) -> Self {
        self.request.txid = Some(txid.into());
        self
    }

    /// Set a free-text description; empty strings are ignored
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        let desc = desc.into();
        self.request.description = if desc.is_empty() { None } else { Some(desc) };
        self
    }

    pub fn build(self) -> PixPaymentRequest {
        self.request
    }

    /// Build and encode in one step
    pub fn encode(self) -> Result<String> {
        encode_payload(&self.request)
    }
}

/// Transaction id in the `TX<unix millis>` form used by the operator screen
pub fn generate_txid(now: DateTime<Utc>) -> String {
    format!("TX{}", now.timestamp_millis())
}

/// Format an amount with exactly two decimals, `.` as separator.
pub fn format_amount(amount: f64) -> Result<String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount(format!("{}", amount)));
    }
    let cents = (amount * 100.0).round();
    if cents > u64::MAX as f64 {
        return Err(Error::InvalidAmount(format!("{} is too large", amount)));
    }
    let cents = cents as u64;
    let formatted = format!("{}.{:02}", cents / 100, cents % 100);
    if formatted.len() > MAX_AMOUNT_LEN {
        return Err(Error::InvalidAmount(format!(
            "{} exceeds {} characters",
            formatted, MAX_AMOUNT_LEN
        )));
    }
    Ok(formatted)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Cut to `max_chars` characters, then to whatever fits in `max_bytes`.
fn fit(value: &str, max_chars: usize, max_bytes: usize) -> &str {
    truncate_bytes(truncate_chars(value, max_chars), max_bytes)
}

fn additional_data(txid: Option<&str>, description: Option<&str>) -> Result<String> {
    let mut data = String::new();
    if let Some(txid) = txid {
        let txid = fit(txid, MAX_TXID_LEN, tlv::MAX_VALUE_LEN - 4);
        tlv::push_field(&mut data, tags::ADDITIONAL_TXID, txid)?;
    }
    if let Some(desc) = description {
        // Both subfields share the 99-byte template; the description gives way
        if let Some(room) = tlv::MAX_VALUE_LEN.checked_sub(data.len() + 4) {
            let desc = fit(desc, MAX_DESCRIPTION_LEN, room);
            tlv::push_field(&mut data, tags::ADDITIONAL_DESCRIPTION, desc)?;
        }
    }
    Ok(data)
}

/// Build the EMV-QRCPS payload for `request`, including the trailing CRC.
///
/// The key is not re-validated; callers pass the output of
/// [`crate::validate_key`].
pub fn encode_payload(request: &PixPaymentRequest) -> Result<String> {
    if !request.amount.is_finite() || request.amount < 0.0 {
        return Err(Error::InvalidAmount(format!("{}", request.amount)));
    }

    let mut payload = String::with_capacity(160);
    tlv::push_field(&mut payload, tags::PAYLOAD_FORMAT, PAYLOAD_FORMAT_INDICATOR)?;

    let mut account = tlv::field(tags::ACCOUNT_GUI, PIX_GUI)?;
    tlv::push_field(&mut account, tags::ACCOUNT_KEY, &request.pix_key)?;
    tlv::push_field(&mut payload, tags::MERCHANT_ACCOUNT, &account)?;

    tlv::push_field(&mut payload, tags::MERCHANT_CATEGORY, MERCHANT_CATEGORY_CODE)?;
    tlv::push_field(&mut payload, tags::CURRENCY, CURRENCY_BRL)?;

    if request.amount > 0.0 {
        tlv::push_field(&mut payload, tags::AMOUNT, &format_amount(request.amount)?)?;
    }

    tlv::push_field(&mut payload, tags::COUNTRY, COUNTRY_CODE)?;
    tlv::push_field(
        &mut payload,
        tags::MERCHANT_NAME,
        fit(&request.merchant_name, MAX_NAME_LEN, tlv::MAX_VALUE_LEN),
    )?;
    let city = request.merchant_city.to_uppercase();
    tlv::push_field(
        &mut payload,
        tags::MERCHANT_CITY,
        fit(&city, MAX_CITY_LEN, tlv::MAX_VALUE_LEN),
    )?;

    let txid = non_empty(&request.txid);
    let description = non_empty(&request.description);
    if txid.is_some() || description.is_some() {
        let data = additional_data(txid, description)?;
        tlv::push_field(&mut payload, tags::ADDITIONAL_DATA, &data)?;
    }

    payload.push_str(CRC_PREFIX);
    let crc = crc16_hex(&payload);
    payload.push_str(&crc);
    Ok(payload)
}

/// A decoded BR Code payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixPayload {
    pub pix_key: String,
    /// Amount string exactly as encoded, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub merchant_name: String,
    pub merchant_city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub crc: String,
}

impl PixPayload {
    /// Amount as a number; `None` for open-amount payloads
    pub fn amount_value(&self) -> Option<f64> {
        self.amount.as_deref().and_then(|a| a.parse().ok())
    }
}

impl FromStr for PixPayload {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_payload(s)
    }
}

impl fmt::Display for PixPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self.amount.as_deref().unwrap_or("open");
        write!(
            f,
            "{} ({}, {}) amount={} key={}",
            self.merchant_name, self.merchant_city, self.crc, amount, self.pix_key
        )
    }
}

/// Verify the trailing CRC of `payload`.
pub fn verify_crc(payload: &str) -> Result<()> {
    let split = payload
        .len()
        .checked_sub(4)
        .filter(|&at| payload.is_char_boundary(at))
        .ok_or_else(|| Error::InvalidPayload("Payload too short".to_string()))?;
    let (body, found) = payload.split_at(split);
    if !body.ends_with(CRC_PREFIX) {
        return Err(Error::InvalidPayload("Missing CRC field (6304)".to_string()));
    }
    let expected = crc16_hex(body);
    if !expected.eq_ignore_ascii_case(found) {
        return Err(Error::ChecksumMismatch {
            expected,
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Parse and checksum-verify a BR Code payload.
pub fn parse_payload(payload: &str) -> Result<PixPayload> {
    let payload = payload.trim();
    verify_crc(payload)?;

    let mut pix_key = None;
    let mut amount = None;
    let mut merchant_name = None;
    let mut merchant_city = None;
    let mut txid = None;
    let mut description = None;
    let mut crc = None;

    for (index, field) in read_fields(payload)?.into_iter().enumerate() {
        match field.tag {
            tags::PAYLOAD_FORMAT => {
                if index != 0 || field.value != PAYLOAD_FORMAT_INDICATOR {
                    return Err(Error::InvalidPayload(format!(
                        "Unexpected payload format indicator: {}",
                        field.value
                    )));
                }
            }
            tags::MERCHANT_ACCOUNT => {
                let mut gui = None;
                for inner in read_fields(field.value)? {
                    match inner.tag {
                        tags::ACCOUNT_GUI => gui = Some(inner.value),
                        tags::ACCOUNT_KEY => pix_key = Some(inner.value.to_string()),
                        _ => {}
                    }
                }
                if !gui.is_some_and(|g| g.eq_ignore_ascii_case(PIX_GUI)) {
                    return Err(Error::InvalidPayload("Not a PIX merchant account".to_string()));
                }
            }
            tags::CURRENCY => {
                if field.value != CURRENCY_BRL {
                    return Err(Error::InvalidPayload(format!(
                        "Unsupported currency: {}",
                        field.value
                    )));
                }
            }
            tags::AMOUNT => amount = Some(field.value.to_string()),
            tags::MERCHANT_NAME => merchant_name = Some(field.value.to_string()),
            tags::MERCHANT_CITY => merchant_city = Some(field.value.to_string()),
            tags::ADDITIONAL_DATA => {
                for inner in read_fields(field.value)? {
                    match inner.tag {
                        tags::ADDITIONAL_TXID => txid = Some(inner.value.to_string()),
                        tags::ADDITIONAL_DESCRIPTION => description = Some(inner.value.to_string()),
                        _ => {}
                    }
                }
            }
            tags::CRC => crc = Some(field.value.to_string()),
            // Other fields (MCC, country, unreserved templates) are not surfaced
            _ => {}
        }
    }

    Ok(PixPayload {
        pix_key: pix_key.ok_or_else(|| Error::InvalidPayload("Missing PIX key".to_string()))?,
        amount,
        merchant_name: merchant_name
            .ok_or_else(|| Error::InvalidPayload("Missing merchant name".to_string()))?,
        merchant_city: merchant_city
            .ok_or_else(|| Error::InvalidPayload("Missing merchant city".to_string()))?,
        txid,
        description,
        crc: crc.ok_or_else(|| Error::InvalidPayload("Missing CRC".to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_key;

    fn request() -> PixPaymentRequest {
        PixPaymentRequest {
            pix_key: "test@example.com".to_string(),
            amount: 10.0,
            merchant_name: "Joao Silva".to_string(),
            merchant_city: "sao paulo".to_string(),
            txid: Some("TX123".to_string()),
            description: None,
        }
    }

    #[test]
    fn test_end_to_end_payload() {
        let payload = encode_payload(&request()).unwrap();
        assert_eq!(
            payload,
            "00020126380014BR.GOV.BCB.PIX0116test@example.com\
             520400005303986540510.005802BR5910Joao Silva6009SAO PAULO\
             62090505TX1236304775B"
        );
    }

    #[test]
    fn test_open_amount_omits_tag_54() {
        let mut req = request();
        req.amount = 0.0;
        req.txid = None;
        req.pix_key = "+5511999998888".to_string();
        req.merchant_name = "Loja".to_string();
        req.merchant_city = "Rio de Janeiro".to_string();
        let payload = encode_payload(&req).unwrap();
        assert_eq!(
            payload,
            "00020126360014BR.GOV.BCB.PIX0114+5511999998888\
             5204000053039865802BR5904Loja6014RIO DE JANEIRO630400AF"
        );
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(format_amount(12.5).unwrap(), "12.50");
        assert_eq!(format_amount(10.0).unwrap(), "10.00");
        assert_eq!(format_amount(0.1 + 0.2).unwrap(), "0.30");
        assert_eq!(format_amount(1234.567).unwrap(), "1234.57");
        assert!(format_amount(1e12).is_err());
    }

    #[test]
    fn test_invalid_amounts() {
        let mut req = request();
        for bad in [-0.01, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            req.amount = bad;
            assert!(matches!(encode_payload(&req), Err(Error::InvalidAmount(_))));
        }
    }

    #[test]
    fn test_description_only() {
        let key = validate_key("12345678901").unwrap();
        let payload = PixPayloadBuilder::new(&key, "Maria", "curitiba")
            .amount(12.5)
            .description("Cafe")
            .encode()
            .unwrap();
        assert_eq!(
            payload,
            "00020126330014BR.GOV.BCB.PIX011112345678901\
             520400005303986540512.505802BR5905Maria6008CURITIBA\
             62080204Cafe6304168B"
        );
    }

    #[test]
    fn test_empty_optionals_are_absent() {
        let key = validate_key("a@b.co").unwrap();
        let payload = PixPayloadBuilder::new(&key, "Ana", "Natal")
            .txid("")
            .description("")
            .encode()
            .unwrap();
        assert!(payload.contains("5802BR5903Ana6005NATAL6304"));
    }

    #[test]
    fn test_additional_data_fits_template() {
        let key = validate_key("a@b.co").unwrap();
        let payload = PixPayloadBuilder::new(&key, "Ana", "Natal")
            .txid("T".repeat(40))
            .description("d".repeat(100))
            .encode()
            .unwrap();
        let parsed = parse_payload(&payload).unwrap();
        assert_eq!(parsed.txid.as_deref().map(str::len), Some(25));
        // 99 - (4 + 25) - 4
        assert_eq!(parsed.description.as_deref().map(str::len), Some(66));
    }

    #[test]
    fn test_oversized_key_is_reported() {
        let mut req = request();
        req.pix_key = "k".repeat(90);
        assert!(matches!(encode_payload(&req), Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn test_generate_txid() {
        let now = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        assert_eq!(generate_txid(now), "TX1700000000123");
    }

    #[test]
    fn test_parse_roundtrip() {
        let payload = encode_payload(&request()).unwrap();
        let parsed: PixPayload = payload.parse().unwrap();
        assert_eq!(parsed.pix_key, "test@example.com");
        assert_eq!(parsed.amount.as_deref(), Some("10.00"));
        assert_eq!(parsed.amount_value(), Some(10.0));
        assert_eq!(parsed.merchant_name, "Joao Silva");
        assert_eq!(parsed.merchant_city, "SAO PAULO");
        assert_eq!(parsed.txid.as_deref(), Some("TX123"));
        assert_eq!(parsed.description, None);
        assert_eq!(parsed.crc, "775B");
    }

    #[test]
    fn test_parse_central_bank_example() {
        let parsed = parse_payload(
            "00020126580014br.gov.bcb.pix0136123e4567-e12b-12d1-a456-426655440000\
             5204000053039865802BR5913Fulano de Tal6008BRASILIA62070503***63041D3D",
        )
        .unwrap();
        assert_eq!(parsed.pix_key, "123e4567-e12b-12d1-a456-426655440000");
        assert_eq!(parsed.amount, None);
        assert_eq!(parsed.merchant_name, "Fulano de Tal");
        assert_eq!(parsed.txid.as_deref(), Some("***"));
    }

    #[test]
    fn test_parse_detects_corruption() {
        let payload = encode_payload(&request()).unwrap();
        let tampered = payload.replace("10.00", "99.00");
        assert!(matches!(
            parse_payload(&tampered),
            Err(Error::ChecksumMismatch { .. })
        ));
        assert!(matches!(parse_payload("6304"), Err(Error::InvalidPayload(_))));
        assert!(matches!(parse_payload("12"), Err(Error::InvalidPayload(_))));
    }
}
