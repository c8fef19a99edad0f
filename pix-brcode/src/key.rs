//! PIX key classification, normalization and validation
//!
//! A PIX key is one of five shapes: a `+55` phone number, an e-mail address,
//! a CPF (11 digits), a CNPJ (14 digits) or a random UUID key. Raw user input
//! is normalized once with [`format_key`] and then matched against those shapes
//! in priority order.
//!
//! An 11-digit string without a `+` is both a valid CPF and a local phone
//! number missing its country code. [`is_ambiguous`] exposes that condition so
//! the caller can ask which one was meant and then use [`format_as_phone`] or
//! [`format_as_cpf`] (or [`resolve_key`] with a [`KeyHint`]).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Maximum key length: the merchant account template must fit 99 bytes
pub const MAX_KEY_LEN: usize = 77;

/// Country prefix added to local phone numbers
pub const PHONE_PREFIX: &str = "+55";

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+55[0-9]{10,11}$").expect("valid regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
static CPF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{11}$").expect("valid regex"));
static CNPJ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{14}$").expect("valid regex"));
static RANDOM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$")
        .expect("valid regex")
});
static INTL_PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[0-9]+$").expect("valid regex"));

/// Which key shape a string matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixKeyKind {
    Phone,
    Email,
    Cpf,
    Cnpj,
    Random,
    Unknown,
}

impl PixKeyKind {
    /// Short machine name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
            Self::Random => "random",
            Self::Unknown => "unknown",
        }
    }

    /// Human label shown next to a configured key
    pub fn label(&self) -> &'static str {
        match self {
            Self::Phone => "Phone",
            Self::Email => "E-mail",
            Self::Cpf => "CPF",
            Self::Cnpj => "CNPJ",
            Self::Random => "Random key",
            Self::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for PixKeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the caller resolved an ambiguous 11-digit key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyHint {
    Phone,
    Cpf,
}

impl FromStr for KeyHint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "phone" | "telefone" => Ok(Self::Phone),
            "cpf" => Ok(Self::Cpf),
            other => Err(Error::InvalidKeyFormat(format!("Unknown key hint: {}", other))),
        }
    }
}

/// A validated, normalized PIX key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PixKey {
    value: String,
    kind: PixKeyKind,
}

impl PixKey {
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> PixKeyKind {
        self.kind
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl fmt::Display for PixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for PixKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        validate_key(s)
    }
}

impl AsRef<str> for PixKey {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

/// `{valid, error?}` record handed to configuration forms, plus the
/// normalized key and its kind when valid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<PixKeyKind>,
}

/// Match an already-normalized key against the five shapes, in priority order.
pub fn classify(key: &str) -> PixKeyKind {
    if PHONE_RE.is_match(key) {
        PixKeyKind::Phone
    } else if EMAIL_RE.is_match(key) {
        PixKeyKind::Email
    } else if CPF_RE.is_match(key) {
        PixKeyKind::Cpf
    } else if CNPJ_RE.is_match(key) {
        PixKeyKind::Cnpj
    } else if RANDOM_RE.is_match(key) {
        PixKeyKind::Random
    } else {
        PixKeyKind::Unknown
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when `raw` holds exactly 11 digits and does not start with `+`.
///
/// Input with letters or an `@` is never ambiguous: digit runs inside an
/// e-mail or random key say nothing about CPF versus phone.
pub fn is_ambiguous(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') || trimmed.chars().any(|c| c == '@' || c.is_alphabetic()) {
        return false;
    }
    digits_only(trimmed).len() == 11
}

/// Treat `raw` as a Brazilian phone number.
pub fn format_as_phone(raw: &str) -> String {
    format!("{}{}", PHONE_PREFIX, digits_only(raw))
}

/// Treat `raw` as a CPF.
pub fn format_as_cpf(raw: &str) -> String {
    digits_only(raw)
}

/// Normalize raw input. Meant to run once on confirmation, not per keystroke.
pub fn format_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // 10 bare digits: area code + 8-digit number without country code
    if trimmed.len() == 10 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return format!("{}{}", PHONE_PREFIX, trimmed);
    }

    if INTL_PHONE_RE.is_match(trimmed) {
        return trimmed.to_string();
    }

    if trimmed.contains('@') {
        return trimmed.to_lowercase();
    }

    trimmed.to_string()
}

/// Normalize and validate raw input.
///
/// Ambiguous 11-digit input is accepted as CPF-shaped; use [`resolve_key`] to
/// force the caller to pick.
pub fn validate_key(raw: &str) -> Result<PixKey> {
    if raw.trim().is_empty() {
        return Err(Error::EmptyKey);
    }

    let value = format_key(raw);
    if value.chars().count() > MAX_KEY_LEN {
        return Err(Error::InvalidKeyFormat(format!(
            "key longer than {} characters",
            MAX_KEY_LEN
        )));
    }

    match classify(&value) {
        PixKeyKind::Unknown => Err(Error::InvalidKeyFormat(
            "use a phone (+55...), e-mail, CPF, CNPJ or random key".to_string(),
        )),
        kind => Ok(PixKey { value, kind }),
    }
}

/// Validate raw input, requiring a hint when it is ambiguous.
pub fn resolve_key(raw: &str, hint: Option<KeyHint>) -> Result<PixKey> {
    match hint {
        Some(KeyHint::Phone) => validate_key(&format_as_phone(raw)),
        Some(KeyHint::Cpf) => validate_key(&format_as_cpf(raw)),
        None if is_ambiguous(raw) => Err(Error::AmbiguousKey(raw.trim().to_string())),
        None => validate_key(raw),
    }
}

/// Outcome of [`resolve_key`] as a plain record.
pub fn validate_key_report(raw: &str, hint: Option<KeyHint>) -> KeyValidation {
    match resolve_key(raw, hint) {
        Ok(key) => KeyValidation {
            valid: true,
            error: None,
            kind: Some(key.kind),
            normalized: Some(key.value),
        },
        Err(e) => KeyValidation {
            valid: false,
            error: Some(e.to_string()),
            normalized: None,
            kind: None,
        },
    }
}
