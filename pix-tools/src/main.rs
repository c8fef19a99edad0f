//! pix-tools
//!
//! Build, inspect and validate PIX BR Code payloads from the command line.

use std::{fs, io::Write, path::PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pix_brcode::{
    format_brl, generate_session_id, generate_txid, is_ambiguous, is_expression, parse_amount,
    parse_payload, render_qr, session_url, validate_key_report, ConfigSet, KeyHint, KeyValidation,
    QrOptions, RecipientConfig,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_VIEWER_ORIGIN: &str = "http://localhost:8080";

#[derive(Parser)]
#[command(
    name = "pix-tools",
    about = "Encode, decode and validate PIX BR Code payloads"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a BR Code payload for the configured recipient.
    Encode(EncodeArgs),
    /// Parse a payload and verify its checksum.
    Decode(DecodeArgs),
    /// Validate and classify a PIX key.
    ValidateKey(ValidateKeyArgs),
    /// Evaluate an amount expression such as "12,50 + 3x2".
    Calc(CalcArgs),
    /// Create a session id and the viewer link for it.
    Session(SessionArgs),
}

/// How to read an ambiguous 11-digit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KeyAs {
    Phone,
    Cpf,
}

impl From<KeyAs> for KeyHint {
    fn from(value: KeyAs) -> Self {
        match value {
            KeyAs::Phone => KeyHint::Phone,
            KeyAs::Cpf => KeyHint::Cpf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QrKind {
    Terminal,
    Svg,
    Png,
}

#[derive(Args)]
struct RecipientArgs {
    /// Recipient PIX key.
    #[arg(long, env = "PIX_KEY")]
    key: Option<String>,
    /// Recipient name (cut to 25 characters in the payload).
    #[arg(long, env = "PIX_RECIPIENT_NAME")]
    name: Option<String>,
    /// Recipient city (cut to 15 characters in the payload).
    #[arg(long, env = "PIX_RECIPIENT_CITY")]
    city: Option<String>,
    /// JSON file with a recipient record or a global/sessions set.
    #[arg(long, env = "PIX_CONFIG")]
    config: Option<PathBuf>,
    /// Session whose recipient record should be used.
    #[arg(long)]
    session: Option<String>,
    /// Read an ambiguous 11-digit key as a phone number or a CPF.
    #[arg(long, value_enum)]
    key_as: Option<KeyAs>,
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    recipient: RecipientArgs,
    /// Amount in BRL; arithmetic is allowed ("10 + 2,50"). Omit for an open amount.
    #[arg(long, allow_hyphen_values = true)]
    amount: Option<String>,
    /// Transaction id. Defaults to TX<unix millis>.
    #[arg(long, conflicts_with = "no_txid")]
    txid: Option<String>,
    /// Leave the transaction id out.
    #[arg(long)]
    no_txid: bool,
    /// Free-text description.
    #[arg(long)]
    description: Option<String>,
    /// Also render the payload as a QR code.
    #[arg(long, value_enum)]
    qr: Option<QrKind>,
    /// Where to write the QR code (required for png).
    #[arg(long)]
    output: Option<PathBuf>,
    /// PNG size in pixels.
    #[arg(long, default_value_t = 256)]
    size: u32,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DecodeArgs {
    /// Payload text ("Copia e Cola").
    payload: String,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ValidateKeyArgs {
    /// Raw key as typed.
    key: String,
    /// Read an ambiguous 11-digit key as a phone number or a CPF.
    #[arg(long = "as", value_enum)]
    key_as: Option<KeyAs>,
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CalcArgs {
    /// Expression; separate words are joined with spaces.
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    expression: Vec<String>,
}

#[derive(Args)]
struct SessionArgs {
    /// Origin the viewer link points at.
    #[arg(long, env = "PIX_VIEWER_ORIGIN", default_value = DEFAULT_VIEWER_ORIGIN)]
    origin: String,
}

#[derive(Serialize)]
struct EncodeOutput<'a> {
    payload: &'a str,
    amount: Option<f64>,
    amount_display: String,
    key_kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    txid: Option<&'a str>,
}

#[derive(Serialize)]
struct KeyOutput {
    #[serde(flatten)]
    report: KeyValidation,
    ambiguous: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pix_tools=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encode(args) => encode(args),
        Commands::Decode(args) => decode(args),
        Commands::ValidateKey(args) => validate_key_cmd(args),
        Commands::Calc(args) => calc(args),
        Commands::Session(args) => session(args),
    }
}

/// Flags and environment win over the config file, field by field.
fn resolve_recipient(args: &RecipientArgs) -> Result<RecipientConfig> {
    let from_file = match &args.config {
        Some(path) => {
            let set = ConfigSet::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            let record = set.resolve(args.session.as_deref()).cloned();
            tracing::debug!(
                path = %path.display(),
                session = ?args.session,
                found = record.is_some(),
                "loaded recipient config"
            );
            record
        }
        None => None,
    };

    let pick = |flag: &Option<String>, stored: Option<&String>, what: &str| {
        flag.clone()
            .or_else(|| stored.cloned())
            .ok_or_else(|| anyhow!("missing recipient {} (flag, environment or --config)", what))
    };

    Ok(RecipientConfig::new(
        pick(&args.key, from_file.as_ref().map(|c| &c.pix_key), "key")?,
        pick(&args.name, from_file.as_ref().map(|c| &c.recipient_name), "name")?,
        pick(&args.city, from_file.as_ref().map(|c| &c.recipient_city), "city")?,
    ))
}

fn encode(args: EncodeArgs) -> Result<()> {
    let recipient = resolve_recipient(&args.recipient)?;
    let key = recipient
        .validate(args.recipient.key_as.map(Into::into))
        .map_err(|e| {
            if is_ambiguous(&recipient.pix_key) {
                anyhow!("{} (pass --key-as phone or --key-as cpf)", e)
            } else {
                anyhow!(e)
            }
        })?;
    tracing::debug!(kind = %key.kind(), "resolved recipient key");

    let amount = match args.amount.as_deref() {
        Some(raw) => {
            let value = parse_amount(raw).with_context(|| format!("invalid amount {:?}", raw))?;
            if is_expression(raw) {
                tracing::info!("{} = {}", raw.trim(), value);
            }
            Some(value)
        }
        None => None,
    };

    let txid = if args.no_txid {
        None
    } else {
        Some(args.txid.clone().unwrap_or_else(|| generate_txid(chrono::Utc::now())))
    };

    let mut builder = recipient
        .payload_builder(&key)
        .amount(amount.unwrap_or(0.0));
    if let Some(txid) = &txid {
        builder = builder.txid(txid.clone());
    }
    if let Some(desc) = &args.description {
        builder = builder.description(desc.clone());
    }
    let payload = builder.encode()?;
    tracing::info!(len = payload.len(), txid = ?txid, "encoded payload");

    if args.json {
        let out = EncodeOutput {
            payload: &payload,
            amount,
            amount_display: amount.map(format_brl).unwrap_or_else(|| "open".to_string()),
            key_kind: key.kind().as_str(),
            txid: txid.as_deref(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", payload);
    }

    if let Some(kind) = args.qr {
        write_qr(&payload, kind, args.size, args.output.as_ref())?;
    }
    Ok(())
}

fn write_qr(payload: &str, kind: QrKind, size: u32, output: Option<&PathBuf>) -> Result<()> {
    let options = match kind {
        QrKind::Terminal => QrOptions::terminal(),
        QrKind::Svg => QrOptions::svg(),
        QrKind::Png => QrOptions::png(size),
    };
    let bytes = render_qr(payload, &options)?;

    match output {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote QR code");
        }
        None if kind == QrKind::Png => bail!("--output is required for png QR codes"),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn decode(args: DecodeArgs) -> Result<()> {
    let parsed = parse_payload(&args.payload)?;
    tracing::debug!(crc = %parsed.crc, "checksum verified");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("key:         {}", parsed.pix_key);
    match parsed.amount_value() {
        Some(value) => println!("amount:      {}", format_brl(value)),
        None => println!("amount:      open"),
    }
    println!("name:        {}", parsed.merchant_name);
    println!("city:        {}", parsed.merchant_city);
    if let Some(txid) = &parsed.txid {
        println!("txid:        {}", txid);
    }
    if let Some(desc) = &parsed.description {
        println!("description: {}", desc);
    }
    println!("crc:         {} (ok)", parsed.crc);
    Ok(())
}

fn validate_key_cmd(args: ValidateKeyArgs) -> Result<()> {
    let out = KeyOutput {
        report: validate_key_report(&args.key, args.key_as.map(Into::into)),
        ambiguous: is_ambiguous(&args.key),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if let (Some(normalized), Some(kind)) = (&out.report.normalized, out.report.kind) {
        println!("{} ({})", normalized, kind.label());
    }

    match out.report.error {
        None => Ok(()),
        Some(e) if out.ambiguous && args.key_as.is_none() => {
            bail!("{} (pass --as phone or --as cpf)", e)
        }
        Some(e) => bail!(e),
    }
}

fn calc(args: CalcArgs) -> Result<()> {
    let expression = args.expression.join(" ");
    let value = pix_brcode::evaluate_expression(&expression)?;
    tracing::debug!(%expression, value, "evaluated");
    println!("{}", pix_brcode::format_amount_input(value));
    Ok(())
}

fn session(args: SessionArgs) -> Result<()> {
    let id = generate_session_id(&mut rand::thread_rng());
    let url = session_url(&args.origin, &id)?;
    tracing::info!(session = %id, "created session");
    println!("{}", id);
    println!("{}", url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn recipient_args(config: Option<PathBuf>) -> RecipientArgs {
        RecipientArgs {
            key: None,
            name: None,
            city: None,
            config,
            session: None,
            key_as: None,
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config_file() {
        let path = std::env::temp_dir()
            .join(format!("pix-tools-config-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"pix_key": "a@b.co", "recipient_name": "Ana", "recipient_city": "Natal"}"#,
        )
        .unwrap();

        let mut args = recipient_args(Some(path.clone()));
        args.city = Some("Recife".to_string());
        let recipient = resolve_recipient(&args).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(recipient.pix_key, "a@b.co");
        assert_eq!(recipient.recipient_name, "Ana");
        assert_eq!(recipient.recipient_city, "Recife");
    }

    #[test]
    fn test_missing_recipient_fields() {
        let mut args = recipient_args(None);
        args.key = Some("a@b.co".to_string());
        let err = resolve_recipient(&args).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_blank_recipient_name_is_rejected() {
        let mut args = recipient_args(None);
        args.key = Some("a@b.co".to_string());
        args.name = Some("  ".to_string());
        args.city = Some("Natal".to_string());
        let recipient = resolve_recipient(&args).unwrap();
        assert!(recipient.validate(None).is_err());
    }

    #[test]
    fn test_key_output_json() {
        let raw = "joao12345678901@gmail.com";
        let out = KeyOutput {
            report: validate_key_report(raw, None),
            ambiguous: is_ambiguous(raw),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["normalized"], raw);
        assert_eq!(json["kind"], "email");
        assert_eq!(json["ambiguous"], false);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_calc_words_are_joined() {
        let cli = Cli::try_parse_from(["pix-tools", "calc", "10", "-", "2,5"]).unwrap();
        match cli.command {
            Commands::Calc(args) => assert_eq!(args.expression.join(" "), "10 - 2,5"),
            _ => panic!("expected calc"),
        }
    }
}
