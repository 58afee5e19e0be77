use anyhow::{anyhow, Context, Result};
use cashu_wallet_core::crypto::curve::{point_from_hex, point_to_hex, scalar_from_hex};
use cashu_wallet_core::crypto::encode_secret;
use cashu_wallet_core::utils::logging;
use cashu_wallet_core::wallet::split_amount;
use cashu_wallet_core::{
    blind_message, decode_token, derive_keyset_id, encode_token, hash_to_curve, unblind_signature,
    AmountPreference, HttpMintConnector, MintConfig, MintKeys, Token, Wallet,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::io::{self, Read};

#[derive(Parser)]
#[command(name = "cashu-wallet")]
#[command(about = "Blind signature primitives and mint queries for a Cashu ecash wallet")]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Mint base URL (defaults to CASHU_MINT_URL)
    #[arg(long, global = true)]
    mint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a hex-encoded message to a curve point
    #[command(name = "hash-to-curve")]
    HashToCurve {
        /// Message bytes as hex
        message: String,
    },
    /// Blind a secret, printing B_ and the blinding factor
    Blind {
        /// Secret bytes as hex
        secret: String,
        /// Blinding factor as hex (random when omitted)
        #[arg(long)]
        r: Option<String>,
    },
    /// Unblind a signature: C = C_ - r*A
    Unblind {
        /// Blinded signature C_ (compressed hex)
        #[arg(long)]
        c: String,
        /// Blinding factor as hex
        #[arg(long)]
        r: String,
        /// Mint public key A (compressed hex)
        #[arg(long)]
        a: String,
    },
    /// Split an amount into denominations
    Split {
        amount: u64,
        /// Preferred denominations, e.g. "8x2,1x4"
        #[arg(long)]
        preference: Option<String>,
    },
    /// Derive the keyset id of a keys JSON document ("-" for stdin)
    #[command(name = "keyset-id")]
    KeysetId { file: String },
    /// Decode a serialized token
    #[command(name = "decode-token")]
    DecodeToken { token: String },
    /// Encode a token JSON document ("-" for stdin)
    #[command(name = "encode-token")]
    EncodeToken { file: String },
    /// Fetch the mint's current keys
    Keys,
    /// Request an invoice to mint an amount
    #[command(name = "request-mint")]
    RequestMint { amount: u64 },
    /// Ask the mint for the fee reserve of an invoice
    #[command(name = "check-fees")]
    CheckFees { invoice: String },
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path))
    }
}

fn parse_preference(text: &str) -> Result<Vec<AmountPreference>> {
    text.split(',')
        .map(|part| {
            let (amount, count) = part
                .trim()
                .split_once('x')
                .ok_or_else(|| anyhow!("preference entry '{}' is not AMOUNTxCOUNT", part))?;
            Ok(AmountPreference::new(amount.trim().parse()?, count.trim().parse()?))
        })
        .collect()
}

fn emit(json_mode: bool, value: serde_json::Value, text: String) -> Result<()> {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn mint_wallet(mint: Option<String>) -> Result<Wallet<HttpMintConnector>> {
    let mut config = MintConfig::from_env()?;
    if let Some(url) = mint {
        config.mint_url = url;
    }
    let config = config.validated()?;
    let connector = HttpMintConnector::new(&config)?;
    Ok(Wallet::new(connector, config.mint_url))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.debug {
        logging::enable_debug();
    }
    let json_mode = cli.json;

    match cli.command {
        Commands::HashToCurve { message } => {
            let bytes = hex::decode(message.trim()).context("message must be hex")?;
            let point = point_to_hex(&hash_to_curve(&bytes)?);
            emit(json_mode, json!({ "point": point }), point.clone())
        }
        Commands::Blind { secret, r } => {
            let bytes = hex::decode(secret.trim()).context("secret must be hex")?;
            let r = r.map(|hex| scalar_from_hex(&hex)).transpose()?;
            let (blinded, r) = blind_message(&bytes, r)?;
            let blinded = point_to_hex(&blinded);
            let r = hex::encode(r.secret_bytes());
            let encoded = encode_secret(&bytes);
            emit(
                json_mode,
                json!({ "B_": blinded, "r": r, "secret": encoded }),
                format!("B_: {}\nr: {}\nsecret: {}", blinded, r, encoded),
            )
        }
        Commands::Unblind { c, r, a } => {
            let c = unblind_signature(&point_from_hex(&c)?, &scalar_from_hex(&r)?, &point_from_hex(&a)?)?;
            let c = point_to_hex(&c);
            emit(json_mode, json!({ "C": c }), c.clone())
        }
        Commands::Split { amount, preference } => {
            let preference = preference.as_deref().map(parse_preference).transpose()?;
            let parts = split_amount(amount, preference.as_deref())?;
            let text = parts.iter().map(u64::to_string).collect::<Vec<_>>().join(" ");
            emit(json_mode, json!({ "amount": amount, "denominations": parts }), text)
        }
        Commands::KeysetId { file } => {
            let keys: MintKeys = serde_json::from_str(&read_input(&file)?).context("parsing keys JSON")?;
            let id = derive_keyset_id(&keys);
            emit(json_mode, json!({ "id": id }), id.to_string())
        }
        Commands::DecodeToken { token } => {
            let token = decode_token(&token)?;
            let amount = token.total_amount()?;
            if json_mode {
                println!("{}", serde_json::to_string_pretty(&token)?);
            } else {
                println!("amount: {}", amount);
                for entry in &token.token {
                    println!("mint: {} ({} proofs, {})", entry.mint, entry.proofs.len(), entry.amount()?);
                }
                if let Some(memo) = &token.memo {
                    println!("memo: {}", memo);
                }
            }
            Ok(())
        }
        Commands::EncodeToken { file } => {
            let token: Token = serde_json::from_str(&read_input(&file)?).context("parsing token JSON")?;
            token.validate()?;
            let encoded = encode_token(&token)?;
            emit(json_mode, json!({ "token": encoded }), encoded.clone())
        }
        Commands::Keys => {
            let mut wallet = mint_wallet(cli.mint)?;
            let id = wallet.load_keys().await?;
            let keys = wallet.keys().ok_or_else(|| anyhow!("mint returned no keys"))?;
            if json_mode {
                println!("{}", serde_json::to_string_pretty(&json!({ "id": id, "keys": keys }))?);
            } else {
                println!("keyset: {}", id);
                for (amount, key) in keys.iter() {
                    println!("{:>10} {}", amount, point_to_hex(key));
                }
            }
            Ok(())
        }
        Commands::RequestMint { amount } => {
            let wallet = mint_wallet(cli.mint)?;
            let quote = wallet.request_mint(amount).await?;
            emit(
                json_mode,
                json!({ "pr": quote.pr, "hash": quote.hash }),
                format!("invoice: {}\nhash: {}", quote.pr, quote.hash),
            )
        }
        Commands::CheckFees { invoice } => {
            let wallet = mint_wallet(cli.mint)?;
            let fee = wallet.fee_estimate(&invoice).await?;
            emit(json_mode, json!({ "fee": fee }), fee.to_string())
        }
    }
}
