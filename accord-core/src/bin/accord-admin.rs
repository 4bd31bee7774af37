use accord_core::application::ContractRegistry;
use accord_core::domain::record::{decode_record, decode_record_hex, encode_record};
use accord_core::domain::{signing_progress, validate_record};
use accord_core::foundation::{AccordError, ContractId};
use accord_core::infrastructure::config::{load_config, load_config_with_profile, resolve_data_dir, AppConfig};
use accord_core::infrastructure::credentials::Argon2Issuer;
use accord_core::infrastructure::logging::init_logger;
use accord_core::infrastructure::notify::LogNotifier;
use accord_core::infrastructure::storage::{RegistryStorage, RocksStorage};
use log::info;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

struct Args {
    data_dir: PathBuf,
    profile: Option<String>,
    cmd: Command,
}

enum Command {
    Contract { id: ContractId },
    Chain { id: ContractId },
    VerifyChains,
    Intents,
    DecodeRecord { value: String, base64: bool },
    Checkpoint { path: PathBuf },
    Compact,
}

fn main() -> Result<(), AccordError> {
    let args = parse_args()?;

    if let Command::DecodeRecord { value, base64 } = &args.cmd {
        return decode_command(value, *base64);
    }

    let config = match args.profile.as_deref() {
        Some(profile) => load_config_with_profile(&args.data_dir, profile)?,
        None => load_config(&args.data_dir)?,
    };
    config.validate().map_err(|errors| AccordError::ConfigError(format!("validation failed: {}", errors.join("; "))))?;
    init_logger(&config.logging)?;

    let storage = Arc::new(RocksStorage::open_in_dir_with_options(&config.storage.data_dir, config.storage.allow_schema_wipe)?);
    info!("registry opened data_dir={}", config.storage.data_dir);

    match args.cmd {
        Command::Contract { id } => {
            let registry = registry(storage, &config)?;
            print_json(&registry.get_contract(id)?)
        }
        Command::Chain { id } => {
            let registry = registry(storage, &config)?;
            print_json(&registry.chain(id)?)
        }
        Command::VerifyChains => {
            let contracts = storage.list_contracts()?;
            let registry = registry(storage, &config)?;
            let mut broken = 0usize;
            for contract in contracts {
                let verification = registry.verify_chain(contract.id)?;
                if !verification.is_intact() {
                    broken += 1;
                }
                print_json(&verification)?;
            }
            if broken > 0 {
                return Err(AccordError::Message(format!("{} contract chain(s) broken", broken)));
            }
            Ok(())
        }
        Command::Intents => {
            for intent in storage.list_intents()? {
                print_json(&json!({
                    "contract_id": intent.contract_id,
                    "user_id": intent.user_id,
                    "previous": intent.previous.to_string(),
                    "submitted": intent.submitted.map(|tx| tx.to_string()),
                    "attempts": intent.attempts,
                    "created_at_nanos": intent.created_at_nanos,
                }))?;
            }
            Ok(())
        }
        Command::Checkpoint { path } => {
            storage.create_checkpoint(&path)?;
            println!("checkpoint created path={}", path.display());
            Ok(())
        }
        Command::Compact => {
            storage.compact()?;
            println!("compaction finished");
            Ok(())
        }
        Command::DecodeRecord { .. } => Ok(()),
    }
}

fn registry(storage: Arc<RocksStorage>, config: &AppConfig) -> Result<ContractRegistry, AccordError> {
    Ok(ContractRegistry::new(storage, Arc::new(Argon2Issuer::new(config.credentials)?), Arc::new(LogNotifier)))
}

fn decode_command(value: &str, base64: bool) -> Result<(), AccordError> {
    let record = if base64 {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        let bytes = STANDARD.decode(value.trim()).map_err(|err| AccordError::EncodingError(format!("base64 decode failed: {}", err)))?;
        decode_record(&bytes)?
    } else {
        decode_record_hex(value)?
    };
    let problems = validate_record(&record).err().unwrap_or_default();
    print_json(&json!({
        "record": record,
        "progress": signing_progress(&record),
        "canonical_hex": hex::encode(encode_record(&record)),
        "problems": problems,
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AccordError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_usage() {
    eprintln!(
        "Usage:\n\
  accord-admin [--data-dir DIR] [--profile NAME] <command> [command-args]\n\
\n\
Global options:\n\
  --data-dir DIR        Directory holding accord-config.toml (default: ACCORD_DATA_DIR or ./.accord)\n\
  --profile NAME        Apply [profiles.NAME] overrides\n\
\n\
Commands:\n\
  contract <id>\n\
  chain <id>\n\
  verify-chains\n\
  intents\n\
  decode-record <hex> [--base64]\n\
  checkpoint <path>\n\
  compact\n"
    );
}

fn parse_args() -> Result<Args, AccordError> {
    let mut data_dir = resolve_data_dir();
    let mut profile = None;

    let mut it = std::env::args().skip(1).peekable();
    while let Some(arg) = it.peek().cloned() {
        if !arg.starts_with('-') {
            break;
        }
        let arg = it.next().unwrap_or_default();
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--data-dir" => {
                let value = it.next().ok_or_else(|| AccordError::Message("--data-dir requires a value".to_string()))?;
                data_dir = PathBuf::from(value);
            }
            "--profile" => {
                profile = Some(it.next().ok_or_else(|| AccordError::Message("--profile requires a value".to_string()))?);
            }
            _ => return Err(AccordError::Message(format!("unknown option: {}", arg))),
        }
    }

    let cmd = it.next().ok_or_else(|| {
        print_usage();
        AccordError::Message("missing command".to_string())
    })?;
    let cmd = match cmd.as_str() {
        "contract" => Command::Contract { id: next_contract_id(&mut it, "contract")? },
        "chain" => Command::Chain { id: next_contract_id(&mut it, "chain")? },
        "verify-chains" => Command::VerifyChains,
        "intents" => Command::Intents,
        "decode-record" => {
            let value = it.next().ok_or_else(|| AccordError::Message("decode-record requires <hex>".to_string()))?;
            let base64 = match it.next().as_deref() {
                None => false,
                Some("--base64") => true,
                Some(other) => return Err(AccordError::Message(format!("unknown decode-record option: {}", other))),
            };
            Command::DecodeRecord { value, base64 }
        }
        "checkpoint" => {
            let path = it.next().ok_or_else(|| AccordError::Message("checkpoint requires <path>".to_string()))?;
            Command::Checkpoint { path: PathBuf::from(path) }
        }
        "compact" => Command::Compact,
        other => {
            print_usage();
            return Err(AccordError::Message(format!("unknown command: {}", other)));
        }
    };

    Ok(Args { data_dir, profile, cmd })
}

fn next_contract_id(it: &mut impl Iterator<Item = String>, command: &str) -> Result<ContractId, AccordError> {
    it.next().ok_or_else(|| AccordError::Message(format!("{} requires <id>", command)))?.parse()
}
