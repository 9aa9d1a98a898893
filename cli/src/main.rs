use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use issuance_ledger::{
    AuditEvent, Dispatcher, InitializeArgs, Instruction, JournalStore, LedgerSettings,
    MintConfig, SupplyLedger, TransitionResult, TransitionStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, write_keypair_file, Keypair, Signer};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "issuer", version, about = "Stablecoin issuance ledger CLI")]
struct Cli {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    keypair: Option<String>,

    #[arg(long)]
    ledger: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    Keygen(KeygenArgs),
    Address,
    Init(InitArgs),
    Mint(MintArgs),
    Burn(BurnArgs),
    Transfer(MintArgs),
    Pause,
    Unpause,
    RotateAuthority(AddressArgs),
    /// Re-enables writes on a halted ledger once the supply adds up.
    Resume,
    Status,
    Supply,
    Balance(BalanceArgs),
    Account(AddressArgs),
    Holders(HoldersArgs),
    AuditLog(AuditLogArgs),
}

#[derive(Parser)]
struct KeygenArgs {
    #[arg(long)]
    outfile: Option<String>,

    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct InitArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    symbol: String,

    #[arg(long, default_value_t = 6)]
    decimals: u8,

    /// Defaults to the signer.
    #[arg(long)]
    authority: Option<String>,
}

#[derive(Parser)]
struct MintArgs {
    recipient: String,
    amount: String,
}

#[derive(Parser)]
struct BurnArgs {
    amount: String,

    /// Holder to burn from; defaults to the signer.
    #[arg(long)]
    from: Option<String>,
}

#[derive(Parser)]
struct AddressArgs {
    address: String,
}

#[derive(Parser)]
struct BalanceArgs {
    address: Option<String>,
}

#[derive(Parser)]
struct HoldersArgs {
    #[arg(long)]
    min_balance: Option<String>,
}

#[derive(Parser)]
struct AuditLogArgs {
    #[arg(long)]
    action: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    run(cli)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let ctx = build_context(&cli)?;

    match &cli.command {
        Commands::Keygen(args) => handle_keygen(&ctx, args),
        Commands::Address => handle_address(&ctx),
        Commands::Init(args) => handle_init(&ctx, args),
        Commands::Mint(args) => handle_mint(&ctx, args),
        Commands::Burn(args) => handle_burn(&ctx, args),
        Commands::Transfer(args) => handle_transfer(&ctx, args),
        Commands::Pause => handle_submit(&ctx, Instruction::Pause),
        Commands::Unpause => handle_submit(&ctx, Instruction::Unpause),
        Commands::RotateAuthority(args) => {
            let new_authority = parse_pubkey(&args.address)?;
            handle_submit(&ctx, Instruction::RotateAuthority { new_authority })
        }
        Commands::Resume => handle_resume(&ctx),
        Commands::Status => handle_status(&ctx),
        Commands::Supply => handle_supply(&ctx),
        Commands::Balance(args) => handle_balance(&ctx, args),
        Commands::Account(args) => handle_account(&ctx, args),
        Commands::Holders(args) => handle_holders(&ctx, args),
        Commands::AuditLog(args) => handle_audit_log(&ctx, args),
    }
}

fn build_context(cli: &Cli) -> Result<OwnedContext> {
    let config = match cli.config.as_deref() {
        Some(path) => load_issuer_config(&expand_tilde(path))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                load_issuer_config(&path)?
            } else {
                IssuerConfig::default()
            }
        }
    };

    let journal_path = if let Some(value) = cli.ledger.as_deref() {
        expand_tilde(value)
    } else if let Some(value) = config.journal.as_deref() {
        expand_tilde(value)
    } else {
        default_journal_path()
    };

    let keypair_path = if let Some(value) = cli.keypair.as_deref() {
        Some(expand_tilde(value))
    } else if let Some(value) = config.keypair.as_deref() {
        Some(expand_tilde(value))
    } else {
        load_solana_cli_config()
            .ok()
            .map(|solana| expand_tilde(&solana.keypair_path))
    };

    Ok(OwnedContext {
        settings: config.ledger,
        journal_path,
        keypair_path,
        output: cli.output,
    })
}

struct OwnedContext {
    settings: LedgerSettings,
    journal_path: PathBuf,
    keypair_path: Option<PathBuf>,
    output: OutputFormat,
}

impl OwnedContext {
    fn keypair_path(&self) -> Result<&Path> {
        self.keypair_path.as_deref().ok_or_else(|| {
            anyhow!("Missing keypair path. Use --keypair, the config file or Solana CLI config.")
        })
    }

    fn signer(&self) -> Result<Keypair> {
        let path = self.keypair_path()?;
        read_keypair_file(path)
            .map_err(|err| anyhow!("Failed to read keypair {}: {}", path.display(), err))
    }

    fn open_store(&self) -> Result<Arc<JournalStore>> {
        let store = JournalStore::open_waiting(
            &self.journal_path,
            self.settings.sync_writes,
            self.settings.lock_timeout(),
        )
            .map_err(|err| anyhow!("Failed to open journal {}: {}", self.journal_path.display(), err))?;
        Ok(Arc::new(store))
    }

    fn open_ledger(&self) -> Result<SupplyLedger> {
        SupplyLedger::open(self.open_store()?, self.settings.clone())
            .map_err(|err| anyhow!("Failed to open ledger: {}", err))
    }
}

fn handle_keygen(ctx: &OwnedContext, args: &KeygenArgs) -> Result<()> {
    let path = match args.outfile.as_deref() {
        Some(value) => expand_tilde(value),
        None => ctx.keypair_path()?.to_path_buf(),
    };
    if path.exists() && !args.force {
        return Err(anyhow!(
            "Refusing to overwrite {} (use --force)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let keypair = Keypair::new();
    write_keypair_file(&keypair, &path)
        .map_err(|err| anyhow!("Failed to write keypair {}: {}", path.display(), err))?;

    if ctx.output == OutputFormat::Json {
        print_json(&KeygenOutput {
            pubkey: keypair.pubkey().to_string(),
            outfile: path.display().to_string(),
        })
    } else {
        println!("Wrote keypair to {}", path.display());
        println!("Pubkey: {}", keypair.pubkey());
        Ok(())
    }
}

fn handle_address(ctx: &OwnedContext) -> Result<()> {
    let signer = ctx.signer()?;
    if ctx.output == OutputFormat::Json {
        print_json(&AddressOutput {
            address: signer.pubkey().to_string(),
        })
    } else {
        println!("{}", signer.pubkey());
        Ok(())
    }
}

fn handle_init(ctx: &OwnedContext, args: &InitArgs) -> Result<()> {
    let authority = match args.authority.as_deref() {
        Some(value) => parse_pubkey(value)?,
        None => ctx.signer()?.pubkey(),
    };
    let ledger = SupplyLedger::initialize(
        ctx.open_store()?,
        ctx.settings.clone(),
        InitializeArgs {
            authority,
            name: args.name.clone(),
            symbol: args.symbol.clone(),
            decimals: args.decimals,
        },
    )
    .map_err(|err| anyhow!("Failed to initialize ledger: {}", err))?;
    let config = ledger_call(ledger.config())?;

    if ctx.output == OutputFormat::Json {
        print_json(&InitOutput {
            authority: config.authority.to_string(),
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            journal: ctx.journal_path.display().to_string(),
        })
    } else {
        println!("Ledger initialized");
        println!("Journal: {}", ctx.journal_path.display());
        println!("Authority: {}", config.authority);
        println!("Token: {} ({})", config.name, config.symbol);
        println!("Decimals: {}", config.decimals);
        Ok(())
    }
}

fn handle_mint(ctx: &OwnedContext, args: &MintArgs) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let config = ledger_call(ledger.config())?;
    let to = parse_pubkey(&args.recipient)?;
    let amount = parse_amount(&args.amount, config.decimals)?;
    submit(ctx, ledger, Instruction::Mint { to, amount })
}

fn handle_burn(ctx: &OwnedContext, args: &BurnArgs) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let config = ledger_call(ledger.config())?;
    let from = match args.from.as_deref() {
        Some(value) => parse_pubkey(value)?,
        None => ctx.signer()?.pubkey(),
    };
    let amount = parse_amount(&args.amount, config.decimals)?;
    submit(ctx, ledger, Instruction::Burn { from, amount })
}

fn handle_transfer(ctx: &OwnedContext, args: &MintArgs) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let config = ledger_call(ledger.config())?;
    let to = parse_pubkey(&args.recipient)?;
    let amount = parse_amount(&args.amount, config.decimals)?;
    submit(ctx, ledger, Instruction::Transfer { to, amount })
}

fn handle_submit(ctx: &OwnedContext, instruction: Instruction) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    submit(ctx, ledger, instruction)
}

/// Signs `instruction`, dispatches it and prints the result record. A
/// rejected transition is returned as an error so the process exits non-zero.
fn submit(ctx: &OwnedContext, ledger: SupplyLedger, instruction: Instruction) -> Result<()> {
    let signer = ctx.signer()?;
    let decimals = ledger_call(ledger.config())?.decimals;
    let signed = ledger_call(instruction.sign(&signer))?;
    let dispatcher = Dispatcher::new(Arc::new(ledger));
    let result = dispatcher.dispatch_signed(&signed);

    let output = ResultOutput::new(&result, decimals);
    if ctx.output == OutputFormat::Json {
        print_json(&output)?;
    } else {
        print_result(&output);
    }

    match result.error {
        Some(kind) if result.status == TransitionStatus::Rejected => Err(anyhow!(
            "{} rejected: {}",
            result.instruction,
            kind
        )),
        _ => Ok(()),
    }
}

fn handle_status(ctx: &OwnedContext) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let config = ledger_call(ledger.config())?;
    let holders = ledger_call(ledger.holders())?;

    if ctx.output == OutputFormat::Json {
        print_json(&StatusOutput {
            journal: ctx.journal_path.display().to_string(),
            authority: config.authority.to_string(),
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            decimals: config.decimals,
            is_paused: config.paused,
            is_halted: ledger.is_halted(),
            total_supply: config.total_supply.to_string(),
            total_minted: config.total_minted.to_string(),
            total_burned: config.total_burned.to_string(),
            audit_counter: config.audit_counter,
            holders: holders.len(),
        })
    } else {
        println!("Stablecoin status");
        println!("Journal: {}", ctx.journal_path.display());
        println!("Token: {} ({})", config.name, config.symbol);
        println!("Authority: {}", config.authority);
        println!("Status: {}", status_label(&config, ledger.is_halted()));
        println!(
            "Supply: {}",
            format_amount(config.total_supply, config.decimals)
        );
        println!("Total minted: {}", config.total_minted);
        println!("Total burned: {}", config.total_burned);
        println!("Audit counter: {}", config.audit_counter);
        println!("Holders: {}", holders.len());
        Ok(())
    }
}

fn status_label(config: &MintConfig, halted: bool) -> &'static str {
    if halted {
        "Halted"
    } else if config.paused {
        "Paused"
    } else {
        "Active"
    }
}

fn handle_resume(ctx: &OwnedContext) -> Result<()> {
    let signer = ctx.signer()?;
    let ledger = ctx.open_ledger()?;
    let config = ledger_call(ledger.config())?;
    if signer.pubkey() != config.authority {
        return Err(anyhow!(
            "Only the mint authority {} can resume writes",
            config.authority
        ));
    }
    let was_halted = ledger.is_halted();
    let audit = ledger_call(ledger.resume_writes())?;

    if ctx.output == OutputFormat::Json {
        print_json(&SupplyOutput {
            supply: audit.total_supply.to_string(),
            holder_sum: audit.holder_sum.to_string(),
            holders: audit.holders,
            consistent: audit.is_consistent(),
        })
    } else {
        if was_halted {
            println!("Writes resumed");
        } else {
            println!("Ledger was not halted");
        }
        println!("Supply: {}", format_amount(audit.total_supply, config.decimals));
        Ok(())
    }
}

fn handle_supply(ctx: &OwnedContext) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let decimals = ledger_call(ledger.config())?.decimals;
    let audit = ledger_call(ledger.verify_supply())?;

    if ctx.output == OutputFormat::Json {
        print_json(&SupplyOutput {
            supply: audit.total_supply.to_string(),
            holder_sum: audit.holder_sum.to_string(),
            holders: audit.holders,
            consistent: audit.is_consistent(),
        })
    } else {
        println!("Supply: {}", format_amount(audit.total_supply, decimals));
        println!("Holders: {}", audit.holders);
        println!(
            "Invariant: {}",
            if audit.is_consistent() {
                "ok"
            } else {
                "VIOLATED"
            }
        );
        Ok(())
    }
}

fn handle_balance(ctx: &OwnedContext, args: &BalanceArgs) -> Result<()> {
    let owner = match args.address.as_deref() {
        Some(value) => parse_pubkey(value)?,
        None => ctx.signer()?.pubkey(),
    };
    let ledger = ctx.open_ledger()?;
    let decimals = ledger_call(ledger.config())?.decimals;
    let balance = ledger_call(ledger.balance_of(&owner))?;

    if ctx.output == OutputFormat::Json {
        print_json(&BalanceOutput {
            owner: owner.to_string(),
            amount: balance,
            ui_amount: format_amount(balance, decimals),
        })
    } else {
        println!("{}", format_amount(balance, decimals));
        Ok(())
    }
}

fn handle_account(ctx: &OwnedContext, args: &AddressArgs) -> Result<()> {
    let owner = parse_pubkey(&args.address)?;
    let ledger = ctx.open_ledger()?;
    let decimals = ledger_call(ledger.config())?.decimals;
    let holder = ledger
        .holder(&owner)
        .map_err(|err| anyhow!("No account for {}: {}", owner, err))?;

    if ctx.output == OutputFormat::Json {
        print_json(&BalanceOutput {
            owner: holder.owner.to_string(),
            amount: holder.balance,
            ui_amount: format_amount(holder.balance, decimals),
        })
    } else {
        println!("Owner: {}", holder.owner);
        println!("Balance: {}", format_amount(holder.balance, decimals));
        Ok(())
    }
}

fn handle_holders(ctx: &OwnedContext, args: &HoldersArgs) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let decimals = ledger_call(ledger.config())?.decimals;
    let min_balance = match args.min_balance.as_deref() {
        Some(value) => Some(parse_amount(value, decimals)?),
        None => None,
    };

    let mut holders: Vec<HolderInfo> = ledger_call(ledger.holders())?
        .into_iter()
        .filter(|holder| min_balance.map_or(true, |min| holder.balance >= min))
        .map(|holder| HolderInfo {
            owner: holder.owner.to_string(),
            amount: holder.balance,
        })
        .collect();
    holders.sort_by(|a, b| b.amount.cmp(&a.amount));

    if ctx.output == OutputFormat::Json {
        print_json(&HoldersOutput { holders })
    } else {
        if holders.is_empty() {
            println!("No holders found");
        } else {
            for holder in holders {
                println!("{} {}", holder.owner, format_amount(holder.amount, decimals));
            }
        }
        Ok(())
    }
}

fn handle_audit_log(ctx: &OwnedContext, args: &AuditLogArgs) -> Result<()> {
    let ledger = ctx.open_ledger()?;
    let entries: Vec<AuditEntry> = ledger_call(ledger.audit_log())?
        .into_iter()
        .filter(|(_, event)| {
            args.action
                .as_deref()
                .map_or(true, |action| event.action() == action)
        })
        .map(|(seq, event)| AuditEntry::new(seq, &event))
        .collect();

    if ctx.output == OutputFormat::Json {
        print_json(&AuditLogOutput { entries })
    } else {
        if entries.is_empty() {
            println!("No audit entries");
        }
        for entry in entries {
            println!(
                "{:>6} {} {:<16} {}",
                entry.seq, entry.timestamp, entry.action, entry.details
            );
        }
        Ok(())
    }
}

fn ledger_call<T>(result: anchor_lang::Result<T>) -> Result<T> {
    result.map_err(|err| anyhow!("Ledger error: {}", err))
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IssuerConfig {
    keypair: Option<String>,
    journal: Option<String>,
    #[serde(default)]
    ledger: LedgerSettings,
}

#[derive(Debug, Clone, Deserialize)]
struct SolanaCliConfig {
    keypair_path: String,
}

fn load_issuer_config(path: &Path) -> Result<IssuerConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&contents).context("Failed to parse config")
}

fn load_solana_cli_config() -> Result<SolanaCliConfig> {
    let path = default_solana_config_path();
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read Solana config: {}", path.display()))?;
    serde_yaml::from_str(&contents).context("Failed to parse Solana config")
}

fn default_solana_config_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("solana");
    path.push("cli");
    path.push("config.yml");
    path
}

fn default_config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("issuance");
    path.push("config.toml");
    path
}

fn default_journal_path() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("issuance");
    path.push("ledger.journal");
    path
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn parse_pubkey(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| anyhow!("Invalid pubkey: {}", value))
}

/// Whole numbers are base units; a decimal point switches to token units.
fn parse_amount(value: &str, decimals: u8) -> Result<u64> {
    let sanitized = value.replace('_', "");
    if let Some((whole, fractional)) = sanitized.split_once('.') {
        let whole_value: u64 = if whole.is_empty() { 0 } else { whole.parse()? };
        let mut fraction = fractional.to_string();
        if fraction.len() > decimals as usize {
            return Err(anyhow!("Too many decimal places"));
        }
        while fraction.len() < decimals as usize {
            fraction.push('0');
        }
        let fractional_value: u64 = if fraction.is_empty() {
            0
        } else {
            fraction.parse()?
        };
        let scale = 10u64
            .checked_pow(decimals as u32)
            .ok_or_else(|| anyhow!("Decimal overflow"))?;
        let total = whole_value
            .checked_mul(scale)
            .and_then(|value| value.checked_add(fractional_value))
            .ok_or_else(|| anyhow!("Amount overflow"))?;
        Ok(total)
    } else {
        Ok(sanitized.parse()?)
    }
}

fn format_amount(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = 10u64.pow(decimals as u32);
    let whole = amount / scale;
    let frac = amount % scale;
    format!("{}.{:0width$}", whole, frac, width = decimals as usize)
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|time| time.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

fn print_result(output: &ResultOutput) {
    match &output.error {
        Some(error) => println!("Status: {} ({})", output.status, error),
        None => println!("Status: {}", output.status),
    }
    println!("Instruction: {}", output.instruction);
    println!("Signer: {}", output.signer);
    println!("Trace: {}", output.trace.join(" -> "));
    if let Some(supply) = &output.total_supply_after {
        println!("Total supply: {}", supply);
    }
    for balance in &output.balances_after {
        println!("  {} {}", balance.owner, balance.ui_amount);
    }
}

#[derive(Serialize)]
struct KeygenOutput {
    pubkey: String,
    outfile: String,
}

#[derive(Serialize)]
struct AddressOutput {
    address: String,
}

#[derive(Serialize)]
struct InitOutput {
    authority: String,
    name: String,
    symbol: String,
    decimals: u8,
    journal: String,
}

#[derive(Serialize)]
struct ResultOutput {
    instruction: String,
    signer: String,
    status: String,
    error: Option<String>,
    error_code: Option<u32>,
    trace: Vec<String>,
    total_supply_after: Option<String>,
    balances_after: Vec<BalanceOutput>,
}

impl ResultOutput {
    fn new(result: &TransitionResult, decimals: u8) -> Self {
        Self {
            instruction: result.instruction.to_string(),
            signer: result.signer.to_string(),
            status: match result.status {
                TransitionStatus::Committed => "committed".to_string(),
                TransitionStatus::Rejected => "rejected".to_string(),
            },
            error: result.error.map(|kind| format!("{}: {}", kind.name(), kind)),
            error_code: result.error.map(u32::from),
            trace: result.trace.iter().map(|state| state.to_string()).collect(),
            total_supply_after: result
                .total_supply_after
                .map(|supply| format_amount(supply, decimals)),
            balances_after: result
                .balances_after
                .iter()
                .map(|(owner, amount)| BalanceOutput {
                    owner: owner.to_string(),
                    amount: *amount,
                    ui_amount: format_amount(*amount, decimals),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct StatusOutput {
    journal: String,
    authority: String,
    name: String,
    symbol: String,
    decimals: u8,
    is_paused: bool,
    is_halted: bool,
    total_supply: String,
    total_minted: String,
    total_burned: String,
    audit_counter: u64,
    holders: usize,
}

#[derive(Serialize)]
struct SupplyOutput {
    supply: String,
    holder_sum: String,
    holders: usize,
    consistent: bool,
}

#[derive(Serialize)]
struct BalanceOutput {
    owner: String,
    amount: u64,
    ui_amount: String,
}

#[derive(Serialize, Clone)]
struct HolderInfo {
    owner: String,
    amount: u64,
}

#[derive(Serialize)]
struct HoldersOutput {
    holders: Vec<HolderInfo>,
}

#[derive(Serialize)]
struct AuditEntry {
    seq: u64,
    action: String,
    timestamp: String,
    details: serde_json::Value,
}

impl AuditEntry {
    fn new(seq: u64, event: &AuditEvent) -> Self {
        let details = match event {
            AuditEvent::Initialized(e) => json!({
                "authority": e.authority.to_string(),
                "name": e.name,
                "symbol": e.symbol,
                "decimals": e.decimals,
            }),
            AuditEvent::Minted(e) => json!({
                "recipient": e.recipient.to_string(),
                "amount": e.amount,
                "minter": e.minter.to_string(),
                "new_total_supply": e.new_total_supply,
            }),
            AuditEvent::Burned(e) => json!({
                "owner": e.owner.to_string(),
                "amount": e.amount,
                "burner": e.burner.to_string(),
                "new_total_supply": e.new_total_supply,
            }),
            AuditEvent::Transferred(e) => json!({
                "from": e.from.to_string(),
                "to": e.to.to_string(),
                "amount": e.amount,
            }),
            AuditEvent::Paused(e) => json!({ "paused_by": e.paused_by.to_string() }),
            AuditEvent::Unpaused(e) => json!({ "unpaused_by": e.unpaused_by.to_string() }),
            AuditEvent::AuthorityTransferred(e) => json!({
                "old_authority": e.old_authority.to_string(),
                "new_authority": e.new_authority.to_string(),
            }),
        };
        Self {
            seq,
            action: event.action().to_string(),
            timestamp: format_timestamp(event.timestamp()),
            details,
        }
    }
}

#[derive(Serialize)]
struct AuditLogOutput {
    entries: Vec<AuditEntry>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_amounts_with_decimals() {
        assert_eq!(parse_amount("1", 6).unwrap(), 1);
        assert_eq!(parse_amount("1.5", 6).unwrap(), 1_500_000);
        assert_eq!(parse_amount("0.000001", 6).unwrap(), 1);
        assert_eq!(parse_amount("1_000.25", 2).unwrap(), 100_025);
        assert!(parse_amount("0.0000001", 6).is_err());
    }

    #[test]
    fn formats_amounts() {
        assert_eq!(format_amount(1_500_000, 6), "1.500000");
        assert_eq!(format_amount(100, 2), "1.00");
        assert_eq!(format_amount(10, 0), "10");
    }

    #[test]
    fn partial_config_keeps_ledger_defaults() {
        let config: IssuerConfig = toml::from_str(
            r#"
            journal = "/tmp/issuance/ledger.journal"

            [ledger]
            lock_timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.journal.as_deref(), Some("/tmp/issuance/ledger.journal"));
        assert_eq!(config.ledger.lock_timeout_ms, 250);
        assert!(config.ledger.authority_burn);
        assert_eq!(config.ledger.lock_stripes, LedgerSettings::default().lock_stripes);
    }

    #[test]
    fn expands_home_prefix_only() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel/~/path"), PathBuf::from("rel/~/path"));
    }

    fn cli(dir: &Path, args: &[&str]) -> Cli {
        let config = dir.join("config.toml");
        let keypair = dir.join("id.json");
        let journal = dir.join("ledger.journal");
        let mut argv = vec![
            "issuer".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--keypair".to_string(),
            keypair.display().to_string(),
            "--ledger".to_string(),
            journal.display().to_string(),
        ];
        argv.extend(args.iter().map(|arg| arg.to_string()));
        Cli::parse_from(argv)
    }

    #[test]
    fn issues_and_rejects_through_the_journal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "[ledger]\nsync_writes = false\n").unwrap();

        run(cli(dir.path(), &["keygen"])).unwrap();
        assert!(run(cli(dir.path(), &["keygen"])).is_err());
        let authority = read_keypair_file(dir.path().join("id.json")).unwrap();
        let holder = Pubkey::new_unique().to_string();

        run(cli(dir.path(), &["init", "--name", "USD Stable", "--symbol", "USDS"])).unwrap();
        run(cli(dir.path(), &["mint", &holder, "12.5"])).unwrap();
        assert!(run(cli(dir.path(), &["mint", &holder, "0"])).is_err());
        run(cli(dir.path(), &["pause"])).unwrap();
        assert!(run(cli(dir.path(), &["mint", &holder, "1"])).is_err());
        run(cli(dir.path(), &["status"])).unwrap();
        run(cli(dir.path(), &["audit-log", "--action", "mint"])).unwrap();
        run(cli(dir.path(), &["resume"])).unwrap();

        let store = JournalStore::open(dir.path().join("ledger.journal"), false).unwrap();
        let ledger = SupplyLedger::open(Arc::new(store), LedgerSettings::default()).unwrap();
        let config = ledger.config().unwrap();
        assert_eq!(config.authority, authority.pubkey());
        assert!(config.paused);
        assert_eq!(config.total_supply, 12_500_000);
        assert_eq!(
            ledger.balance_of(&parse_pubkey(&holder).unwrap()).unwrap(),
            12_500_000
        );
    }
}
