use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Table};
use inquire::validator::Validation;
use inquire::{Confirm, CustomUserError, InquireError, Select, Text};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use quotation_maker::format::{format_currency, format_quantity};
use quotation_maker::render::TABLE_HEADER;
use quotation_maker::settings::{self, AppSettings, SettingsStore};
use quotation_maker::{
    ClientProfile, CollisionPolicy, CompanyProfile, LineItem, OutputFormat, PricedItems,
    QuotationRequest, RenderOptions, Renderer, generate_quotation, price_items,
};

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(name = "quotation-maker", version, about = "Create priced quotations as Typst/PDF documents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory for generated quotations (overrides settings.toml)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Output format, pdf unless settings.toml says otherwise (typst writes the source only)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// What to do when today's file for the identifier exists
    #[arg(long, global = true, value_enum)]
    on_collision: Option<CollisionPolicy>,

    /// Company profile file (.toml or .json)
    #[arg(long, global = true)]
    company_file: Option<PathBuf>,

    /// Custom Tera/Typst template instead of the built-in layout
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    /// Open the generated document
    #[arg(long, global = true)]
    open: bool,

    /// -v for info, -vv for debug logs
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new quotation interactively
    New {
        /// Quotation number (defaults to QT + timestamp)
        #[arg(long)]
        id: Option<String>,
    },
    /// Create a quotation from flags or a JSON request file
    Generate(GenerateArgs),
    /// Edit and save the company profile
    Company {
        /// Print the saved profile instead of editing it
        #[arg(long)]
        show: bool,
    },
    /// Configure output directory, format and collision policy
    Config,
    /// Open the output folder
    Open,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// JSON file with `client`, `items` and optionally `identifier`
    #[arg(long, conflicts_with_all = ["client_name", "client_address", "client_phone", "client_email", "items"])]
    request: Option<PathBuf>,

    /// Quotation number (defaults to QT + timestamp)
    #[arg(long)]
    id: Option<String>,

    #[arg(long)]
    client_name: Option<String>,
    #[arg(long)]
    client_address: Option<String>,
    #[arg(long)]
    client_phone: Option<String>,
    #[arg(long)]
    client_email: Option<String>,

    /// Line item as "description;quantity;rate" (repeatable)
    #[arg(long = "item", value_parser = parse_item_arg)]
    items: Vec<LineItem>,
}

#[derive(Deserialize)]
struct RequestFile {
    identifier: Option<String>,
    client: ClientProfile,
    #[serde(default)]
    items: Vec<LineItem>,
}

/// Everything resolved from settings files and global flags.
struct Session {
    store: SettingsStore,
    settings_path: PathBuf,
    settings: AppSettings,
    options: RenderOptions,
    template: Option<PathBuf>,
    open: bool,
}

impl Session {
    fn from_cli(cli: &Cli) -> Self {
        let settings_path = settings::default_settings_path();
        let settings = AppSettings::load(&settings_path);
        let store = SettingsStore::new(
            cli.company_file.clone().unwrap_or_else(settings::default_company_path),
        );

        let options = RenderOptions {
            output_dir: cli.output_dir.clone().unwrap_or_else(|| settings.output_dir()),
            format: cli.format.unwrap_or(settings.format),
            on_collision: cli.on_collision.unwrap_or(settings.on_collision),
        };

        Self {
            store,
            settings_path,
            settings,
            options,
            template: cli.template.clone(),
            open: cli.open,
        }
    }

    fn renderer(&self) -> Result<Renderer> {
        let renderer = match &self.template {
            Some(path) => Renderer::from_template_file(path)?,
            None => Renderer::new()?,
        };
        Ok(renderer)
    }
}

// ==========================================
// Main Function
// ==========================================

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancelled(&e) => {
            println!("Cancelled");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

fn run(cli: Cli) -> Result<()> {
    let session = Session::from_cli(&cli);

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::New { id } => new_quotation_wizard(&session, id),
        Commands::Generate(args) => generate_from_args(&session, args),
        Commands::Company { show: true } => {
            print_company(&session.store.load());
            Ok(())
        }
        Commands::Company { show: false } => company_wizard(&session.store),
        Commands::Config => config_wizard(&session),
        Commands::Open => {
            let dir = &session.options.output_dir;
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            println!("🚀 Opening: {}", dir.display());
            open_path(dir);
            Ok(())
        }
    }
}

fn default_identifier() -> String {
    format!("QT{}", Local::now().format("%Y%m%d%H%M%S"))
}

// ==========================================
// 1. Generation
// ==========================================

fn generate(session: &Session, request: &QuotationRequest) -> Result<PathBuf> {
    let company = session.store.load();
    let renderer = session.renderer()?;
    let path = generate_quotation(
        &renderer,
        request,
        &company,
        Local::now().date_naive(),
        &session.options,
    )?;

    println!("✅ Quotation generated: {}", path.display());
    if session.open {
        open_path(&path);
    }
    Ok(path)
}

fn generate_from_args(session: &Session, args: GenerateArgs) -> Result<()> {
    let request = match &args.request {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading request file {}", path.display()))?;
            let file: RequestFile = serde_json::from_str(&content)
                .with_context(|| format!("parsing request file {}", path.display()))?;
            QuotationRequest {
                identifier: args.id.or(file.identifier).unwrap_or_else(default_identifier),
                client: file.client,
                items: file.items,
            }
        }
        None => QuotationRequest {
            identifier: args.id.unwrap_or_else(default_identifier),
            client: ClientProfile {
                name: args.client_name.unwrap_or_default(),
                address: args.client_address.unwrap_or_default(),
                phone: args.client_phone.unwrap_or_default(),
                email: args.client_email.unwrap_or_default(),
            },
            items: args.items,
        },
    };

    generate(session, &request)?;
    Ok(())
}

fn parse_item_arg(raw: &str) -> Result<LineItem, String> {
    // Split from the right so descriptions may contain ';'.
    let mut parts = raw.rsplitn(3, ';');
    let rate = parts.next();
    let quantity = parts.next();
    let description = parts.next();
    match (description, quantity, rate) {
        (Some(d), Some(q), Some(r)) => Ok(LineItem::new(d.trim(), q.trim(), r.trim())),
        _ => Err(format!("expected \"description;quantity;rate\", got {raw:?}")),
    }
}

// ==========================================
// 2. Interactive Wizards
// ==========================================

fn new_quotation_wizard(session: &Session, id: Option<String>) -> Result<()> {
    let company = session.store.load();
    println!("🏢 Quoting as: {}", company.name);

    let identifier = Text::new("Quotation No:")
        .with_default(&id.unwrap_or_else(default_identifier))
        .with_validator(required)
        .prompt()?;

    println!("\n--- Client Details ---");
    let client = ClientProfile {
        name: Text::new("Client Name:").with_validator(required).prompt()?,
        address: Text::new("Address:").with_validator(required).prompt()?,
        phone: Text::new("Phone:").with_validator(required).prompt()?,
        email: Text::new("Email:").with_validator(required).prompt()?,
    };

    let mut items = Vec::new();
    enter_items(&mut items)?;
    loop {
        if items.is_empty() {
            bail!("no items entered, at least one line item is required");
        }
        let priced = price_items(&items)?;
        println!("{}", preview_table(&priced));

        match Select::new("Items:", ItemAction::ALL.to_vec()).prompt()? {
            ItemAction::Add => enter_items(&mut items)?,
            ItemAction::Remove => {
                let picked = Select::new("Remove which item?", item_labels(&items)).raw_prompt()?;
                let removed = items.remove(picked.index);
                println!("🗑️  Removed: {}", removed.description);
                if items.is_empty() {
                    enter_items(&mut items)?;
                }
            }
            ItemAction::Done => break,
        }
    }

    if !Confirm::new("Generate this quotation?").with_default(true).prompt()? {
        println!("Nothing generated.");
        return Ok(());
    }

    generate(session, &QuotationRequest { identifier, client, items })?;
    Ok(())
}

fn enter_items(items: &mut Vec<LineItem>) -> Result<()> {
    println!("\n--- Enter Items ---");
    println!("(Leave Description empty to finish)");

    loop {
        let description = Text::new("Description:").prompt()?;
        if description.trim().is_empty() {
            break;
        }
        let quantity = Text::new("Quantity:").with_validator(number).prompt()?;
        let rate = Text::new("Rate (₹):").with_validator(number).prompt()?;
        items.push(LineItem::new(description, quantity, rate));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemAction {
    Done,
    Add,
    Remove,
}

impl ItemAction {
    const ALL: [ItemAction; 3] = [ItemAction::Done, ItemAction::Add, ItemAction::Remove];
}

impl fmt::Display for ItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemAction::Done => write!(f, "Done, review and generate"),
            ItemAction::Add => write!(f, "Add more items"),
            ItemAction::Remove => write!(f, "Remove an item"),
        }
    }
}

/// One entry per item, in entry order, for the removal prompt.
fn item_labels(items: &[LineItem]) -> Vec<String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!("{}. {} ({} × {})", i + 1, item.description.trim(), item.quantity.trim(), item.rate.trim())
        })
        .collect()
}

fn company_wizard(store: &SettingsStore) -> Result<()> {
    let current = store.load();
    println!("\n⚙️  --- Company Details ({}) ---", store.path().display());

    let profile = CompanyProfile {
        name: Text::new("Company Name:").with_default(&current.name).with_validator(required).prompt()?,
        address: Text::new("Address:").with_default(&current.address).prompt()?,
        phone: Text::new("Phone:").with_default(&current.phone).prompt()?,
        email: Text::new("Email:").with_default(&current.email).prompt()?,
        website: Text::new("Website:").with_default(&current.website).prompt()?,
        tax_id: Text::new("GST Number:").with_default(&current.tax_id).prompt()?,
    };

    store.save(&profile).context("failed to save company details")?;
    println!("✅ Company details saved.");
    Ok(())
}

fn config_wizard(session: &Session) -> Result<()> {
    println!("\n⚙️  --- Configuration Setup ---");
    let current = &session.settings;

    let output_dir = Text::new("Output Directory:")
        .with_default(&current.output_dir)
        .with_validator(required)
        .prompt()?;
    let format = pick_variant("Output Format:", current.format)?;
    let on_collision = pick_variant("When a file for the same quotation exists:", current.on_collision)?;

    let settings = AppSettings { output_dir, format, on_collision };
    settings.save(&session.settings_path).context("failed to save settings")?;
    println!("✅ Settings saved to {}", session.settings_path.display());
    Ok(())
}

/// Select prompt over a clap value enum, current value first.
fn pick_variant<T: ValueEnum + Copy + PartialEq>(message: &str, current: T) -> Result<T> {
    let mut variants: Vec<T> = T::value_variants().to_vec();
    variants.sort_by_key(|v| *v != current);
    let names: Vec<String> = variants
        .iter()
        .filter_map(|v| v.to_possible_value().map(|p| p.get_name().to_string()))
        .collect();

    let choice = Select::new(message, names).prompt()?;
    T::from_str(&choice, true).map_err(anyhow::Error::msg)
}

fn required(input: &str) -> Result<Validation, CustomUserError> {
    if input.trim().is_empty() {
        Ok(Validation::Invalid("This field is required".into()))
    } else {
        Ok(Validation::Valid)
    }
}

fn number(input: &str) -> Result<Validation, CustomUserError> {
    match input.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Validation::Valid),
        _ => Ok(Validation::Invalid("Please enter a valid number".into())),
    }
}

// ==========================================
// 3. Tables
// ==========================================

fn preview_table(priced: &PricedItems) -> Table {
    let mut table = Table::new();
    table.set_header(TABLE_HEADER.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));

    for line in &priced.lines {
        table.add_row(vec![
            Cell::new(line.index),
            Cell::new(&line.description),
            Cell::new(format_quantity(line.quantity)),
            Cell::new(format_currency(line.rate)),
            Cell::new(format_currency(line.amount)),
        ]);
    }

    table.add_row(vec![
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new("Total:").add_attribute(Attribute::Bold),
        Cell::new(format_currency(priced.total)).add_attribute(Attribute::Bold),
    ]);
    table
}

fn print_company(profile: &CompanyProfile) {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("Field"), Cell::new("Value")]);
    for (field, value) in [
        ("Company Name", &profile.name),
        ("Address", &profile.address),
        ("Phone", &profile.phone),
        ("Email", &profile.email),
        ("Website", &profile.website),
        ("GST Number", &profile.tax_id),
    ] {
        table.add_row(vec![Cell::new(field), Cell::new(value)]);
    }
    println!("{table}");
}

// ==========================================
// 4. Utilities
// ==========================================

fn open_path(path: &Path) {
    #[cfg(target_os = "macos")]
    Command::new("open").arg(path).spawn().ok();

    #[cfg(target_os = "windows")]
    Command::new("explorer").arg(path).spawn().ok();

    #[cfg(target_os = "linux")]
    Command::new("xdg-open").arg(path).spawn().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_arg_splits_from_the_right() {
        let item = parse_item_arg("Design; UX;2;100.5").unwrap();
        assert_eq!(item, LineItem::new("Design; UX", "2", "100.5"));
    }

    #[test]
    fn item_arg_needs_three_parts() {
        assert!(parse_item_arg("Design;2").is_err());
    }

    #[test]
    fn validators_flag_bad_input() {
        assert!(matches!(required("  "), Ok(Validation::Invalid(_))));
        assert!(matches!(number("abc"), Ok(Validation::Invalid(_))));
        assert!(matches!(number(" 12.5 "), Ok(Validation::Valid)));
    }

    #[test]
    fn preview_ends_with_total_row() {
        let priced = price_items(&[LineItem::new("UI/UX Design", "2", "100.5")]).unwrap();
        let rendered = preview_table(&priced).to_string();
        assert!(rendered.contains("₹201.00"));
        assert!(rendered.contains("Total:"));
    }

    #[test]
    fn item_labels_follow_entry_order() {
        let items = vec![
            LineItem::new("Web Development", "1", "50000"),
            LineItem::new(" UI/UX Design ", "2", "100.5"),
        ];
        assert_eq!(
            item_labels(&items),
            ["1. Web Development (1 × 50000)", "2. UI/UX Design (2 × 100.5)"]
        );
    }

    #[test]
    fn item_actions_start_with_done() {
        assert_eq!(ItemAction::ALL[0], ItemAction::Done);
        assert_eq!(ItemAction::Remove.to_string(), "Remove an item");
    }

    #[test]
    fn format_flag_is_optional() {
        let cli = Cli::try_parse_from(["quotation-maker", "new"]).unwrap();
        assert_eq!(cli.format, None);
        assert_eq!(cli.format.unwrap_or_default(), OutputFormat::Pdf);
    }

    #[test]
    fn cli_parses_repeated_items() {
        let cli = Cli::try_parse_from([
            "quotation-maker",
            "generate",
            "--client-name",
            "XYZ",
            "--item",
            "Web;1;50000",
            "--item",
            "App;1;75000",
            "--format",
            "typst",
            "--on-collision",
            "suffix",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Typst));
        assert_eq!(cli.on_collision, Some(CollisionPolicy::Suffix));
        match cli.command {
            Some(Commands::Generate(args)) => assert_eq!(args.items.len(), 2),
            _ => panic!("expected generate"),
        }
    }
}
