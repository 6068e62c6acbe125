//! # Margem Command-Line Entry Point
//!
//! The caller the engine expects: it holds the tables, assembles one
//! request per invocation and prints what comes back.
//!
//! ## Usage
//! ```bash
//! # Full reconciliation, worst products first
//! margem-cli price --ingredients insumos.csv --recipes fichas.csv --products precos.csv
//!
//! # Fill missing monthly volumes from a sales export, save a JSON report
//! margem-cli price ... --sales vendas.csv --out relatorio.json
//!
//! # CSV export: precos.csv plus the gross margin table in precos-gross.csv
//! margem-cli price ... --out precos.csv
//!
//! # Single-commission preview of one product
//! margem-cli quick -i insumos.csv -r fichas.csv --product "X-Burger" --price 32,90
//!
//! # Whole-menu preview exported as CSV
//! margem-cli quick -i insumos.csv -r fichas.csv -p precos.csv --out previa.csv
//!
//! # Show or create the configuration file
//! margem-cli config --config ./margem.toml
//! margem-cli init-config --config ./margem.toml
//! ```
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Parse arguments
//! 3. Load configuration (file + environment)
//! 4. Load CSV tables
//! 5. Run the engine and print

use margem_core::advisor::advise;
use margem_core::analytics::{basic_kpis, monthly_volumes, top_products};
use margem_core::costing::{aggregate, technical_sheet};
use margem_core::money::Money;
use margem_core::pricing::summarize;
use margem_core::quick::{quick_price, quick_price_table};
use margem_core::types::ProductPricing;
use margem_store::report::{
    save_gross_margin_csv, save_pricing_csv, save_quick_csv, PricingReport,
};
use margem_store::tables::{
    load_bom_file, load_catalog_file, load_products_file, load_sales_file, parse_number,
};
use margem_store::AppConfig;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
struct Options {
    config: Option<PathBuf>,
    ingredients: Option<PathBuf>,
    recipes: Option<PathBuf>,
    products: Option<PathBuf>,
    sales: Option<PathBuf>,
    out: Option<PathBuf>,
    product: Option<String>,
    price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Price(Options),
    Quick(Options),
    Config(Options),
    InitConfig(Options),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(name) = args.get(1) else {
        return Ok(Command::Help);
    };

    let mut options = Options::default();
    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        if matches!(flag, "--help" | "-h") {
            return Ok(Command::Help);
        }
        let value = args
            .get(i + 1)
            .cloned()
            .ok_or_else(|| format!("{} needs a value", flag))?;
        match flag {
            "--config" | "-c" => options.config = Some(value.into()),
            "--ingredients" | "-i" => options.ingredients = Some(value.into()),
            "--recipes" | "-r" => options.recipes = Some(value.into()),
            "--products" | "-p" => options.products = Some(value.into()),
            "--sales" | "-s" => options.sales = Some(value.into()),
            "--out" | "-o" => options.out = Some(value.into()),
            "--product" => options.product = Some(value),
            "--price" => {
                let price = parse_number(&value)
                    .ok_or_else(|| format!("invalid price '{}'", value))?;
                options.price = Some(price);
            }
            other => return Err(format!("unknown option '{}'", other)),
        }
        i += 2;
    }

    match name.as_str() {
        "price" => Ok(Command::Price(options)),
        "quick" => Ok(Command::Quick(options)),
        "config" => Ok(Command::Config(options)),
        "init-config" => Ok(Command::InitConfig(options)),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command '{}'", other)),
    }
}

fn required(path: &Option<PathBuf>, flag: &str) -> Result<PathBuf, String> {
    path.clone().ok_or_else(|| format!("{} is required", flag))
}

fn print_help() {
    println!("Margem - restaurant pricing for delivery marketplaces");
    println!();
    println!("Usage: margem-cli <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  price         Cost, margin and suggested price for every product");
    println!("  quick         Single-commission preview (one product or the whole menu)");
    println!("  config        Print the effective configuration");
    println!("  init-config   Write a configuration file with defaults");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>        Config file (.json or .toml)");
    println!("  -i, --ingredients <PATH>   Ingredients CSV (name, unit, unit_cost)");
    println!("  -r, --recipes <PATH>       Recipes CSV (product, ingredient, quantity, unit)");
    println!("  -p, --products <PATH>      Pricing CSV (product, listed_price, volume, ...)");
    println!("  -s, --sales <PATH>         Sales CSV, fills missing monthly volumes");
    println!("  -o, --out <PATH>           Export: .json report or .csv table(s)");
    println!("      --product <NAME>       Product for `quick`");
    println!("      --price <VALUE>        Listed price for `quick` (accepts 32,90)");
    println!("  -h, --help                 Show this help message");
}

// =============================================================================
// Commands
// =============================================================================

fn pct(fraction: Decimal) -> String {
    format!("{}%", (fraction * Decimal::ONE_HUNDRED).round_dp(2))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// `precos.csv` → `precos-gross.csv`, next to the summary export.
fn gross_margin_path(out: &Path) -> PathBuf {
    let stem = out
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("pricing");
    out.with_file_name(format!("{}-gross.csv", stem))
}

fn run_price(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(options.config.clone())?;
    let catalog = load_catalog_file(&required(&options.ingredients, "--ingredients")?)?;
    let bom = load_bom_file(&required(&options.recipes, "--recipes")?)?;
    let records = load_products_file(&required(&options.products, "--products")?)?;

    let sales = match &options.sales {
        Some(path) => load_sales_file(path)?,
        None => Vec::new(),
    };
    let fallback_volumes = monthly_volumes(&sales);
    let products: Vec<ProductPricing> = records
        .iter()
        .map(|r| r.to_pricing(&fallback_volumes))
        .collect();

    let gross = aggregate(&technical_sheet(&bom, &products), &catalog);
    let request = config.pricing_request(catalog, bom, products);
    let summary = summarize(&request)?;
    let advice = advise(&summary.rows);

    println!(
        "Modo de entrega: {} (comissão {})",
        request.delivery.mode, request.delivery.commission
    );
    println!();
    println!(
        "{:<24} {:>12} {:>12} {:>12} {:>12} {:>9} {:>12}",
        "Produto", "Preço", "Custo total", "Margem", "c/ desconto", "Margem %", "Sugerido"
    );
    for row in &summary.rows {
        println!(
            "{:<24} {:>12} {:>12} {:>12} {:>12} {:>9} {:>12}",
            row.product,
            row.listed_price.to_string(),
            row.total_unit_cost.to_string(),
            row.net_margin_amount_no_discount.to_string(),
            row.net_margin_amount_with_discount.to_string(),
            pct(row.net_margin_pct_with_discount),
            row.suggested_price.to_string(),
        );
        for warning in &row.warnings {
            println!("    ! {}", warning);
        }
    }
    for rejected in &summary.rejected {
        println!("{:<24} rejeitado: {:?}", rejected.product, rejected.reason);
    }

    println!();
    println!("Margem bruta (receita - insumos):");
    for row in &gross {
        println!(
            "  {:<22} {:>12} {:>9}",
            row.product,
            row.gross_margin_amount.to_string(),
            pct(row.gross_margin_pct)
        );
    }

    if !sales.is_empty() {
        println!();
        for kpi in basic_kpis(sales.len(), &sales) {
            println!("  {:<24} {} {}", kpi.name, kpi.value, kpi.unit);
        }
        for (product, quantity) in top_products(&sales, 5) {
            println!("  top: {:<19} {}", product, quantity);
        }
    }

    println!();
    println!("{}", advice.summary);

    if let Some(out) = &options.out {
        if is_json(out) {
            PricingReport::new(request.delivery.mode, summary, advice).save(out)?;
        } else {
            save_pricing_csv(out, &summary.rows)?;
            save_gross_margin_csv(&gross_margin_path(out), &gross)?;
        }
        info!(path = ?out, "Export written");
    }

    Ok(())
}

fn run_quick(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(options.config.clone())?;
    let catalog = load_catalog_file(&required(&options.ingredients, "--ingredients")?)?;
    let bom = load_bom_file(&required(&options.recipes, "--recipes")?)?;
    let commission = config.quick.commission;

    if let Some(product) = &options.product {
        let price = options.price.ok_or("--price is required with --product")?;
        let prices = BTreeMap::from([(product.clone(), Money::new(price))]);
        let quick = quick_price(product, &bom, &catalog, &prices, commission);

        println!("{} (comissão {})", product, commission);
        println!("  Custo:     {}", quick.cost.round_cents());
        println!("  Comissão:  {}", quick.commission_amount.round_cents());
        println!("  Margem:    {}", quick.net_margin.round_cents());
        return Ok(());
    }

    let prices: BTreeMap<String, Money> = match &options.products {
        Some(path) => load_products_file(path)?
            .iter()
            .map(|r| (r.product.trim().to_string(), Money::new(r.listed_price)))
            .collect(),
        None => BTreeMap::new(),
    };
    let table = quick_price_table(&bom, &catalog, &prices, commission);
    debug!(rows = table.len(), "Quick table built");

    for row in &table {
        println!(
            "{:<24} {:>12} {:>12} {:>12} {:>9}",
            row.product,
            row.listed_price.to_string(),
            row.cost.to_string(),
            row.net_margin.to_string(),
            pct(row.net_margin_pct)
        );
    }
    println!();
    println!("{}", advise(&table).summary);

    if let Some(out) = &options.out {
        save_quick_csv(out, &table)?;
        info!(path = ?out, "Export written");
    }
    Ok(())
}

fn run_config(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(options.config.clone())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn run_init_config(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::default().save(options.config.clone())?;
    println!("Configuração criada em {}", path.display());
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so tables on stdout stay pipeable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,margem=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let command = parse_args(&args)?;
    debug!(?command, "Parsed arguments");

    match command {
        Command::Price(options) => run_price(&options),
        Command::Quick(options) => run_quick(&options),
        Command::Config(options) => run_config(&options),
        Command::InitConfig(options) => run_init_config(&options),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}
