// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::env;

use sales_pulse::{csv_path_from_env, load_csv, Aggregator};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("report") => run_report(&args[2..]),
        Some("generate") => run_generate(&args[2..]),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: sales-pulse [report [--json] [YEAR...] | generate N]");
            std::process::exit(2);
        }
        // Dashboard mode (default)
        None => run_ui_mode(),
    }
}

fn run_report(year_args: &[String]) -> Result<()> {
    let csv_path = csv_path_from_env();

    let mut json = false;
    let mut selection = BTreeSet::new();
    for arg in year_args {
        if arg == "--json" {
            json = true;
            continue;
        }
        let year: i32 = arg
            .parse()
            .with_context(|| format!("Invalid year: {}", arg))?;
        selection.insert(year);
    }

    if json {
        // Machine-readable mode: nothing but the summary on stdout
        let dataset = load_csv(&csv_path)?;
        let summary = Aggregator::new(dataset).summarize(&selection)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("📂 Loading {}...", csv_path.display());
    let dataset = load_csv(&csv_path)?;
    println!("✓ Loaded {} transactions", dataset.len());

    let aggregator = Aggregator::new(dataset);
    let summary = aggregator.summarize(&selection)?;

    println!();
    println!("Sales summary for {:?}", summary.years);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total revenue:         $ {:.2}", summary.total_revenue);
    println!("Units sold:            {}", summary.total_units);
    println!("Avg revenue per unit:  $ {:.2}", summary.avg_revenue_per_unit);
    println!("Avg discount:          {:.2}%", summary.avg_discount * 100.0);
    println!("Top category:          {}", summary.top_category);
    println!("Top payment method:    {}", summary.top_payment_method);
    println!("Top sales channel:     {}", summary.top_channel);
    println!("Top region:            {}", summary.top_region);
    println!("Mean revenue per sale: $ {:.2}", summary.distribution.mean);

    println!();
    println!("Product ranking");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for entity in &summary.product_ranking {
        println!(
            "{:>6.1}  {:<16} $ {:>12.2}  {:>6.2}%",
            entity.rank,
            entity.key,
            entity.revenue,
            entity.participation * 100.0
        );
    }

    println!();
    println!("Sales rep ranking");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for entity in &summary.sales_rep_ranking {
        println!(
            "{:>6.1}  {:<16} $ {:>12.2}  {:>6.2}%",
            entity.rank,
            entity.key,
            entity.revenue,
            entity.participation * 100.0
        );
    }

    Ok(())
}

fn run_generate(args: &[String]) -> Result<()> {
    let count: usize = match args.first() {
        Some(arg) => arg
            .parse()
            .with_context(|| format!("Invalid row count: {}", arg))?,
        None => bail!("Usage: sales-pulse generate N"),
    };

    let csv_path = csv_path_from_env();

    println!("📂 Loading {}...", csv_path.display());
    let dataset = load_csv(&csv_path)?;
    println!("✓ Loaded {} transactions", dataset.len());

    let rows = sales_pulse::append_generated(&csv_path, &dataset, count)?;
    println!("✓ Appended {} synthetic rows to {}", rows.len(), csv_path.display());

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode() -> Result<()> {
    let csv_path = csv_path_from_env();

    if !csv_path.exists() {
        eprintln!("❌ Sales CSV not found at {}", csv_path.display());
        eprintln!("   Set SALES_CSV or place the file at the default path.");
        std::process::exit(1);
    }

    println!("📊 Loading {}...", csv_path.display());
    let dataset = load_csv(&csv_path)?;
    println!("✓ Loaded {} transactions", dataset.len());
    println!("Starting dashboard... (Press 'q' to quit)\n");

    let mut app = ui::App::new(Aggregator::new(dataset))?;
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode() -> Result<()> {
    eprintln!("❌ Dashboard mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web UI: cargo run --bin sales-pulse-server --features server");
    std::process::exit(1);
}
