// Command-line front end for the rebate metrics report.
//
// - `report` loads a metrics CSV and writes the Markdown report (and
//   optionally the JSON summary).
// - `process` writes the derived spreadsheet and records the run in the
//   processing history.
// - `history` / `stats` read the processing history back.
use clap::{Parser, Subcommand};
use rebate_report::history::{HistoryStats, HistoryStore, JsonLinesHistory, NewEntry, Status};
use rebate_report::processor::{process_table, write_processed};
use rebate_report::{loader, output, util, Config, Result};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "rebate_report")]
#[command(author, version, about = "Monthly hotel-booking metrics report", long_about = None)]
struct Args {
    #[arg(short, long, global = true, help = "Path to config file (TOML)")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the Markdown report for a metrics CSV
    Report {
        input: PathBuf,
        #[arg(short, long, help = "Where to write the report", value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long, help = "Also write the structured summary as JSON", value_name = "FILE")]
        json: Option<PathBuf>,
    },
    /// Write the derived spreadsheet and record the run in the history
    Process {
        input: PathBuf,
        #[arg(long, help = "Output directory (defaults to the configured one)", value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
    /// List processed files, most recent first
    History,
    /// Summarize the processing history
    Stats,
}

fn run_report(config: &Config, input: &Path, out: Option<PathBuf>, json: Option<PathBuf>) -> Result<()> {
    let (dataset, load_report) = loader::load_dataset(input)?;
    println!("Data loaded ({} months)", util::format_int(load_report.total_rows));
    if load_report.unparsable_cells > 0 {
        println!(
            "Note: {} cells could not be parsed and were treated as missing.",
            util::format_int(load_report.unparsable_cells)
        );
    }

    let out = out.unwrap_or_else(|| input.with_extension("report.md"));
    let source = input.display().to_string();
    let (summary, _) = rebate_report::generate_markdown_report(&dataset, config, &source, Some(&out))?;
    println!("Report saved to {}", out.display());

    if let Some(path) = json {
        output::write_json(&path, &summary)?;
        println!("Summary saved to {}", path.display());
    }
    Ok(())
}

fn run_process(config: &Config, store: &dyn HistoryStore, input: &Path, out_dir: Option<PathBuf>) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    let processed_at = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let original = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());
    let out_dir = out_dir.unwrap_or_else(|| config.output.dir.clone());

    let outcome = loader::load_table(input).and_then(|table| {
        let sheet = process_table(&table, now);
        let files = write_processed(&out_dir, &original, now, &sheet)?;
        Ok((table, sheet, files))
    });

    match outcome {
        Ok((table, sheet, files)) => {
            let processed_filename = files.data.file_name().map(|n| n.to_string_lossy().into_owned());
            let record = store.append(NewEntry {
                original_filename: original,
                processed_filename,
                processed_at,
                rows: Some(table.rows.len()),
                columns: Some(sheet.table.headers.len()),
                stats: sheet.stats.clone(),
                status: Status::Success,
                error: None,
            })?;
            log::info!("Recorded processing run #{}", record.id);

            println!("Processed {} rows into {}", util::format_int(table.rows.len()), files.data.display());
            if let Some(stats) = &files.stats {
                println!("Indicator means written to {}", stats.display());
            }
            println!("\n{}\n", output::preview_table(&sheet.table, 10));
            Ok(())
        }
        Err(e) => {
            log::error!("Processing {} failed: {:?}", input.display(), e);
            store.append(NewEntry::failed(&original, &processed_at, &e.to_string()))?;
            Err(e)
        }
    }
}

fn print_history(store: &dyn HistoryStore) -> Result<()> {
    let records = store.list_recent()?;
    if records.is_empty() {
        println!("(no history)");
    }
    for r in records {
        let e = &r.entry;
        match e.status {
            Status::Success => println!(
                "#{} {} {} -> {} ({} rows, {} columns)",
                r.id,
                e.processed_at,
                e.original_filename,
                e.processed_filename.as_deref().unwrap_or("-"),
                e.rows.unwrap_or(0),
                e.columns.unwrap_or(0)
            ),
            Status::Failed => println!(
                "#{} {} {} FAILED: {}",
                r.id,
                e.processed_at,
                e.original_filename,
                e.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    Ok(())
}

fn print_stats(store: &dyn HistoryStore) -> Result<()> {
    let stats = HistoryStats::from_records(&store.list_recent()?);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("Starting rebate_report v{}", env!("CARGO_PKG_VERSION"));

    let result = Config::load(args.config.as_deref()).and_then(|config| {
        let store = JsonLinesHistory::new(config.output.history_file.clone());
        match args.command {
            Command::Report { input, output, json } => run_report(&config, &input, output, json),
            Command::Process { input, out_dir } => run_process(&config, &store, &input, out_dir),
            Command::History => print_history(&store),
            Command::Stats => print_stats(&store),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
