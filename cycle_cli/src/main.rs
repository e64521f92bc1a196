use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cycle_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zyklus")]
#[command(about = "Cycle tracking and fertility forecast", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's cycle status and forecast (default)
    Status {
        /// Evaluate against this date instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Record or update one day's observations
    Log {
        /// Entry date (YYYY-MM-DD)
        date: NaiveDate,

        /// Basal body temperature in °C
        #[arg(long)]
        temp: Option<f64>,

        /// Exclude the temperature from analysis (illness, bad sleep)
        #[arg(long)]
        exclude_temp: bool,

        /// Menstrual flow (light, medium, heavy, spotting)
        #[arg(long, value_parser = parse_flow)]
        flow: Option<FlowLevel>,

        /// Cervical mucus (dry, sticky, creamy, watery, eggwhite)
        #[arg(long, value_parser = parse_mucus)]
        mucus: Option<CervicalMucus>,

        /// Ovulation test result (negative, positive, peak)
        #[arg(long, value_parser = parse_lh)]
        lh: Option<LhTestResult>,

        /// Intercourse (protected, unprotected)
        #[arg(long, value_parser = parse_intercourse)]
        sex: Option<Intercourse>,

        /// Symptom tag (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,

        /// Mood tag (repeatable)
        #[arg(long = "mood")]
        mood: Vec<String>,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// List observed cycles with lengths and detected ovulations
    History,

    /// Import entries from a native-format CSV file
    Import {
        /// CSV file to read
        file: PathBuf,
    },

    /// Export all entries to a native-format CSV file
    Export {
        /// CSV file to write
        file: PathBuf,
    },
}

fn parse_flow(s: &str) -> std::result::Result<FlowLevel, String> {
    match s.to_lowercase().as_str() {
        "light" => Ok(FlowLevel::Light),
        "medium" => Ok(FlowLevel::Medium),
        "heavy" => Ok(FlowLevel::Heavy),
        "spotting" => Ok(FlowLevel::Spotting),
        _ => Err(format!("unknown flow level: {}", s)),
    }
}

fn parse_mucus(s: &str) -> std::result::Result<CervicalMucus, String> {
    match s.to_lowercase().as_str() {
        "dry" => Ok(CervicalMucus::Dry),
        "sticky" => Ok(CervicalMucus::Sticky),
        "creamy" => Ok(CervicalMucus::Creamy),
        "watery" => Ok(CervicalMucus::Watery),
        "eggwhite" => Ok(CervicalMucus::Eggwhite),
        _ => Err(format!("unknown mucus category: {}", s)),
    }
}

fn parse_lh(s: &str) -> std::result::Result<LhTestResult, String> {
    match s.to_lowercase().as_str() {
        "negative" => Ok(LhTestResult::Negative),
        "positive" => Ok(LhTestResult::Positive),
        "peak" => Ok(LhTestResult::Peak),
        _ => Err(format!("unknown test result: {}", s)),
    }
}

fn parse_intercourse(s: &str) -> std::result::Result<Intercourse, String> {
    match s.to_lowercase().as_str() {
        "protected" => Ok(Intercourse::Protected),
        "unprotected" => Ok(Intercourse::Unprotected),
        _ => Err(format!("unknown intercourse value: {}", s)),
    }
}

fn main() -> Result<()> {
    // Initialize logging
    cycle_core::logging::init();

    let cli = Cli::parse();

    // Determine data directory
    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let log_path = data_dir.join("entries.json");

    match cli.command {
        Some(Commands::Status { date }) => cmd_status(&log_path, &config, date),
        Some(Commands::Log {
            date,
            temp,
            exclude_temp,
            flow,
            mucus,
            lh,
            sex,
            symptoms,
            mood,
            note,
        }) => cmd_log(
            &log_path,
            DailyEntry {
                date,
                temperature: temp,
                exclude_temp,
                flow,
                mucus,
                lh_test: lh,
                intercourse: sex,
                symptoms,
                mood,
                notes: note,
            },
        ),
        Some(Commands::History) => cmd_history(&log_path, &config),
        Some(Commands::Import { file }) => cmd_import(&log_path, &file),
        Some(Commands::Export { file }) => cmd_export(&log_path, &file),
        None => cmd_status(&log_path, &config, None),
    }
}

fn cmd_status(log_path: &PathBuf, config: &Config, date: Option<NaiveDate>) -> Result<()> {
    let log = EntryLog::load(log_path)?;
    let today = date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let settings = config.cycle.settings();
    let result = evaluate(&log.entries, &settings, today);

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  ZYKLUS · {}", today);
    println!("╰─────────────────────────────────────────╯");
    println!();

    let Some(phase) = &result.current_cycle else {
        println!("  No cycle data yet.");
        println!("  Log a period day to start tracking:");
        println!("    zyklus log {} --flow medium", today);
        println!();
        return Ok(());
    };

    println!(
        "  Cycle day {} (started {})",
        phase.elapsed_days, phase.start_date
    );
    println!("  State: {}", describe_state(phase.state));
    println!(
        "  Fertility: {} ({}/3)",
        if result.today.fertile { "fertile" } else { "not fertile" },
        result.today.fertility_level
    );
    if let Some(ovulation) = phase.ovulation {
        println!("  Detected ovulation: {}", ovulation);
    }
    if let Some(coverline) = phase.coverline {
        println!("  Coverline: {:.2} °C", coverline);
    }
    println!();

    if let (Some(days), Some(start)) = (
        result.today.days_until_period,
        result.today.next_period_start,
    ) {
        println!("  Next period: {} ({})", format_days(days), start);
    }
    if let (Some(days), Some(ovulation)) = (
        result.today.days_until_ovulation,
        result.today.next_ovulation,
    ) {
        println!("  Next ovulation: {} ({})", format_days(days), ovulation);
    }
    if let Some(next) = result.future_cycles.first() {
        println!(
            "  Fertile window: {} to {}",
            next.fertile_start, next.fertile_end
        );
    }
    println!();

    let stats = &result.statistics;
    if stats.cycle_count > 0 {
        println!(
            "  History: {} cycles · median {:.0} days (±{:.1})",
            stats.cycle_count, stats.median_cycle_length, stats.std_dev_cycle_length
        );
    } else {
        println!(
            "  History: not enough data, assuming {:.0}-day cycles",
            stats.median_cycle_length
        );
    }
    println!();

    Ok(())
}

fn cmd_log(log_path: &PathBuf, entry: DailyEntry) -> Result<()> {
    let date = entry.date;
    EntryLog::update(log_path, |log| {
        // Merge into an existing entry so partial logging doesn't erase
        // earlier observations for the same day
        let merged = match log.entries.get(&date) {
            Some(existing) => merge_entry(existing.clone(), entry),
            None => entry,
        };
        log.upsert(merged)
    })?;

    println!("✓ Entry saved for {}", date);
    Ok(())
}

/// Fields present on the new entry win; absent fields keep the old value
fn merge_entry(mut base: DailyEntry, update: DailyEntry) -> DailyEntry {
    if update.temperature.is_some() {
        base.temperature = update.temperature;
        base.exclude_temp = update.exclude_temp;
    } else if update.exclude_temp {
        base.exclude_temp = true;
    }
    if update.flow.is_some() {
        base.flow = update.flow;
    }
    if update.mucus.is_some() {
        base.mucus = update.mucus;
    }
    if update.lh_test.is_some() {
        base.lh_test = update.lh_test;
    }
    if update.intercourse.is_some() {
        base.intercourse = update.intercourse;
    }
    if !update.symptoms.is_empty() {
        base.symptoms = update.symptoms;
    }
    if !update.mood.is_empty() {
        base.mood = update.mood;
    }
    if update.notes.is_some() {
        base.notes = update.notes;
    }
    base
}

fn cmd_history(log_path: &PathBuf, config: &Config) -> Result<()> {
    let log = EntryLog::load(log_path)?;
    let today = chrono::Local::now().date_naive();
    let result = evaluate(&log.entries, &config.cycle.settings(), today);

    if result.cycles.is_empty() {
        println!("No cycles recorded yet.");
        return Ok(());
    }

    println!("\n  {:<12} {:<12} {:>7}  {:<12} {}", "Start", "End", "Length", "Ovulation", "Signal");
    println!("  {}", "─".repeat(56));
    // Newest first, as the history page shows them
    for record in result.cycles.iter().rev() {
        let end = record
            .interval
            .end_date
            .map_or("(open)".to_string(), |d| d.to_string());
        let length = record
            .realized_length
            .map_or("-".to_string(), |l| l.to_string());
        let ovulation = record
            .biomarker
            .ovulation
            .map_or("-".to_string(), |d| d.to_string());
        let signal = match record.biomarker.confidence {
            OvulationConfidence::Confirmed => "temp shift",
            OvulationConfidence::Inferred => "LH test",
            OvulationConfidence::NotDetected => "-",
        };
        println!(
            "  {:<12} {:<12} {:>7}  {:<12} {}",
            record.interval.start_date, end, length, ovulation, signal
        );
    }
    println!();

    Ok(())
}

fn cmd_import(log_path: &PathBuf, file: &PathBuf) -> Result<()> {
    let (entries, skipped) = csv_log::import_entries(file)?;
    let count = entries.len();

    EntryLog::update(log_path, |log| {
        for entry in entries {
            log.upsert(entry)?;
        }
        Ok(())
    })?;

    println!("✓ Imported {} entries", count);
    if skipped > 0 {
        println!("  Skipped {} unreadable rows", skipped);
    }
    Ok(())
}

fn cmd_export(log_path: &PathBuf, file: &PathBuf) -> Result<()> {
    let log = EntryLog::load(log_path)?;
    let count = csv_log::export_entries(file, log.entries.values())?;
    println!("✓ Exported {} entries to {}", count, file.display());
    Ok(())
}

fn describe_state(state: CycleState) -> &'static str {
    match state {
        CycleState::Menstruation => "Menstruation",
        CycleState::PreFertile => "Pre-fertile",
        CycleState::FertileMid => "Fertile window",
        CycleState::PeakLh => "LH peak",
        CycleState::PostOvuPending => "Awaiting ovulation confirmation",
        CycleState::OvuConfirmed => "Ovulation confirmed",
        CycleState::AnovulatorySuspected => "Possibly anovulatory",
    }
}

fn format_days(days: i64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        -1 => "yesterday".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("in {} days", d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_days() {
        assert_eq!(format_days(0), "today");
        assert_eq!(format_days(1), "tomorrow");
        assert_eq!(format_days(-1), "yesterday");
        assert_eq!(format_days(5), "in 5 days");
        assert_eq!(format_days(-3), "3 days ago");
    }

    #[test]
    fn test_merge_entry_keeps_absent_fields() {
        let mut base = DailyEntry::new("2024-01-01".parse().unwrap());
        base.temperature = Some(36.5);
        base.flow = Some(FlowLevel::Medium);

        let mut update = DailyEntry::new(base.date);
        update.lh_test = Some(LhTestResult::Peak);

        let merged = merge_entry(base, update);
        assert_eq!(merged.temperature, Some(36.5));
        assert_eq!(merged.flow, Some(FlowLevel::Medium));
        assert_eq!(merged.lh_test, Some(LhTestResult::Peak));
    }

    #[test]
    fn test_parse_flow_values() {
        assert_eq!(parse_flow("Medium").unwrap(), FlowLevel::Medium);
        assert_eq!(parse_flow("spotting").unwrap(), FlowLevel::Spotting);
        assert!(parse_flow("purple").is_err());
    }
}
