mod config;
mod input;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use config::PartnerscopeConfig;
use partnerscope_core::{
    normalize_billing_records, normalize_records, parse_as_of, BillingReport, ContractReport,
    Dimension, PartnerEntry, PartnerIndex, RecordFilter, Status, TimeWindow, WindowKind,
};

const LOG_ENV: &str = "PARTNERSCOPE_LOG";

#[derive(Parser)]
#[command(name = "partnerscope")]
#[command(author, version, about = "Partner deduplication and contract KPIs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable debug logging on stderr")]
    debug: bool,

    #[arg(long, global = true, help = "Config file (default: ~/.partnerscope)")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the contract report")]
    Contracts {
        #[arg(required = true, help = "Input files (.csv or .json)")]
        files: Vec<PathBuf>,
        #[arg(long, help = "Reference date (YYYY-MM-DD or DD/MM/YYYY, default: today)")]
        as_of: Option<String>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, help = "Show processing time")]
        benchmark: bool,
    },
    #[command(about = "List deduplicated partners or group them by a dimension")]
    Partners {
        #[arg(required = true, help = "Input files (.csv or .json)")]
        files: Vec<PathBuf>,
        #[arg(long, help = "Only partners resolved to this status (signed, pending, canceled)")]
        status: Option<String>,
        #[arg(long, help = "Group by agent, state, region, city or contract-type")]
        group_by: Option<String>,
        #[arg(
            long,
            conflicts_with_all = ["status", "group_by"],
            help = "Check whether a city has a signed partner"
        )]
        city: Option<String>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
    #[command(about = "Show a calendar window and the one before it")]
    Window {
        #[arg(help = "day, week, month, quarter or semester")]
        kind: String,
        #[arg(long, help = "Reference date (YYYY-MM-DD or DD/MM/YYYY, default: today)")]
        as_of: Option<String>,
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Show revenue, commissions and partner ranking")]
    Billing {
        #[arg(required = true, help = "Input files (.csv or .json)")]
        files: Vec<PathBuf>,
        #[arg(long, help = "Reference date (YYYY-MM-DD or DD/MM/YYYY, default: today)")]
        as_of: Option<String>,
        #[arg(long, help = "Simulate additional revenue")]
        simulate: Option<f64>,
        #[arg(long, default_value = "10", help = "Partners shown in the ranking")]
        top: usize,
        #[arg(long, help = "Output as JSON")]
        json: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args, Default)]
struct FilterArgs {
    #[arg(long, help = "Start date, inclusive")]
    since: Option<String>,
    #[arg(long, help = "End date, inclusive")]
    until: Option<String>,
    #[arg(
        long,
        help = "Calendar month (1-12)",
        value_parser = clap::value_parser!(u32).range(1..=12)
    )]
    month: Option<u32>,
    #[arg(long = "contract-type", help = "Contract type to keep (repeatable)")]
    contract_types: Vec<String>,
    #[arg(long = "financial-type", help = "Financial type to keep, billing only (repeatable)")]
    financial_types: Vec<String>,
    #[arg(long = "region", help = "Region to keep (repeatable)")]
    regions: Vec<String>,
    #[arg(long = "state", help = "State code to keep (repeatable)")]
    states: Vec<String>,
}

impl FilterArgs {
    fn into_filter(self) -> Result<RecordFilter> {
        Ok(RecordFilter {
            since: self.since.as_deref().map(parse_as_of).transpose()?,
            until: self.until.as_deref().map(parse_as_of).transpose()?,
            month: self.month,
            contract_types: self.contract_types,
            financial_types: self.financial_types,
            regions: self.regions,
            states: self.states,
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = PartnerscopeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Contracts {
            files,
            as_of,
            json,
            filter,
            benchmark,
        } => run_contracts_report(
            &config,
            &files,
            resolve_as_of(as_of)?,
            filter.into_filter()?,
            json,
            benchmark,
        ),
        Commands::Partners {
            files,
            status,
            group_by,
            city,
            json,
            filter,
        } => {
            let filter = filter.into_filter()?;
            if let Some(city) = city {
                return run_city_lookup(&config, &files, &city, filter, json);
            }
            let status = status.as_deref().map(str::parse::<Status>).transpose()?;
            let group_by = group_by.as_deref().map(str::parse::<Dimension>).transpose()?;
            run_partners_command(&config, &files, status, group_by, filter, json)
        }
        Commands::Window { kind, as_of, json } => {
            let kind: WindowKind = kind.parse()?;
            run_window_command(kind, resolve_as_of(as_of)?, json)
        }
        Commands::Billing {
            files,
            as_of,
            simulate,
            top,
            json,
            filter,
        } => run_billing_report(
            &config,
            &files,
            resolve_as_of(as_of)?,
            filter.into_filter()?,
            simulate,
            top,
            json,
        ),
    }
}

fn init_logging(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        Some(EnvFilter::new("debug"))
    } else {
        std::env::var(LOG_ENV).ok().map(EnvFilter::new)
    };

    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn resolve_as_of(raw: Option<String>) -> Result<NaiveDate> {
    match raw {
        Some(raw) => Ok(parse_as_of(&raw)?),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn run_contracts_report(
    config: &PartnerscopeConfig,
    files: &[PathBuf],
    as_of: NaiveDate,
    filter: RecordFilter,
    json: bool,
    benchmark: bool,
) -> Result<()> {
    let start = Instant::now();
    let raws = input::load_raw_records(files)?;
    let records = filter.apply(&normalize_records(&raws, &config.columns));
    let report = ContractReport::build(&records, as_of, &config.report_options());
    let processing_time_ms = start.elapsed().as_millis();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Metric", "Partners"]);
    table.add_row(vec!["Unique partners".to_string(), format_count(report.counts.unique)]);
    table.add_row(vec!["Signed".to_string(), format_count(report.counts.signed)]);
    table.add_row(vec!["Pending".to_string(), format_count(report.counts.pending)]);
    table.add_row(vec!["Canceled".to_string(), format_count(report.counts.canceled)]);
    table.add_row(vec!["No status".to_string(), format_count(report.counts.unresolved)]);
    table.add_row(vec![
        "Unidentified rows".to_string(),
        format_count(report.unidentified_records),
    ]);
    println!("{table}");

    let mut windows = Table::new();
    windows.set_content_arrangement(ContentArrangement::Dynamic);
    windows.set_header(vec!["Window", "Period", "Signed"]);
    for window in &report.windows {
        windows.add_row(vec![
            window.kind.to_string(),
            window.label.clone(),
            format_count(window.signed),
        ]);
    }
    println!("\nSigned as of {}", report.as_of);
    println!("{windows}");

    println!(
        "\nWeek vs last week: {}",
        format_comparison(report.week_over_week.difference, report.week_over_week.progress_pct)
    );
    println!(
        "Month vs last month: {}",
        format_comparison(report.month_over_month.difference, report.month_over_month.progress_pct)
    );

    let mut goals = Table::new();
    goals.set_content_arrangement(ContentArrangement::Dynamic);
    goals.set_header(vec!["Goal", "Achieved", "Target", "Progress"]);
    for goal in &report.goals {
        goals.add_row(vec![
            goal.label.clone(),
            format_count(goal.achieved),
            goal.target.to_string(),
            goal.ratio.map_or_else(|| "-".to_string(), |r| format_pct(r * 100.0)),
        ]);
    }
    println!("\n{goals}");

    if !report.signed_by_region.is_empty() {
        let mut regions = Table::new();
        regions.set_content_arrangement(ContentArrangement::Dynamic);
        regions.set_header(vec!["Region", "Signed"]);
        for (region, count) in &report.signed_by_region {
            regions.add_row(vec![region.clone(), format_count(*count)]);
        }
        println!("\n{regions}");
    }
    println!(
        "States with signed partners: {} | Cities: {}",
        report.signed_states, report.signed_cities
    );

    if !report.signed_state_distribution.is_empty() {
        let mut distribution = Table::new();
        distribution.set_content_arrangement(ContentArrangement::Dynamic);
        distribution.set_header(vec!["Partners", "States", "Codes"]);
        for bucket in &report.signed_state_distribution {
            distribution.add_row(vec![
                format_count(bucket.partners),
                format_count(bucket.state_count),
                bucket.states.join(", "),
            ]);
        }
        println!("\n{distribution}");
    }
    if !report.states_without_signed.is_empty() {
        println!(
            "States without signed partners: {}",
            report.states_without_signed.join(", ")
        );
    }

    if benchmark {
        use colored::Colorize;
        println!(
            "{}",
            format!("  Processing time: {}ms ({} rows)", processing_time_ms, report.record_count)
                .bright_black()
        );
    }

    Ok(())
}

fn run_partners_command(
    config: &PartnerscopeConfig,
    files: &[PathBuf],
    status: Option<Status>,
    group_by: Option<Dimension>,
    filter: RecordFilter,
    json: bool,
) -> Result<()> {
    let raws = input::load_raw_records(files)?;
    let records = filter.apply(&normalize_records(&raws, &config.columns));
    let index = PartnerIndex::build(&records);

    if let Some(dimension) = group_by {
        let groups = match status {
            Some(status) => index.group_by_status(dimension, status),
            None => index.group_by(dimension),
        };

        if json {
            println!("{}", serde_json::to_string_pretty(&groups)?);
        } else {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![dimension.to_string(), "Partners".to_string()]);
            for (label, count) in &groups {
                table.add_row(vec![label.clone(), format_count(*count)]);
            }
            println!("{table}");
        }
        return Ok(());
    }

    let entries: Vec<&PartnerEntry> = match status {
        Some(status) => index.with_status(status).collect(),
        None => index.entries().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Partner", "Status", "Agent", "State", "City", "Rows"]);
    for entry in &entries {
        let rep = &entry.representative;
        table.add_row(vec![
            entry.key.to_string(),
            entry
                .resolved_status
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
            rep.agent.clone().unwrap_or_default(),
            rep.state.clone(),
            rep.city.clone(),
            entry.member_count.to_string(),
        ]);
    }
    println!("{table}");
    println!(
        "\nTotal: {} partners from {} rows",
        format_count(entries.len()),
        format_count(index.record_count())
    );

    Ok(())
}

fn run_city_lookup(
    config: &PartnerscopeConfig,
    files: &[PathBuf],
    city: &str,
    filter: RecordFilter,
    json: bool,
) -> Result<()> {
    let raws = input::load_raw_records(files)?;
    let records = filter.apply(&normalize_records(&raws, &config.columns));
    let lookup = PartnerIndex::build(&records).find_city(city);

    if json {
        println!("{}", serde_json::to_string_pretty(&lookup)?);
        return Ok(());
    }

    use colored::Colorize;
    let line = if lookup.is_exact() {
        format!(
            "{} has a signed partner (states: {})",
            lookup.query,
            lookup.exact_states.join(", ")
        )
        .green()
    } else if lookup.is_miss() {
        format!("{} has no signed partner", lookup.query).red()
    } else {
        format!(
            "No exact match for {}. Did you mean: {}?",
            lookup.query,
            lookup.suggestions.join(", ")
        )
        .yellow()
    };
    println!("{line}");

    Ok(())
}

fn run_window_command(kind: WindowKind, as_of: NaiveDate, json: bool) -> Result<()> {
    let current = TimeWindow::containing(kind, as_of);
    let previous = current.previous();

    if json {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct WindowJson {
            current: TimeWindow,
            previous: TimeWindow,
            current_label: String,
            previous_label: String,
        }

        let output = WindowJson {
            current_label: current.label(),
            previous_label: previous.label(),
            current,
            previous,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Current:  {}", current);
        println!("Previous: {}", previous);
    }

    Ok(())
}

fn run_billing_report(
    config: &PartnerscopeConfig,
    files: &[PathBuf],
    as_of: NaiveDate,
    filter: RecordFilter,
    simulate: Option<f64>,
    top: usize,
    json: bool,
) -> Result<()> {
    let raws = input::load_raw_records(files)?;
    let history = normalize_billing_records(&raws, &config.billing_columns);
    let records = filter.apply_billing(&history);
    let mut report = BillingReport::build(
        &records,
        &history,
        as_of,
        config.team_commission_rate,
        simulate,
    );
    report.ranking.truncate(top);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let team_label = format!("Team commission ({})", format_pct(report.summary.team_rate * 100.0));

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    match report.simulated {
        Some(sim) => {
            table.set_header(vec!["", "Current", "Simulated"]);
            table.add_row(vec![
                "Revenue".to_string(),
                format_currency(report.summary.total),
                format_currency(sim.total),
            ]);
            table.add_row(vec![
                "Partner commission".to_string(),
                format_currency(report.summary.partner_commission),
                format_currency(sim.partner_commission),
            ]);
            table.add_row(vec![
                team_label,
                format_currency(report.summary.team_commission),
                format_currency(sim.team_commission),
            ]);
            table.add_row(vec![
                "Net".to_string(),
                format_currency(report.summary.net),
                format_currency(sim.net),
            ]);
        }
        None => {
            table.set_header(vec!["", "Current"]);
            table.add_row(vec!["Revenue".to_string(), format_currency(report.summary.total)]);
            table.add_row(vec![
                "Partner commission".to_string(),
                format_currency(report.summary.partner_commission),
            ]);
            table.add_row(vec![team_label, format_currency(report.summary.team_commission)]);
            table.add_row(vec!["Net".to_string(), format_currency(report.summary.net)]);
        }
    }
    println!("{table}");

    println!(
        "\nThis month: {} | Last month: {} | {}",
        format_currency(report.month_over_month.current),
        format_currency(report.month_over_month.previous),
        format_comparison(report.month_over_month.difference, report.month_over_month.progress_pct)
    );

    if !report.monthly.is_empty() {
        let mut monthly = Table::new();
        monthly.set_content_arrangement(ContentArrangement::Dynamic);
        monthly.set_header(vec!["Month", "Revenue"]);
        for month in &report.monthly {
            monthly.add_row(vec![month.label(), format_currency(month.total)]);
        }
        println!("\n{monthly}");
    }

    if !report.ranking.is_empty() {
        let mut ranking = Table::new();
        ranking.set_content_arrangement(ContentArrangement::Dynamic);
        ranking.set_header(vec!["#", "Partner", "Sales", "Revenue"]);
        for (i, partner) in report.ranking.iter().enumerate() {
            ranking.add_row(vec![
                (i + 1).to_string(),
                partner.display_name.clone(),
                format_count(partner.sales),
                format_currency(partner.revenue),
            ]);
        }
        println!("\n{ranking}");
    }

    Ok(())
}

fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn format_currency(n: f64) -> String {
    let sign = if n < 0.0 { "-" } else { "" };
    let cents = (n.abs() * 100.0).round() as u64;
    format!(
        "{}R$ {}.{:02}",
        sign,
        format_count((cents / 100) as usize),
        cents % 100
    )
}

fn format_pct(pct: f64) -> String {
    format!("{:.1}%", pct)
}

fn format_comparison(difference: f64, progress_pct: Option<f64>) -> String {
    use colored::Colorize;

    let pct = progress_pct.map_or_else(|| "n/a".to_string(), format_pct);
    let text = format!("{:+} ({})", difference, pct);
    if difference > 0.0 {
        text.green().to_string()
    } else if difference < 0.0 {
        text.red().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "R$ 0.00");
        assert_eq!(format_currency(1000.5), "R$ 1,000.50");
        assert_eq!(format_currency(-12.345), "-R$ 12.35");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(150.0), "150.0%");
        assert_eq!(format_pct(33.333), "33.3%");
    }

    #[test]
    fn test_filter_args_parse_dates() {
        let args = FilterArgs {
            since: Some("01/07/2024".to_string()),
            until: Some("2024-07-31".to_string()),
            ..FilterArgs::default()
        };
        let filter = args.into_filter().unwrap();
        assert_eq!(filter.since, NaiveDate::from_ymd_opt(2024, 7, 1));
        assert_eq!(filter.until, NaiveDate::from_ymd_opt(2024, 7, 31));

        let bad = FilterArgs {
            since: Some("07/25/2024".to_string()),
            ..FilterArgs::default()
        };
        assert!(bad.into_filter().is_err());
    }

    #[test]
    fn test_filter_args_keep_financial_types_apart() {
        let args = FilterArgs {
            contract_types: vec!["NORMAL".to_string()],
            financial_types: vec!["TECNICO".to_string()],
            ..FilterArgs::default()
        };
        let filter = args.into_filter().unwrap();
        assert_eq!(filter.contract_types, vec!["NORMAL"]);
        assert_eq!(filter.financial_types, vec!["TECNICO"]);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
