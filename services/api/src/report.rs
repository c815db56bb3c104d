use auction_scoring::config::AppConfig;
use auction_scoring::error::AppError;
use auction_scoring::scoring::{
    resolve_input, CancellationFlag, CsvPropertyStore, PropertyId, PropertyRecord,
    RecalculationScope, RecalculationSummary, ScoreBoard, ScoreResult, ScoringEngine,
    ScoringError, ScoringPolicy, ScoringService, StateConfig, StateRegistry,
};
use auction_scoring::telemetry;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Failures listed in the console summary before truncating.
const MAX_LISTED_FAILURES: usize = 20;

#[derive(Args, Debug)]
pub(crate) struct RecalculateArgs {
    /// Scraped property CSV to score
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Where to write scored rows (defaults to rewriting the input file)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Only recalculate properties in this state (e.g. AR)
    #[arg(long)]
    pub(crate) state: Option<String>,
    /// Score everything but write nothing
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Override the capital limit for this run
    #[arg(long)]
    pub(crate) capital_limit: Option<f64>,
    /// Number of top buy-hold properties to list
    #[arg(long, default_value_t = 10)]
    pub(crate) top: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Two-letter state code
    #[arg(long)]
    pub(crate) state: String,
    /// Winning bid or opening amount in dollars
    #[arg(long)]
    pub(crate) amount: f64,
    #[arg(long)]
    pub(crate) acreage: Option<f64>,
    #[arg(long)]
    pub(crate) county: Option<String>,
    /// Year the property went delinquent / was sold
    #[arg(long)]
    pub(crate) year_sold: Option<String>,
    #[arg(long)]
    pub(crate) water: Option<f64>,
    #[arg(long)]
    pub(crate) road_access: Option<f64>,
    #[arg(long)]
    pub(crate) county_market: Option<f64>,
    #[arg(long)]
    pub(crate) geographic: Option<f64>,
    #[arg(long)]
    pub(crate) description: Option<f64>,
    /// Known resale value, preferred over the assessed estimate
    #[arg(long)]
    pub(crate) market_value: Option<f64>,
    #[arg(long)]
    pub(crate) assessed_value: Option<f64>,
    #[arg(long)]
    pub(crate) capital_limit: Option<f64>,
    /// Print the raw result as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_recalculate(args: RecalculateArgs) -> Result<(), AppError> {
    let RecalculateArgs {
        input,
        output,
        state,
        dry_run,
        capital_limit,
        top,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    let policy = with_capital_limit(config.scoring, capital_limit);

    let store = Arc::new(CsvPropertyStore::from_path(&input)?);
    let service = ScoringService::new(store.clone(), StateRegistry::standard(), policy);

    let scope = RecalculationScope { state, dry_run };
    let summary = service.recalculate(&scope, &CancellationFlag::new())?;
    render_summary(&summary);

    if dry_run {
        return Ok(());
    }

    let destination = output.unwrap_or(input);
    store.save(&destination)?;
    println!("Scores written to {}", destination.display());

    let records: Vec<PropertyRecord> = store
        .records()?
        .into_iter()
        .filter(|record| scope.includes(record))
        .collect();
    render_board(&ScoreBoard::from_records(&records, top));

    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let policy = with_capital_limit(config.scoring, args.capital_limit);
    let json = args.json;

    let record = cli_record(args);
    let result = score_cli_record(&record, policy)?;
    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Result payload unavailable: {err}"),
        }
    } else {
        render_score(&record, &result);
    }
    Ok(())
}

fn cli_record(args: ScoreArgs) -> PropertyRecord {
    PropertyRecord {
        id: PropertyId("cli".to_string()),
        state_code: args.state,
        county: args.county,
        amount: Some(args.amount),
        acreage: args.acreage,
        water_score: args.water,
        road_access_score: args.road_access,
        county_market_score: args.county_market,
        geographic_score: args.geographic,
        total_description_score: args.description,
        year_sold: args.year_sold,
        known_market_value: args.market_value,
        assessed_value: args.assessed_value,
        ..PropertyRecord::default()
    }
}

/// Scores a one-off property straight through the engine; nothing is stored.
fn score_cli_record(
    record: &PropertyRecord,
    policy: ScoringPolicy,
) -> Result<ScoreResult, ScoringError> {
    let input = resolve_input(record, &StateRegistry::standard())?;
    Ok(ScoringEngine::new(policy).score(&input))
}

pub(crate) fn run_states() -> Result<(), AppError> {
    let registry = StateRegistry::standard();
    println!(
        "{:<5} {:<10} {:<16} {:>10} {:>10} {:>11}  flags",
        "code", "name", "sale type", "redeem d", "to own d", "quiet title"
    );
    for state in registry.iter() {
        println!("{}", state_line(state));
    }
    Ok(())
}

fn with_capital_limit(mut policy: ScoringPolicy, capital_limit: Option<f64>) -> ScoringPolicy {
    if let Some(limit) = capital_limit {
        policy.capital_limit = limit;
    }
    policy
}

fn state_line(state: &StateConfig) -> String {
    let mut flags = Vec::new();
    if state.is_active {
        flags.push("active");
    }
    if state.recommended_for_beginners {
        flags.push("beginner");
    }
    if state.sale_type.conveys_title() {
        flags.push("wholesale");
    }
    format!(
        "{:<5} {:<10} {:<16} {:>10} {:>10} {:>11.0}  {}",
        state.state_code,
        state.state_name,
        state.sale_type.label(),
        state.redemption_period_days,
        state.time_to_ownership_days,
        state.quiet_title_cost_estimate,
        flags.join(",")
    )
}

pub(crate) fn render_summary(summary: &RecalculationSummary) {
    println!("Score recalculation");
    println!(
        "Scope: {}",
        summary.scope.state.as_deref().unwrap_or("all states")
    );
    println!("Result: {}", summary.headline());
    let elapsed = summary.finished_at - summary.started_at;
    println!("Elapsed: {} ms", elapsed.num_milliseconds());

    if summary.errors.is_empty() {
        return;
    }
    println!("Skipped properties:");
    for failure in summary.errors.iter().take(MAX_LISTED_FAILURES) {
        println!(
            "  - {} [{:?}]: {}",
            failure.property_id, failure.kind, failure.reason
        );
    }
    if summary.errors.len() > MAX_LISTED_FAILURES {
        println!(
            "  ... {} more",
            summary.errors.len() - MAX_LISTED_FAILURES
        );
    }
}

pub(crate) fn render_board(board: &ScoreBoard) {
    if board.states.is_empty() {
        println!("\nNo scored properties.");
        return;
    }

    println!("\nScore distribution by state");
    println!(
        "{:<5} {:>7} {:>9} {:>9} {:>11} {:>7} {:>8} {:>6}",
        "state", "count", "buy-hold", "wholesale", "eff. cost", "time", "rejects", "delta"
    );
    for state in &board.states {
        println!(
            "{:<5} {:>7} {:>9.1} {:>9.1} {:>11.0} {:>7.3} {:>8} {:>6}",
            state.state_code,
            state.count,
            state.average_buy_hold,
            state.average_wholesale,
            state.average_effective_cost,
            state.average_time_penalty,
            state.market_rejects,
            state.delta_region
        );
    }

    if board.top_buy_hold.is_empty() {
        return;
    }
    println!("\nTop {} buy-hold properties", board.top_buy_hold.len());
    for (rank, property) in board.top_buy_hold.iter().enumerate() {
        println!(
            "{:>3}. {} {} / {} | ${:.0} | {} ac | buy-hold {:.1} | wholesale {:.1}",
            rank + 1,
            property.id,
            property.state_code,
            property.county.as_deref().unwrap_or("unknown county"),
            property.amount.unwrap_or_default(),
            property
                .acreage
                .map(|acres| format!("{acres:.2}"))
                .unwrap_or_else(|| "?".to_string()),
            property.buy_hold_score,
            property.wholesale_score
        );
    }
}

fn render_score(record: &PropertyRecord, result: &ScoreResult) {
    println!(
        "{} property, ${:.0} bid",
        record.state_code.to_ascii_uppercase(),
        record.amount.unwrap_or_default()
    );
    println!("- Buy-hold score: {:.1}", result.buy_hold_score);
    println!("- Wholesale score: {:.1}", result.wholesale_score);
    println!(
        "- Effective cost: ${:.0} ({})",
        result.effective_cost,
        if result.capital_viable {
            "within capital limit"
        } else {
            "over capital limit"
        }
    );
    println!("- Time penalty factor: {:.3}", result.time_penalty_factor);
    if let Some(value) = result.estimated_market_value {
        println!("- Estimated market value: ${value:.0}");
    }
    if let Some(spread) = result.wholesale_spread {
        println!("- Wholesale spread: ${spread:.0}");
    }
    if !result.components.is_empty() {
        println!("  Components:");
        for component in &result.components {
            println!(
                "    - {}: {:.1} x {:.2} ({})",
                component.factor.label(),
                component.value,
                component.weight,
                component.notes
            );
        }
    }
    for note in &result.notes {
        println!("  * {note}");
    }
}
