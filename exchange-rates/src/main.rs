use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use exchange_client::{Currency, DEFAULT_BASE_URL, ExchangeClient, RateSheet, format_date};
use tracing::debug;

/// Oldest date, in days before today, the tool will ask for.
const MAX_DAYS_AGO: i64 = 10;

const OUT_OF_RANGE: &str = "Exchange rates are only available for the last 10 days (0-10).";

/// Prints the exchange rates published for one recent date.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// How many days back to look: 0 is today, 10 is the oldest allowed.
    #[arg(allow_negative_numbers = true)]
    days: i64,

    /// Currencies to print, separated by spaces (e.g. --currencies USD EUR GBP).
    #[arg(long, value_enum, num_args = 1.., ignore_case = true, default_values_t = Currency::DEFAULT_SET)]
    currencies: Vec<Currency>,

    /// Exchange-rate endpoint to query.
    #[arg(long, env = "EXCHANGE_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn render(date: NaiveDate, sheet: &RateSheet, selected: &[Currency]) -> String {
    let mut out = format!("\n{}:\n", format_date(date));
    for rate in selected.iter().filter_map(|currency| sheet.get(*currency)) {
        out.push_str(&format!(
            "{} sale: {} purchase: {}\n",
            rate.currency, rate.sell, rate.buy
        ));
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    if !(0..=MAX_DAYS_AGO).contains(&args.days) {
        println!("{OUT_OF_RANGE}");
        return Ok(());
    }

    let today = Local::now().date_naive();
    let date = today
        .checked_sub_days(Days::new(args.days.unsigned_abs()))
        .context("date out of range")?;

    let client = ExchangeClient::new()
        .with_base_url(args.api_url)
        .tracking(args.currencies.iter().copied());
    debug!(url = %client.url_for(date), "fetching rates");

    let sheet = client.fetch_rates(date).await?;
    print!("{}", render(date, &sheet, &args.currencies));

    Ok(())
}
