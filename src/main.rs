use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use maniarb::arb::portfolio::Portfolio;
use maniarb::arb::solver::MaximinSolver;
use maniarb::bot::Bot;
use maniarb::config::Config;
use maniarb::exec::executor::{ArbExecutor, Quoted};
use maniarb::exec::throttle::Throttled;
use maniarb::listing::Listing;
use maniarb::manifold::ManifoldClient;
use maniarb::utils::logger::setup_logger;

/// Venue stack used by every trading command.
type LiveBot = Bot<Throttled<ManifoldClient>>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cycles until interrupted (default)
    Run,
    /// Run a single cycle
    Once,
    /// Quote every portfolio and print its plan without trading
    Plan,
    /// Print the portfolios expanded from the listing
    List,
}

fn load_portfolios(path: &std::path::Path) -> Result<Vec<Portfolio>> {
    let listing = Listing::from_file(path)?;
    listing
        .portfolios()
        .wrap_err_with(|| format!("expanding listing {}", path.display()))
}

fn build_bot(config: Config) -> Result<LiveBot> {
    let portfolios = load_portfolios(&config.listing_path)?;
    let client = ManifoldClient::new(config.api_url, config.api_key, config.order_expiry)?;
    let venue = Throttled::new(client, config.read_delay, config.order_delay);
    let executor = ArbExecutor::new(venue, MaximinSolver::default(), config.account, config.executor);
    Ok(Bot::new(executor, portfolios, config.cycle_pause))
}

async fn print_plans(bot: &LiveBot) -> Result<()> {
    let progress = ProgressBar::new(bot.portfolios().len() as u64);
    progress.set_style(ProgressStyle::default_bar().template("{bar:40} {pos}/{len} {msg}")?);

    let mut accepted = Vec::new();
    for portfolio in bot.portfolios() {
        progress.set_message(portfolio.to_string());
        match bot.executor().quote(portfolio).await {
            Ok(Quoted::Accepted { quote, .. }) => accepted.push((portfolio, quote)),
            Ok(Quoted::Rejected(rejection)) => {
                progress.println(format!("{portfolio}: rejected, {rejection}"));
            }
            Err(error) => progress.println(format!("{portfolio}: {error}")),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    accepted.sort_by(|(_, a), (_, b)| b.roi().total_cmp(&a.roi()));
    println!("{} of {} portfolios tradeable", accepted.len(), bot.portfolios().len());
    for (portfolio, quote) in accepted {
        println!("{portfolio}\n{quote}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logger()?;

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::List) => {
            let portfolios = load_portfolios(&Config::listing_path_from_env())?;
            for portfolio in &portfolios {
                println!("{portfolio}");
            }
            info!("{} portfolios", portfolios.len());
        }
        Some(Commands::Plan) => {
            let bot = build_bot(Config::from_env()?)?;
            print_plans(&bot).await?;
        }
        Some(Commands::Once) => {
            let bot = build_bot(Config::from_env()?)?;
            let report = bot.run_cycle().await?;
            info!("cycle done {report:?}");
        }
        Some(Commands::Run) | None => {
            let config = Config::from_env()?;
            if config.executor.dry_run {
                info!("dry run: no orders will be submitted");
            }
            build_bot(config)?.run().await?;
        }
    }

    Ok(())
}
