//! Environment configuration.
//!
//! Every variable has a default except the account credentials. A `.env`
//! file in the working directory is loaded first.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use url::Url;

use crate::arb::planner::PlannerConfig;
use crate::exec::executor::ExecutorConfig;
use crate::exec::throttle::{DEFAULT_ORDER_DELAY, DEFAULT_READ_DELAY};
use crate::exec::venue::Account;
use crate::manifold::DEFAULT_BASE_URL;

/// Listing file read when `ARB_LISTING_PATH` is unset.
pub const DEFAULT_LISTING_PATH: &str = "arb_listing.json";

/// Runtime configuration of the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// REST root of the venue
    pub api_url: Url,
    /// API key for order submission
    pub api_key: Option<String>,
    /// Account traded with
    pub account: Account,
    /// Curated groupings file
    pub listing_path: PathBuf,
    /// Execution policy
    pub executor: ExecutorConfig,
    /// Pause before every read call
    pub read_delay: Duration,
    /// Pause before every order submission
    pub order_delay: Duration,
    /// Pause between cycles
    pub cycle_pause: Duration,
    /// Lifetime of unfilled limit orders
    pub order_expiry: Duration,
}

impl Config {
    /// Loads `.env` and reads the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a credential is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads `.env` and reads only the listing path, for commands that never
    /// touch the venue.
    #[must_use]
    pub fn listing_path_from_env() -> PathBuf {
        dotenv::dotenv().ok();
        listing_path(&|name: &str| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ExecutorConfig::default();
        let planner = PlannerConfig {
            true_value: parse(&lookup, "ARB_TRUE_VALUE", defaults.planner.true_value)?,
            fee_per_trade: parse(&lookup, "ARB_FEE_PER_TRADE", defaults.planner.fee_per_trade)?,
            spending_cap: parse(&lookup, "ARB_SPENDING_CAP", defaults.planner.spending_cap)?,
            holding_cap: parse(&lookup, "ARB_HOLDING_CAP", defaults.planner.holding_cap)?,
        };
        let executor = ExecutorConfig {
            planner,
            min_trade: parse(&lookup, "ARB_MIN_TRADE", defaults.min_trade)?,
            max_trade: parse(&lookup, "ARB_MAX_TRADE", defaults.max_trade)?,
            min_roi: parse(&lookup, "ARB_MIN_ROI", defaults.min_roi)?,
            dry_run: parse(&lookup, "ARB_DRY_RUN", defaults.dry_run)?,
            price_tolerance: defaults.price_tolerance,
        };
        if executor.min_trade > executor.max_trade {
            return Err(eyre!(
                "ARB_MIN_TRADE {} exceeds ARB_MAX_TRADE {}",
                executor.min_trade,
                executor.max_trade
            ));
        }

        let api_url = lookup("MANIFOLD_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_url =
            Url::parse(&api_url).wrap_err_with(|| format!("MANIFOLD_API_URL {api_url:?}"))?;

        Ok(Self {
            api_url,
            api_key: lookup("MANIFOLD_API_KEY").filter(|key| !key.is_empty()),
            account: Account {
                username: required(&lookup, "MANIFOLD_USERNAME")?,
                user_id: required(&lookup, "MANIFOLD_USER_ID")?,
            },
            listing_path: listing_path(&lookup),
            executor,
            read_delay: millis(&lookup, "ARB_READ_DELAY_MS", DEFAULT_READ_DELAY)?,
            order_delay: millis(&lookup, "ARB_ORDER_DELAY_MS", DEFAULT_ORDER_DELAY)?,
            cycle_pause: Duration::from_secs(parse(&lookup, "ARB_CYCLE_SECS", 300)?),
            order_expiry: Duration::from_secs(parse(&lookup, "ARB_ORDER_EXPIRY_SECS", 60)?),
        })
    }
}

/// `ARB_LISTING_PATH`, or the default listing file.
fn listing_path(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("ARB_LISTING_PATH").map_or_else(|| PathBuf::from(DEFAULT_LISTING_PATH), PathBuf::from)
}

/// A non-empty variable with no default.
fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| eyre!("{name} not set"))
}

/// Parses `name` if set, else returns `default`.
fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|error| eyre!("{name}: invalid value {raw:?}: {error}")),
    }
}

/// A duration given in milliseconds.
fn millis(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: Duration) -> Result<Duration> {
    let default = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse(lookup, name, default).map(Duration::from_millis)
}
