mod btm;
mod calendar;
mod storage;
mod valuation;
mod workers;

use clap::{Parser, Subcommand};

use crate::cli::{btm::BtmArgs, valuation::ValuationArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Behind-the-meter bill savings, solving every month at once versus day by day.
    #[clap(name = "btm")]
    Btm(Box<BtmArgs>),

    /// Wholesale market revenue with perfect foresight versus a persistent forecast.
    #[clap(name = "valuation")]
    Valuation(Box<ValuationArgs>),
}
