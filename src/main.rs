mod cli;
mod core;
mod io;
mod prelude;
mod quantity;
mod solver;
mod tables;
mod tariff;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    prelude::*,
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Btm(args) => args.run()?,
        Command::Valuation(args) => args.run()?,
    }

    info!("done!");
    Ok(())
}
