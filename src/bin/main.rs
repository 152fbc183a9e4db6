use std::process;

use clap::Parser;
use logger::Logger;
use supernovo::Args;

#[macro_use]
extern crate log;

fn main() {
    let args = Args::parse();
    Logger::init(args.verbose);

    if let Err(e) = supernovo::run(args) {
        error!("{e:#}");
        process::exit(1);
    }
}
