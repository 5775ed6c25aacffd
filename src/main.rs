mod args;
mod rcv;

use clap::Parser;
use log::{error, LevelFilter};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let request = rcv::ElectionRequest {
        config_path: args.config,
        input_path: args.input,
        input_type: args.input_type,
        excel_worksheet_name: args.excel_worksheet_name,
        out_path: args.out,
        reference_path: args.reference,
        history_path: args.history,
    };

    if let Err(e) = rcv::run_election(&request) {
        error!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
