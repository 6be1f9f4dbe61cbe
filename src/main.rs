use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use oocesk_core::driver::{self, RunOutcome};
use oocesk_core::MachineContext;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "oocesk", about = "a CESK abstract machine for a class-oriented intermediate language")]
struct Opt {
    /// Source files to load, in order. The main class is the first one found,
    /// scanning files and then classes in declaration order, whose method
    /// table contains `main`.
    #[structopt(name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Print the full error chain (kind, location, detail) instead of one line.
    #[structopt(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let opt = Opt::from_args();

    let sources: Vec<(String, String)> = match opt
        .files
        .iter()
        .map(|path| {
            fs::read_to_string(path)
                .map(|text| (path.display().to_string(), text))
                .map_err(|e| format!("{}: {e}", path.display()))
        })
        .collect()
    {
        Ok(sources) => sources,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = MachineContext::new();
    let order = match driver::load(&sources, &mut ctx) {
        Ok(order) => order,
        Err(e) => {
            report(&e, opt.verbose);
            return ExitCode::FAILURE;
        }
    };

    let main_class = match driver::find_main_class(&order, &ctx) {
        Some(name) => name.to_string(),
        None => {
            eprintln!("error: no class with a 'main' method was found");
            return ExitCode::FAILURE;
        }
    };

    match driver::run(&main_class, &ctx, &mut std::io::stdout()) {
        Ok(RunOutcome::NormalHalt { .. }) => ExitCode::SUCCESS,
        Ok(RunOutcome::UncaughtException { exception }) => {
            eprintln!("uncaught exception: {exception}");
            ExitCode::FAILURE
        }
        Err(e) => {
            report(&e, opt.verbose);
            ExitCode::FAILURE
        }
    }
}

fn report(e: &(impl std::fmt::Display + std::fmt::Debug), verbose: bool) {
    if verbose {
        eprintln!("fatal: {e}\n  detail: {e:?}");
    } else {
        eprintln!("error: {e}");
    }
}
