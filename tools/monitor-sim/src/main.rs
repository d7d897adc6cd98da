//! Runs the kernel monitor on the host against a simulated kernel.
//!
//! ```text
//! monitor-sim            # interactive, reads stdin
//! monitor-sim script.txt # runs the commands in script.txt, echoing each
//! MONITOR_LOG=trace monitor-sim
//! ```

mod console;
mod logger;
mod machine;

use console::LineConsole;
use kernel_monitor::Monitor;
use log::{error, info};
use logger::StderrLogger;
use machine::SimKernel;
use std::fs::File;
use std::io::{self, BufReader};
use std::{env, process::ExitCode};

fn main() -> ExitCode {
    if StderrLogger::from_env().init().is_err() {
        eprintln!("logger already installed");
    }

    let kernel = SimKernel::boot();
    let monitor = Monitor::new(kernel.machine());
    info!("{} commands registered", monitor.registry().len());

    let stdout = io::stdout().lock();
    match env::args_os().nth(1) {
        Some(path) => {
            let script = match File::open(&path) {
                Ok(file) => BufReader::new(file),
                Err(err) => {
                    error!("cannot open {}: {err}", path.display());
                    return ExitCode::FAILURE;
                }
            };
            monitor.run(&mut LineConsole::new(script, stdout, true), None);
        }
        None => {
            monitor.run(&mut LineConsole::new(io::stdin().lock(), stdout, false), None);
        }
    }
    ExitCode::SUCCESS
}
