use catalog_sync::cli::CliArgs;
use catalog_sync::core::processor;
use catalog_sync::error::{AppError, AppResult};
use catalog_sync::logging::{log, setup_logging, LogLevel};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tokio::runtime::Builder;

fn main() -> ExitCode {
    setup_logging();

    let cli_args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            log(LogLevel::Error, &format!("CLI Argument Error: {}", e));
            let _ = CliArgs::command().print_help();
            return ExitCode::from(2);
        }
    };

    let runtime = match Builder::new_multi_thread()
        .enable_all()
        .thread_name("catalog-worker")
        .worker_threads(num_cpus::get())
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log(
                LogLevel::Error,
                &format!("FATAL: Failed to build Tokio runtime: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    let main_result: AppResult<i32> = runtime.block_on(processor::run(cli_args.command));

    match main_result {
        Ok(exit_code) => ExitCode::from(exit_code as u8),
        Err(e) => {
            match &e {
                AppError::Argument(msg) => log(LogLevel::Error, msg),
                e if e.is_fatal_input() => {
                    log(LogLevel::Error, &format!("Stage aborted, nothing written: {}", e))
                }
                e => log(LogLevel::Error, &format!("FATAL UNEXPECTED ERROR: {:?}", e)),
            }
            ExitCode::FAILURE
        }
    }
}
