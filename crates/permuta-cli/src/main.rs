use std::process::ExitCode;

mod command;
mod schema;
mod util;

fn main() -> ExitCode {
    match command::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(util::exit_status(&err))
        }
    }
}
