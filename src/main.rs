use std::process::ExitCode;

fn main() -> ExitCode {
    match stress_runner::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
