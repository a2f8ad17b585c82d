use std::process::ExitCode;

use gridwire_config::Config;

#[expect(
    clippy::print_stderr,
    reason = "configuration errors are reported before telemetry exists"
)]
fn main() -> ExitCode {
    let config = match Config::load_validated() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("gridwired: {error}");
            return ExitCode::FAILURE;
        }
    };

    match gridwired::run_daemon(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "gridwired::process", %error, "daemon exited with an error");
            ExitCode::FAILURE
        }
    }
}
