use std::process::ExitCode;

fn main() -> ExitCode {
    veritas_cli::run()
}
