use std::process::ExitCode;

fn main() -> ExitCode {
    pipecast_cli::run()
}
