use std::process::ExitCode;

fn main() -> ExitCode {
    match chaos_agentd::run_agent() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
