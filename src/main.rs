use std::process::ExitCode;

fn main() -> ExitCode {
    match scenario_blend::app::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_payload_json());
            ExitCode::from(err.exit_code())
        }
    }
}
