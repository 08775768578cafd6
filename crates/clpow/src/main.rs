use std::process::ExitCode;

use clpow::{app, kernel::ENTRY_POINT, RunConfig};

fn main() -> ExitCode {
    app::init_tracing();
    app::launch(RunConfig::with_entry_point(ENTRY_POINT))
}
