//! Same run as `clpow`, with the kernel entry point named `vpow`.

use std::process::ExitCode;

use clpow::{app, kernel::VPOW_ENTRY_POINT, RunConfig};

fn main() -> ExitCode {
    app::init_tracing();
    app::launch(RunConfig::with_entry_point(VPOW_ENTRY_POINT))
}
