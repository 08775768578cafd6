//! Shared `main` for both binaries.

use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::run::{execute, RunConfig};
use crate::ClError;

/// Exit code for a panic or anything else that is not a [`ClError`].
pub const UNKNOWN_EXIT: u8 = 3;

/// What [`execute`] produced, with a panic caught as `Err`.
pub type Outcome = std::thread::Result<Result<(usize, f64), ClError>>;

/// Process exit code for `outcome`: 0, then 1/2 per [`ClError::exit_code`],
/// then [`UNKNOWN_EXIT`] for a panic.
pub fn exit_code_of(outcome: &Outcome) -> u8 {
    match outcome {
        Ok(Ok(_)) => 0,
        Ok(Err(err)) => err.exit_code(),
        Err(_) => UNKNOWN_EXIT,
    }
}

/// Formats `value` like a default C++ stream: six significant digits,
/// trailing zeros dropped, scientific notation below `1e-4` and from `1e6`.
pub fn format_value(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_owned();
    }

    let sci = format!("{value:.5e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if (-4..6).contains(&exp) {
        let decimals = (5 - exp) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_owned()
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exp.abs())
    }
}

fn trim_zeros(digits: &str) -> &str {
    if !digits.contains('.') {
        return digits;
    }
    digits.trim_end_matches('0').trim_end_matches('.')
}

/// stderr subscriber; `RUST_LOG` overrides the default `warn` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Message printed to stderr for a failed run.
pub fn describe(err: &ClError) -> String {
    match err {
        ClError::Api(code) | ClError::Build { code, .. } => {
            let name = opencl3::error_codes::ClError(*code);
            format!("OpenCL error: {name}({code})")
        }
        other => format!("STD exception: {other}"),
    }
}

/// Runs the pipeline, prints the sampled element and maps failures to
/// exit codes 1 (runtime), 2 (domain) and 3 (unknown).
pub fn launch(config: RunConfig) -> ExitCode {
    let outcome: Outcome = panic::catch_unwind(AssertUnwindSafe(|| execute(&config)));

    match &outcome {
        Ok(Ok((_idx, value))) => println!("{}", format_value(*value)),
        Ok(Err(err)) => eprintln!("{}", describe(err)),
        Err(_) => eprintln!("Unknown exception"),
    }
    let code = exit_code_of(&outcome);

    #[cfg(feature = "metrics")]
    crate::summary();

    ExitCode::from(code)
}
