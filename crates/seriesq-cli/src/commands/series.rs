use std::io;
use std::process::ExitCode;

use log::debug;
use seriesq_core::{MemoryStore, Outcome, PROGNAME, Plan, ReportOptions, SeriesError, StoreSettings};

/// Validate, open the store and run one invocation on a current-thread
/// runtime. Option errors are reported before the store is touched.
pub fn run(settings: &StoreSettings, options: &ReportOptions, args: &[String]) -> ExitCode {
    let plan = match options.validate(!args.is_empty()) {
        Ok(plan) => plan,
        Err(SeriesError::Usage(messages)) => {
            let _ = super::write_usage_errors(&mut io::stderr().lock(), &messages);
            return ExitCode::FAILURE;
        }
        Err(e) => return fail(e),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return fail(e),
    };

    let result = runtime.block_on(serve(settings, plan, args));

    match result {
        Ok(outcome) => exit_code(outcome),
        Err(e) => fail(e),
    }
}

async fn serve(settings: &StoreSettings, plan: Plan, args: &[String]) -> seriesq_core::Result<Outcome> {
    debug!(
        "store {} served from {}",
        settings.hostspec,
        settings.document.display()
    );
    let mut store = MemoryStore::open(&settings.document).await?;
    seriesq_core::execute(
        &mut store,
        plan,
        args,
        io::stdout().lock(),
        io::stderr().lock(),
    )
    .await
}

fn exit_code(outcome: Outcome) -> ExitCode {
    ExitCode::from(u8::try_from(outcome.exit_code()).unwrap_or(1))
}

fn fail(e: impl std::fmt::Display) -> ExitCode {
    eprintln!("{PROGNAME}: {e}");
    ExitCode::FAILURE
}
