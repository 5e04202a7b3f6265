//! Request dispatch.
//!
//! Turns a validated [`Plan`] plus the positional arguments into a sequence
//! of store requests, each awaited to completion before the next is issued.
//! Every request shares one [`ReportEngine`] so output stays incremental.

use std::io::Write;

use log::debug;

use crate::engine::{Outcome, ReportEngine};
use crate::error::{Result, SeriesError};
use crate::options::{Mode, Plan, ReportOptions};
use crate::store::{Request, SeriesStore};

const SERIES_LIST: &str = "no series identifiers in string";
const SOURCE_LIST: &str = "cannot find source identifiers in";

/// Split a comma-separated identifier list.
///
/// An empty argument yields no identifiers. An empty element inside a
/// non-empty list is rejected with a description of where it was found.
pub fn split_identifiers(list: &str) -> std::result::Result<Vec<String>, String> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for (i, id) in list.split(',').enumerate() {
        let id = id.trim();
        if id.is_empty() {
            return Err(format!("empty identifier at position {}", i + 1));
        }
        ids.push(id.to_string());
    }
    Ok(ids)
}

/// Identifiers from every argument. A malformed argument is reported and
/// skipped; the rest still run.
fn collect_identifiers<O: Write, E: Write>(
    engine: &mut ReportEngine<O, E>,
    context: &'static str,
    args: &[String],
) -> Vec<String> {
    let mut ids = Vec::new();
    for arg in args {
        match split_identifiers(arg) {
            Ok(mut found) => ids.append(&mut found),
            Err(reason) => engine.fail(SeriesError::Identifiers {
                context,
                list: arg.clone(),
                reason,
            }),
        }
    }
    ids
}

/// Validate `options`, then run the invocation against `store`.
///
/// Usage errors are returned before any request is issued.
pub async fn run<S, O, E>(
    store: &mut S,
    options: &ReportOptions,
    args: &[String],
    out: O,
    err: E,
) -> Result<Outcome>
where
    S: SeriesStore,
    O: Write,
    E: Write,
{
    let plan = options.validate(!args.is_empty())?;
    execute(store, plan, args, out, err).await
}

/// Run an already validated plan.
pub async fn execute<S, O, E>(
    store: &mut S,
    plan: Plan,
    args: &[String],
    out: O,
    err: E,
) -> Result<Outcome>
where
    S: SeriesStore,
    O: Write,
    E: Write,
{
    let mut engine = ReportEngine::new(plan.flags, out, err);
    let metadata_only = plan.flags.fast;
    debug!("dispatching {:?} with {} argument(s)", plan.mode, args.len());

    match plan.mode {
        Mode::Load => {
            let text = args.join(" ");
            store
                .request(Request::Load { text: &text, metadata_only }, &mut engine)
                .await;
        }
        Mode::Query => {
            let text = args.join(" ");
            store
                .request(Request::Query { text: &text, metadata_only }, &mut engine)
                .await;
        }
        Mode::Sources => {
            let sources = collect_identifiers(&mut engine, SOURCE_LIST, args);
            if !(sources.is_empty() && engine.failed()) {
                store.request(Request::Sources(&sources), &mut engine).await;
            }
        }
        Mode::Report => {
            let series = collect_identifiers(&mut engine, SERIES_LIST, args);
            for id in &series {
                report_one(store, &mut engine, Some(id.as_str())).await;
            }
            // Without identifiers, report every name; unless all arguments
            // were rejected.
            if series.is_empty() && !engine.failed() {
                report_one(store, &mut engine, None).await;
            }
        }
    }

    engine.finish()
}

/// Metadata report for one series, or the global listing for `None`.
async fn report_one<S, O, E>(store: &mut S, engine: &mut ReportEngine<O, E>, series: Option<&str>)
where
    S: SeriesStore,
    O: Write,
    E: Write,
{
    let flags = *engine.flags();
    let ids: Vec<String> = series.map(|s| vec![s.to_string()]).unwrap_or_default();

    engine.reset();
    if let Some(id) = series {
        if engine.advance(id) {
            engine.header(id);
        }
    }

    // Context lookup for a series needs its source, carried by the descriptor.
    if flags.desc || flags.need_descs || (flags.contexts && series.is_some()) {
        store.request(Request::Descs(&ids), engine).await;
        engine.end_topic();
    }
    if flags.contexts {
        if series.is_none() {
            store.request(Request::Sources(&[]), engine).await;
        } else if !engine.source().is_empty() {
            let sources = [engine.source().to_string()];
            store.request(Request::Sources(&sources), engine).await;
        } else {
            debug!("no source known for {}", series.unwrap_or_default());
        }
        engine.end_topic();
    }
    if flags.metrics {
        store.request(Request::Metrics(&ids), engine).await;
        engine.end_topic();
    }
    if flags.labels {
        store.request(Request::Labels(&ids), engine).await;
        engine.report_metric_labels();
        engine.end_topic();
    }
    if flags.instances || flags.need_insts {
        store.request(Request::Instances(&ids), engine).await;
        engine.report_instances();
        engine.end_topic();
    }
    if flags.labels && series.is_some() {
        let instances = engine.instance_series();
        // An empty list would ask for every label name.
        if !instances.is_empty() {
            engine.set_instance_scoped(true);
            store.request(Request::Labels(&instances), engine).await;
            engine.report_instance_labels();
            engine.set_instance_scoped(false);
            engine.end_topic();
        }
    }
    engine.end_line();
}
