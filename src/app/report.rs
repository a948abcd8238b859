use serde::Serialize;
use tracing::{error, warn};

use crate::aggregate::Report;
use crate::args::{OutputFormat, ReportArgs, ReportOptions};
use crate::error::{AppError, AppResult, MetricsError};
use crate::metrics::load_run;
use crate::run::RunPaths;

use super::AppContext;
use super::render::report_lines;

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    run: &'a str,
    report: Option<&'a Report>,
    warning: Option<String>,
}

pub(crate) async fn run_report(ctx: &AppContext, args: &ReportArgs) -> AppResult<()> {
    let paths = ctx.store.open(&args.name)?;
    print_report(&args.name, &paths, args.report).await
}

/// Decode and print a run's results. An empty run only warns.
///
/// # Errors
///
/// Returns `MetricsError` when the results are missing or unreadable.
pub(crate) async fn print_report(
    name: &str,
    paths: &RunPaths,
    options: ReportOptions,
) -> AppResult<()> {
    match load_run(&paths.results).await {
        Ok(run) => {
            let report = Report::build(&run, options.duration_field);
            emit(name, Some(&report), None, options.format)
        }
        Err(err) if err.is_warning() => {
            warn!("Run '{}': {}", name, err);
            emit(name, None, Some(err.to_string()), options.format)
        }
        Err(err) => Err(AppError::metrics(err)),
    }
}

/// Report at the end of a followed run: analysis failures are logged, the
/// run itself already completed.
pub(crate) async fn print_final_report(name: &str, paths: &RunPaths, options: ReportOptions) {
    if let Err(err) = print_report(name, paths, options).await {
        match err {
            AppError::Metrics(MetricsError::ResultsMissing { .. }) => {
                warn!("Run '{}' produced no results: {}", name, err);
            }
            other => error!("Failed to analyse run '{}': {}", name, other),
        }
    }
}

fn emit(
    name: &str,
    report: Option<&Report>,
    warning: Option<String>,
    format: OutputFormat,
) -> AppResult<()> {
    match format {
        OutputFormat::Json => {
            let document = ReportDocument {
                run: name,
                report,
                warning,
            };
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        OutputFormat::Text => {
            if let Some(report) = report {
                for line in report_lines(name, report) {
                    println!("{}", line);
                }
            } else if let Some(warning) = warning {
                println!("Run: {}", name);
                println!("{}", warning);
            }
        }
    }
    Ok(())
}
