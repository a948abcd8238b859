use tracing::info;

use crate::args::{LaunchArgs, OutputFormat};
use crate::args::parsers::split_sql_list;
use crate::error::AppResult;
use crate::run::{LaunchRequest, split_jvm_params};
use crate::shutdown::ShutdownSender;
use crate::tail::TailFrom;

use super::AppContext;
use super::follow::{FollowMode, follow_run};
use super::report::print_final_report;

pub(crate) async fn run_launch(
    ctx: &AppContext,
    args: &LaunchArgs,
    shutdown_tx: &ShutdownSender,
) -> AppResult<()> {
    let request = build_request(ctx, args)?;
    let mut jvm = ctx.settings.jvm.clone();
    if let Some(params) = args.jvm_params.as_deref() {
        jvm.jvm_params = split_jvm_params(params);
    }
    jvm.java9 = jvm.java9 || args.java9;

    let working_dir = std::env::current_dir()?;
    let handle = ctx.store.launch(&jvm, &request, &working_dir)?;
    let name = handle.name().to_owned();
    let paths = handle.paths().clone();

    if args.detach {
        match args.report.format {
            OutputFormat::Json => {
                let started = serde_json::json!({
                    "run": name,
                    "pid": handle.pid(),
                    "log": paths.log,
                    "results": paths.results,
                });
                println!("{}", serde_json::to_string_pretty(&started)?);
            }
            OutputFormat::Text => {
                println!("Started run '{}' (pid {})", name, handle.pid());
                println!("Log: {}", paths.log.display());
            }
        }
        return Ok(());
    }

    follow_run(
        handle,
        ctx.settings.poll_interval,
        TailFrom::Start,
        args.report.format,
        FollowMode::Owner,
        shutdown_tx,
    )
    .await?;
    print_final_report(&name, &paths, args.report).await;
    Ok(())
}

fn build_request(ctx: &AppContext, args: &LaunchArgs) -> AppResult<LaunchRequest> {
    let defaults = ctx.settings.defaults;
    let mut request = LaunchRequest {
        name: args.name.clone(),
        config: args.conf.clone(),
        sql_files: split_sql_list(&args.sql),
        repeat: args.repeat.map_or(defaults.repeat, u32::from),
        concurrency: args.threads.map_or(defaults.concurrency, u32::from),
        failure_rate: args.failure_rate.map_or(defaults.failure_rate, |rate| rate.get()),
        prefix: args.prefix.clone(),
        driver_jar: None,
        extra_jars: args.jars.clone(),
    };
    request.validate()?;
    if !args.no_default_driver {
        let driver = ctx.settings.driver.clone().with_env().resolve()?;
        info!("Using driver {}", driver.display());
        request.driver_jar = Some(driver);
    }
    Ok(request)
}
