use std::{io, process};

use striprender::{
    application::{
        AppError, DispatchOptions, ErrorReport, JobSpec, PlanView, PoolCoordinator,
    },
    config,
    infra::{
        error::InfraError,
        telemetry,
        tools::{ImageMagickStitcher, InkscapeProbe, InkscapeRasterizer},
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(error) = run() {
        let report = ErrorReport::from(&error);
        report_application_error(&report);
        process::exit(report.exit_code);
    }
}

fn report_application_error(report: &ErrorReport) {
    let log = || {
        error!(
            stage = report.stage.as_str(),
            exit_code = report.exit_code,
            error = %report.messages.join(": "),
            "striprender failed"
        );
    };

    if dispatcher::has_been_set() {
        log();
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, log);
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| InfraError::configuration(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Render(args) => run_render(&settings, args),
        config::Command::Plan(args) => run_plan(&settings, args),
    }
}

fn run_render(settings: &config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let probe = InkscapeProbe::new(&settings.tools.probe);
    let job = JobSpec::from_settings(settings).resolve(&args.input, &probe)?;

    let rasterizer = InkscapeRasterizer::new(
        &settings.tools.rasterizer,
        &args.input,
        &settings.tools.tile_format,
    );
    let stitcher = ImageMagickStitcher::new(&settings.tools.stitcher);
    let options = DispatchOptions::from_settings(settings);

    let report = PoolCoordinator::new(&job, &options, &rasterizer, &stitcher).run(&args.output)?;

    info!(
        target = "striprender::render",
        output = %report.output.display(),
        units = report.units.len(),
        claims = ?report.claims_per_worker,
        kept_artifacts = ?report.kept_artifacts,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Render finished"
    );
    Ok(())
}

fn run_plan(settings: &config::Settings, args: config::PlanArgs) -> Result<(), AppError> {
    let probe = InkscapeProbe::new(&settings.tools.probe);
    let job = JobSpec::from_settings(settings).resolve(&args.input, &probe)?;
    let view = PlanView::from_job(&job);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        view.write_json(&mut out).map_err(InfraError::from)?;
    } else {
        view.write_table(&mut out).map_err(InfraError::from)?;
    }
    Ok(())
}
