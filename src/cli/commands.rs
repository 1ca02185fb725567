//! Command dispatch: each subcommand builds what it needs from the container

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::{
    parse_script, run_script, ChartSession, ExportFormat, ExportMetadata, StepReport, StepStatus,
};
use crate::application::IoResultExt;
use crate::cli::args::{ChartArgs, Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{self, Settings};
use crate::infrastructure::ServiceContainer;
use crate::tree_traits::ChartOutline;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let command = match &cli.command {
        Some(command) => command,
        None => {
            return Err(CliError::Usage(
                "no command given, see `icschart --help`".to_string(),
            ))
        }
    };

    // completion and config template need no settings
    match command {
        Commands::Completion { shell } => return _completion(*shell),
        Commands::Config {
            command: ConfigCommands::Template,
        } => {
            output::info(&Settings::template());
            return Ok(());
        }
        _ => {}
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let container = ServiceContainer::new(settings, cli.yes);

    match command {
        Commands::Templates => _templates(&container),
        Commands::Show { chart } => _show(&container, chart),
        Commands::Run {
            script,
            template,
            show,
        } => _run(&container, script, template.as_deref(), *show),
        Commands::Export {
            chart,
            task,
            event,
            period,
            out,
            format,
        } => {
            let metadata = ExportMetadata {
                task_reference: task.clone(),
                event_name: event.clone(),
                operational_period: period.clone(),
            };
            _export(&container, chart, metadata, out.as_deref(), *format)
        }
        Commands::Config { command } => _config(&container, cli.config.as_deref(), command),
        Commands::Completion { .. } => Ok(()),
    }
}

#[instrument(skip(container))]
fn _templates(container: &ServiceContainer) -> CliResult<()> {
    let catalog = container.catalog()?;
    output::header(&format!("{} templates", catalog.len()));
    for name in catalog.names() {
        let marker = if name == container.settings.default_template {
            " (default)"
        } else {
            ""
        };
        let count = catalog.get(name).map(|tree| tree.count()).unwrap_or(0);
        output::detail(&format!("{name}{marker}: {count} positions"));
    }
    debug!("templates: {}", catalog.names().join(", "));
    Ok(())
}

/// Session on the requested template with the optional script applied.
fn build_session(
    container: &ServiceContainer,
    chart: &ChartArgs,
) -> CliResult<(ChartSession, Vec<StepReport>)> {
    let mut session = container.session(chart.template.as_deref())?;
    let reports = match &chart.script {
        Some(path) => apply_script(container, &mut session, path)?,
        None => Vec::new(),
    };
    Ok((session, reports))
}

fn apply_script(
    container: &ServiceContainer,
    session: &mut ChartSession,
    path: &Path,
) -> CliResult<Vec<StepReport>> {
    let source = container
        .fs
        .read_to_string(path)
        .with_path_context("read script", path)?;
    let lines = parse_script(&source)?;
    debug!("script {}: {} commands", path.display(), lines.len());
    Ok(run_script(session, &lines)?)
}

fn print_outline(session: &ChartSession) {
    let tree = session.snapshot();
    output::info(&tree.to_outline(session.collapse_state()));
}

#[instrument(skip(container))]
fn _show(container: &ServiceContainer, chart: &ChartArgs) -> CliResult<()> {
    let (session, reports) = build_session(container, chart)?;
    for report in reports
        .iter()
        .filter(|r| matches!(r.status, StepStatus::Rejected(_)))
    {
        output::warning(report);
    }
    print_outline(&session);
    Ok(())
}

#[instrument(skip(container))]
fn _run(
    container: &ServiceContainer,
    script: &Path,
    template: Option<&str>,
    show: bool,
) -> CliResult<()> {
    let mut session = container.session(template)?;
    let reports = apply_script(container, &mut session, script)?;

    output::header(&format!("{}", script.display()));
    for report in &reports {
        output::step(report);
    }
    let (applied, rejected) = reports.iter().fold((0, 0), |(a, r), report| match report.status {
        StepStatus::Applied(_) => (a + 1, r),
        StepStatus::Rejected(_) => (a, r + 1),
        _ => (a, r),
    });
    output::action(
        "Done",
        &format!(
            "{} applied, {} rejected, {} positions",
            applied,
            rejected,
            session.repository().len()
        ),
    );
    if show {
        print_outline(&session);
    }
    Ok(())
}

#[instrument(skip(container, metadata))]
fn _export(
    container: &ServiceContainer,
    chart: &ChartArgs,
    metadata: ExportMetadata,
    out: Option<&Path>,
    format: ExportFormat,
) -> CliResult<()> {
    let (mut session, reports) = build_session(container, chart)?;
    for report in reports
        .iter()
        .filter(|r| matches!(r.status, StepStatus::Rejected(_)))
    {
        output::warning(report);
    }

    let service = container.export_service();
    if !service.rasterizer().has_font() {
        output::warning("no label font configured, exporting boxes and connectors only");
    }
    let artifact = session.export_with(&service, metadata, format)?;

    let dir: PathBuf = match out {
        Some(dir) => config::expand_path(dir),
        None => container.settings.export.output_dir.clone(),
    };
    let target = service.save(&artifact, &dir, container.fs.as_ref())?;
    output::success(&format!(
        "{} ({}x{} px)",
        target.display(),
        artifact.raster_size.0,
        artifact.raster_size.1
    ));
    Ok(())
}

#[instrument(skip(container))]
fn _config(
    container: &ServiceContainer,
    explicit: Option<&Path>,
    command: &ConfigCommands,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match config::global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not found)" };
                    output::action("global", &format!("{}{}", path.display(), state));
                }
                None => output::action("global", &"unavailable"),
            }
            if let Some(path) = explicit {
                output::action("explicit", &path.display());
            }
            if let Some(dir) = &container.settings.templates_dir {
                output::action("templates", &dir.display());
            }
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

fn _completion(shell: clap_complete::Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
