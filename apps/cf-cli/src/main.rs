use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cf_app::{
    AppError, AppResult, BackendConfig, ClientConfig, PollExit, TaskBackend, TaskController,
    TaskEvent, TaskRecord, TaskState, TickOutcome, request_service, result_service,
};
use cf_core::{FieldKind, StrategyId, format_number};
use cf_project::{export_configuration, validate_request};
use cf_results::ResultDocument;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "condenserflow")]
#[command(about = "CondenserFlow CLI - condenser calculation task client", long_about = None)]
struct Cli {
    /// Client configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Use the local task simulation instead of the HTTP service
    #[arg(long, global = true)]
    simulate: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List calculation strategies and their parameter fields
    Strategies,
    /// Build a request document from form values
    Build {
        /// Form values as a flat YAML map
        form_path: PathBuf,
        /// Calculation strategy (berman, metro_vickers, vku)
        #[arg(short, long)]
        strategy: StrategyId,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a request document before submission
    Validate {
        /// Path to condenser_input.json
        request_path: PathBuf,
    },
    /// Import a request document and show the form it populates
    Import {
        /// Path to condenser_input.json
        request_path: PathBuf,
        /// Write the form values to this YAML file
        #[arg(long)]
        form_out: Option<PathBuf>,
    },
    /// Submit a request and follow the task
    Submit {
        /// Path to condenser_input.json
        request_path: PathBuf,
        /// Print the task id and return without polling
        #[arg(long)]
        no_wait: bool,
        /// Submit even when a stored result matches the request
        #[arg(long)]
        no_cache: bool,
    },
    /// Show the current state of a task
    Status { task_id: String },
    /// Ask the service to cancel a task
    Cancel { task_id: String },
    /// Show the result of a finished task
    Result {
        task_id: String,
        /// Decode as this strategy instead of the one named in the document
        #[arg(short, long)]
        strategy: Option<StrategyId>,
        /// Save the result document to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List stored results
    Results,
    /// List projects in the source repository
    Projects,
    /// Show the commit history of a file
    History { project: String, file: String },
    /// Print a file at a given commit
    Content {
        project: String,
        commit: String,
        file: String,
    },
}

#[tokio::main]
async fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if cli.simulate {
        config.backend = BackendConfig::simulated();
    }

    match cli.command {
        Commands::Strategies => cmd_strategies(),
        Commands::Build {
            form_path,
            strategy,
            output,
        } => cmd_build(&form_path, strategy, output.as_deref()),
        Commands::Validate { request_path } => cmd_validate(&request_path),
        Commands::Import {
            request_path,
            form_out,
        } => cmd_import(&request_path, form_out.as_deref()),
        Commands::Submit {
            request_path,
            no_wait,
            no_cache,
        } => cmd_submit(&config, &request_path, !no_wait, !no_cache).await,
        Commands::Status { task_id } => cmd_status(&config, &task_id).await,
        Commands::Cancel { task_id } => cmd_cancel(&config, &task_id).await,
        Commands::Result {
            task_id,
            strategy,
            output,
        } => cmd_result(&config, &task_id, strategy, output.as_deref()).await,
        Commands::Results => cmd_results(&config),
        Commands::Projects => cmd_projects(&config).await,
        Commands::History { project, file } => cmd_history(&config, &project, &file).await,
        Commands::Content {
            project,
            commit,
            file,
        } => cmd_content(&config, &project, &commit, &file).await,
    }
}

fn cmd_strategies() -> AppResult<()> {
    for strategy in request_service::list_strategies() {
        println!("{} ({}) -> results.{}", strategy.id, strategy.label, strategy.result_key);
        for field in strategy.fields {
            let kind = match field.kind {
                FieldKind::Scalar => "number",
                FieldKind::NumberList => "list",
                FieldKind::Constant => "constant",
            };
            let mut line = format!("  {:<34} {kind}", field.name);
            if let Some(default) = field.default {
                line.push_str(&format!("  default={}", format_number(default)));
            }
            if !field.required {
                line.push_str("  optional");
            }
            println!("{line}");
        }
    }
    Ok(())
}

fn cmd_build(form_path: &Path, strategy: StrategyId, output: Option<&Path>) -> AppResult<()> {
    let request = request_service::build_request_from_form(form_path, strategy)?;
    match output {
        Some(path) => {
            request_service::write_request(path, &request)?;
            println!("✓ Request written to {}", path.display());
        }
        None => println!("{}", export_configuration(&request)?),
    }
    Ok(())
}

fn cmd_validate(request_path: &Path) -> AppResult<()> {
    println!("Validating request: {}", request_path.display());
    let request = request_service::read_request(request_path)?;
    validate_request(&request)?;
    println!(
        "✓ Request is valid ({}, {} parameters)",
        request.calculation_strategy,
        request.parameters.len()
    );
    Ok(())
}

fn cmd_import(request_path: &Path, form_out: Option<&Path>) -> AppResult<()> {
    let imported = request_service::read_configuration(request_path)?;
    println!("Strategy: {}", imported.strategy);
    for (key, value) in imported.form.iter() {
        println!("  {key} = {value}");
    }
    if let Some(path) = form_out {
        cf_project::save_form_yaml(path, &imported.form)?;
        println!("✓ Form values written to {}", path.display());
    }
    Ok(())
}

async fn cmd_submit(
    config: &ClientConfig,
    request_path: &Path,
    wait: bool,
    use_cache: bool,
) -> AppResult<()> {
    let request = request_service::read_request(request_path)?;
    validate_request(&request)?;
    let store = result_service::open_store(config)?;

    if use_cache {
        if let Some(cached) = result_service::cached_result(&store, &request)? {
            println!("✓ Loaded from cache: {}", cached.manifest.task_id);
            print_result(request.calculation_strategy, &cached.document)?;
            return Ok(());
        }
    }

    let mut controller = TaskController::new(config.build_backend()?);
    controller.subscribe(render_task_event);
    let task_id = controller.submit(&request).await?;
    clear_progress_line();
    println!("Task submitted: {task_id}");
    if !wait {
        return Ok(());
    }

    let mut handle = controller.start_polling(config.poll_options());
    let mut interrupts = 0;
    let outcome = loop {
        tokio::select! {
            outcome = handle.join() => break outcome?,
            signal = tokio::signal::ctrl_c() => {
                signal?;
                interrupts += 1;
                if interrupts == 1 {
                    clear_progress_line();
                    println!("Cancelling {task_id} (press Ctrl-C again to stop waiting)");
                    match handle.request_cancel().await {
                        Ok(true) => {}
                        Ok(false) => println!("Cancel was not acknowledged"),
                        Err(err) => eprintln!("✗ Cancel failed: {err}; still waiting"),
                    }
                } else {
                    handle.stop();
                }
            }
        }
    };
    clear_progress_line();

    let controller = outcome.controller;
    match outcome.exit? {
        PollExit::Terminal(record) => match record.state {
            TaskState::Success => {
                let (document, saved) = result_service::download_result(&controller, &store).await?;
                println!("✓ Calculation completed: {}", record.task_id);
                if let Some(path) = saved {
                    println!("  Saved to {}", path.display());
                }
                print_result(request.calculation_strategy, &document)?;
            }
            TaskState::Cancelled => println!("Task cancelled: {}", record.task_id),
            state => println!("✗ Task {} ended with {state}", record.task_id),
        },
        PollExit::Stopped => println!("Stopped waiting; task {task_id} may still be running"),
        PollExit::Idle => {}
    }
    Ok(())
}

async fn cmd_status(config: &ClientConfig, task_id: &str) -> AppResult<()> {
    let mut controller = TaskController::new(config.build_backend()?);
    controller.attach(task_id);
    match controller.poll_once().await? {
        TickOutcome::Continue(record) | TickOutcome::Terminal(record) => {
            render_record(&record);
            println!();
        }
        TickOutcome::PollFailed(reason) => {
            println!("✗ Status of {task_id} unavailable: {reason}");
        }
        TickOutcome::Idle => {}
    }
    Ok(())
}

async fn cmd_cancel(config: &ClientConfig, task_id: &str) -> AppResult<()> {
    let mut controller = TaskController::new(config.build_backend()?);
    controller.attach(task_id);
    if controller.cancel().await? {
        println!("✓ Cancel acknowledged for {task_id}");
    } else {
        println!("Cancel not acknowledged for {task_id}");
    }
    Ok(())
}

async fn cmd_result(
    config: &ClientConfig,
    task_id: &str,
    strategy: Option<StrategyId>,
    output: Option<&Path>,
) -> AppResult<()> {
    let backend = config.build_backend()?;
    let store = result_service::open_store(config)?;
    let document = result_service::lookup_result(backend.as_ref(), &store, task_id).await?;

    if let Some(path) = output {
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| AppError::Results(format!("Failed to serialize result: {e}")))?;
        std::fs::write(path, text).map_err(|source| AppError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
        println!("✓ Result written to {}", path.display());
    }
    print_result(strategy.unwrap_or(document.calculation_strategy), &document)
}

fn cmd_results(config: &ClientConfig) -> AppResult<()> {
    let store = result_service::open_store(config)?;
    let manifests = store.list_results()?;

    if manifests.is_empty() {
        println!("No stored results in {}", store.root_dir().display());
    } else {
        println!("Stored results:");
        for manifest in manifests {
            println!(
                "  {} {} ({})",
                manifest.task_id, manifest.strategy, manifest.timestamp
            );
        }
    }
    Ok(())
}

async fn cmd_projects(config: &ClientConfig) -> AppResult<()> {
    let projects = config.build_backend()?.list_projects().await?;
    if projects.is_empty() {
        println!("No projects found");
    }
    for project in projects {
        match &project.description {
            Some(description) => println!("  {} - {} ({description})", project.path, project.name),
            None => println!("  {} - {}", project.path, project.name),
        }
    }
    Ok(())
}

async fn cmd_history(config: &ClientConfig, project: &str, file: &str) -> AppResult<()> {
    let commits = config.build_backend()?.file_history(project, file).await?;
    if commits.is_empty() {
        println!("No history for {file} in {project}");
    }
    for commit in commits {
        println!(
            "  {}  {}  {}",
            commit.commit_hash,
            commit.committed_at.as_deref().unwrap_or("-"),
            commit.message
        );
    }
    Ok(())
}

async fn cmd_content(
    config: &ClientConfig,
    project: &str,
    commit: &str,
    file: &str,
) -> AppResult<()> {
    let backend: Arc<dyn TaskBackend> = config.build_backend()?;
    let content = backend.file_content(project, commit, file).await?;
    println!("{content}");
    Ok(())
}

fn print_result(strategy: StrategyId, document: &ResultDocument) -> AppResult<()> {
    let summary = result_service::summarize(strategy, document)?;
    println!("\nResults ({}):", summary.strategy);
    println!("  Target project: {}", summary.target_project);
    println!("  Input commit: {}", summary.input_commit_hash);
    for (name, value) in &summary.values {
        println!("  {name}: {value}");
    }
    Ok(())
}

fn render_task_event(event: &TaskEvent) {
    match event {
        TaskEvent::Updated(record) => render_record(record),
        TaskEvent::PollFailed { message, .. } => {
            clear_progress_line();
            eprintln!("poll failed: {message}");
        }
        TaskEvent::Abandoned { task_id } => {
            clear_progress_line();
            println!("Abandoned task {task_id}");
        }
        TaskEvent::Finished(record) => render_record(record),
        TaskEvent::Submitted { .. } | TaskEvent::CancelAcknowledged { .. } | TaskEvent::Reset => {}
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(80));
    let _ = io::stdout().flush();
}

fn render_record(record: &TaskRecord) {
    let width = 28usize;
    let filled = (usize::from(record.progress) * width / 100).min(width);
    print!(
        "\r[{}{}] {:>3}%  {}  {}",
        "#".repeat(filled),
        "-".repeat(width - filled),
        record.progress,
        record.state,
        record.task_id
    );
    let _ = io::stdout().flush();
}
