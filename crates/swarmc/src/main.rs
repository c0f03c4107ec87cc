//! The `swarmc` driver.
//!
//! Compiles a program (canonical AST JSON; the language front-end is a
//! separate tool) and executes it locally or through the distributed queue,
//! or runs this process as a queue worker.

mod pipeline;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use pipeline::Pipeline;
use swarm_base::{set_deterministic_uuids, Config, SwarmError};
use swarm_runtime::queue::ExecutionQueue;
use swarm_runtime::THREAD_EXIT;

#[derive(Parser, Debug)]
#[command(
    name = "swarmc",
    about = "Swarm compiler and distributed runtime",
    version
)]
struct Cli {
    /// Input program, in the canonical AST JSON encoding.
    input: Option<PathBuf>,

    /// Evaluate everything in this process; never touch the queue.
    #[arg(long)]
    locally: bool,

    /// Run extra in-process worker threads alongside the driver.
    #[arg(long = "locally-multithreaded")]
    locally_multithreaded: bool,

    /// Do not install the prologue bindings.
    #[arg(long = "without-prologue")]
    without_prologue: bool,

    /// Run as a queue worker; the file holds this worker's filter map.
    #[arg(long = "work-queue", value_name = "FILTERS_JSON")]
    work_queue: Option<PathBuf>,

    /// Delete every pending job id from the shared queue, then exit.
    #[arg(long = "clear-queue")]
    clear_queue: bool,

    /// Write the final result here instead of stdout.
    #[arg(long = "output-to", value_name = "FILE")]
    output_to: Option<PathBuf>,

    /// Sequential deterministic identifiers, for reproducible output.
    #[arg(long = "dbg-use-d-guid")]
    dbg_use_d_guid: bool,

    #[arg(long = "no-remove-self-assigns")]
    no_remove_self_assigns: bool,

    #[arg(long = "no-constant-propagation")]
    no_constant_propagation: bool,

    #[arg(long)]
    verbose: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[arg(long = "redis-host")]
    redis_host: Option<String>,

    #[arg(long = "redis-port")]
    redis_port: Option<u16>,
}

fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match &cli.log_file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .expect("cannot open log file");
            builder.with_writer(Arc::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    config.verbose = cli.verbose;
    config.force_local = cli.locally;
    config.with_prologue = !cli.without_prologue;
    config.remove_self_assigns = !cli.no_remove_self_assigns;
    config.constant_propagation = !cli.no_constant_propagation;
    if let Some(host) = &cli.redis_host {
        config.redis_host = host.clone();
    }
    if let Some(port) = cli.redis_port {
        config.redis_port = port;
    }
    config
}

fn run(cli: Cli) -> Result<(), SwarmError> {
    let mut config = build_config(&cli);

    if cli.clear_queue {
        let mut queue = ExecutionQueue::connect(&config)?;
        queue.clear()?;
        info!("cleared the job queue");
        return Ok(());
    }

    if let Some(filters_path) = &cli.work_queue {
        let filters_json = fs::read_to_string(filters_path).map_err(|e| {
            SwarmError::serialization(format!("cannot read {}: {e}", filters_path.display()))
        })?;
        let filters: BTreeMap<String, String> = serde_json::from_str(&filters_json)
            .map_err(|e| SwarmError::serialization(format!("bad filter map: {e}")))?;
        config.queue_filters = filters;
        info!(filters = ?config.queue_filters, "entering worker loop");
        return work(&config, cli.locally_multithreaded);
    }

    let Some(input) = &cli.input else {
        return Err(SwarmError::serialization(
            "no input file; pass a program or --work-queue/--clear-queue",
        ));
    };
    let source = fs::read_to_string(input).map_err(|e| {
        SwarmError::serialization(format!("cannot read {}: {e}", input.display()))
    })?;

    let pipeline = Pipeline::new(config.clone());
    let (ast, root) = match pipeline.compile(&source) {
        Ok(compiled) => compiled,
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                error!("{diagnostic}");
            }
            return Err(diagnostics.into_iter().next().expect("at least one diagnostic"));
        }
    };

    let result = if config.force_local {
        if cli.locally_multithreaded {
            debug!(workers = config.max_threads, "local multithreaded execution");
        }
        pipeline.run_local(&ast, root)?
    } else {
        spawn_local_workers(&config, cli.locally_multithreaded);
        pipeline.run_remote(&ast, root)?
    };

    match &cli.output_to {
        Some(path) => fs::write(path, format!("{result}\n")).map_err(|e| {
            SwarmError::serialization(format!("cannot write {}: {e}", path.display()))
        })?,
        None => println!("{result}"),
    }
    Ok(())
}

/// Extra in-process workers that drain the queue alongside the driver.
fn spawn_local_workers(config: &Config, multithreaded: bool) {
    if !multithreaded {
        return;
    }
    for worker in 0..config.max_threads {
        let config = config.clone();
        std::thread::spawn(move || {
            debug!(worker, "worker thread starting");
            match ExecutionQueue::connect(&config) {
                Ok(mut queue) => {
                    if let Err(e) = queue.work_forever() {
                        error!(worker, error = %e, "worker thread failed");
                    }
                }
                Err(e) => error!(worker, error = %e, "worker thread could not connect"),
            }
        });
    }
}

/// The daemon loop of `--work-queue`.
fn work(config: &Config, multithreaded: bool) -> Result<(), SwarmError> {
    let mut handles = Vec::new();
    if multithreaded {
        for worker in 1..config.max_threads {
            let config = config.clone();
            handles.push(std::thread::spawn(move || {
                match ExecutionQueue::connect(&config) {
                    Ok(mut queue) => {
                        if let Err(e) = queue.work_forever() {
                            error!(worker, error = %e, "worker thread failed");
                        }
                    }
                    Err(e) => error!(worker, error = %e, "worker thread could not connect"),
                }
            }));
        }
    }

    let mut queue = ExecutionQueue::connect(config)?;
    let outcome = queue.work_forever();
    for handle in handles {
        let _ = handle.join();
    }
    outcome
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    if cli.dbg_use_d_guid {
        set_deterministic_uuids(true);
    }

    ctrlc::set_handler(|| {
        THREAD_EXIT.store(true, Ordering::SeqCst);
    })
    .expect("cannot install the signal handler");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
