use anyhow::Result;
use askademic_rs::cli::{self, Args, Command};
use askademic_rs::error::ResearchError;
use askademic_rs::pipeline::{ResearchContext, ResearchOrchestrator};
use askademic_rs::types::run::Run;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.to_config()?;
    init_tracing(config.verbose);

    let orchestrator = ResearchOrchestrator::new(ResearchContext::from_config(config)?);
    run_command(&orchestrator, args.command).await
}

/// `RUST_LOG` 优先，其次由 verbose 决定默认级别
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_command(orchestrator: &ResearchOrchestrator, command: Command) -> Result<()> {
    match command {
        Command::Research {
            query,
            depth,
            format,
            session,
            sources,
        } => {
            let request = cli::build_request(&query, &depth, format.as_deref(), &sources)?;
            let run = orchestrator.execute(&session, request).await?;
            print_outcome(&run);
        }
        Command::Refine { run_id, feedback } => {
            if feedback.trim().is_empty() {
                anyhow::bail!("Feedback must not be empty");
            }
            let run = orchestrator.refine(&run_id, feedback.trim()).await?;
            print_outcome(&run);
        }
        Command::Show { run_id } => {
            let run = orchestrator.get(&run_id).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        Command::Status { run_id } => {
            let run = orchestrator.get(&run_id).await?;
            let status = json!({
                "id": &run.id,
                "status": run.status,
                "updated_at": run.updated_at,
                "error": run.failure().map(|f| f.error.clone()),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Logs { run_id } => {
            for entry in orchestrator.logs(&run_id).await? {
                println!(
                    "{} [{:?}] {}",
                    entry.at.to_rfc3339(),
                    entry.level,
                    entry.message
                );
            }
        }
        Command::Sources { run_id } => {
            let run = orchestrator.get(&run_id).await?;
            let output = run
                .research_output()
                .ok_or_else(|| ResearchError::RunNotCompleted(run_id.clone()))?;
            println!("{}", serde_json::to_string_pretty(&output.sources)?);
        }
        Command::Latest { session_id } => match orchestrator.latest(&session_id).await? {
            Some(run) => println!("{}", serde_json::to_string_pretty(&run)?),
            None => println!("No runs found for session {}", session_id),
        },
    }
    Ok(())
}

fn print_outcome(run: &Run) {
    println!("run id: {}", run.id);
    println!("status: {}", run.status);
    if let Some(output) = run.research_output() {
        println!(
            "sources: {}, confidence: {:.1}%, estimated tokens: {}",
            output.metadata.sources_collected,
            output.metadata.confidence_level * 100.0,
            output.metadata.total_tokens_used
        );
        println!();
        println!("{}", output.report);
    } else if let Some(failure) = run.failure() {
        println!("error: {}", failure.error);
    }
}
