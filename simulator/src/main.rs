use clap::Parser;
use generator::scene::build_scene;
use log::info;
use report::model::AnalysisReport;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic MIRI frame workflow driver")]
struct Args {
    /// Run the workflow once and print a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 256)]
    width: i64,
    #[arg(long, default_value_t = 256)]
    height: i64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Write the JSON report here
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.width, args.height, args.seed)?
    };

    let scene = build_scene(&workflow_config.scene)?;
    info!(
        "scene {:?} with star at ({}, {})",
        scene.window, scene.star.x, scene.star.y
    );

    let runner = Runner::new(workflow_config);
    let result = runner.execute(&scene)?;
    let report = AnalysisReport::from_result(&result);

    if args.offline || args.report.is_none() {
        println!("Offline run -> {}", report.summary());
    }
    if let Some(path) = args.report {
        report.write(&path)?;
        info!("report written to {}", path.display());
    }

    Ok(())
}
