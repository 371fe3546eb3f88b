//! stacker CLI - make segmented meshes stack better
//!
//! Reads a JSON scene (one mesh per part), fits a box to every part and
//! searches for box edits that let copies of the object nest.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stacker_primitive::{AxisAlignedFitter, ControllerRecord, PcaObbFitter, SceneRecord};
use stacker_search::{Controller, HeightfieldEvaluator, PartId, StackerConfig, StackerDriver};

#[derive(Parser)]
#[command(name = "stacker")]
#[command(about = "Improve how well copies of a segmented mesh stack", long_about = None)]
struct Cli {
    /// Settings file (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Fit axis-aligned boxes instead of principal-axis boxes
    #[arg(long, global = true)]
    axis_aligned: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a more stackable shape and write it out
    Improve {
        /// Input scene (.json)
        input: PathBuf,
        /// Output scene (.json)
        output: PathBuf,
        /// Start from saved boxes instead of fitting
        #[arg(short, long)]
        record: Option<PathBuf>,
        /// Save the final boxes here
        #[arg(long)]
        save_record: Option<PathBuf>,
        /// Save the run summary (.json) here
        #[arg(long)]
        report: Option<PathBuf>,
        /// Stop after this many expansions
        #[arg(short, long)]
        level: Option<usize>,
    },
    /// Print the stackability of a scene
    Offset {
        /// Input scene (.json)
        input: PathBuf,
    },
    /// Print how far saved boxes distort a scene's fitted boxes
    Distortion {
        /// Input scene (.json)
        input: PathBuf,
        /// Saved boxes (.json)
        record: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Improve {
            input,
            output,
            record,
            save_record,
            report,
            level,
        } => {
            let mut controller = match record {
                Some(path) => {
                    let json = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    Controller::unserialize(load_scene(&input)?, &json)?
                }
                None => fit(&input, cli.axis_aligned)?,
            };
            improve(&mut controller, &config, level, report.as_deref())?;

            fs::write(&output, SceneRecord::from(controller.mesh()).to_json()?)?;
            println!("Wrote improved scene to {}", output.display());
            if let Some(path) = save_record {
                fs::write(&path, controller.serialize()?)?;
                println!("Saved boxes to {}", path.display());
            }
        }
        Commands::Offset { input } => {
            let controller = fit(&input, cli.axis_aligned)?;
            let evaluator =
                HeightfieldEvaluator::for_mesh(config.heightfield.clone(), controller.mesh())?;
            let driver = StackerDriver::new(&evaluator, &evaluator, config.improver.clone())?;
            println!("Stackability: {:.4}", driver.offset(&controller));
        }
        Commands::Distortion { input, record } => {
            let mut controller = fit(&input, cli.axis_aligned)?;
            let json = fs::read_to_string(&record)
                .with_context(|| format!("reading {}", record.display()))?;
            let boxes = ControllerRecord::from_json(&json)?.boxes();
            if boxes.len() != controller.part_count() {
                bail!(
                    "record has {} boxes but the scene has {} parts",
                    boxes.len(),
                    controller.part_count()
                );
            }
            let boxes: BTreeMap<_, _> = boxes
                .into_iter()
                .enumerate()
                .map(|(i, b)| (PartId(i), b))
                .collect();
            controller.apply_boxes(&boxes)?;

            let d = controller.distortion();
            println!("Distortion of {}", input.display());
            println!("  Volume:       {:.4}", d.volume);
            println!("  Bounding box: {:.4}", d.bounding_box);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<StackerConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(StackerConfig::from_toml(&text)?)
        }
        None => Ok(StackerConfig::default()),
    }
}

fn load_scene(path: &Path) -> Result<stacker_primitive::SegMesh> {
    let json =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let scene = SceneRecord::from_json(&json)?;
    if scene.parts.is_empty() {
        bail!("{} has no parts", path.display());
    }
    scene
        .to_seg_mesh()
        .with_context(|| format!("building mesh from {}", path.display()))
}

fn fit(path: &Path, axis_aligned: bool) -> Result<Controller> {
    let mesh = load_scene(path)?;
    let controller = if axis_aligned {
        Controller::fit(mesh, &AxisAlignedFitter)?
    } else {
        Controller::fit(mesh, &PcaObbFitter)?
    };
    info!(parts = controller.part_count(), "Loaded scene");
    Ok(controller)
}

fn improve(
    controller: &mut Controller,
    config: &StackerConfig,
    level: Option<usize>,
    report_path: Option<&Path>,
) -> Result<()> {
    let evaluator = HeightfieldEvaluator::for_mesh(config.heightfield.clone(), controller.mesh())?;
    let driver = StackerDriver::new(&evaluator, &evaluator, config.improver.clone())?;
    let report = driver.run(controller, level)?;

    println!(
        "Stackability: {:.4} -> {:.4}",
        report.original_stackability, report.final_stackability
    );
    println!(
        "  {} solution(s) after {} expansion(s), stopped: {:?}",
        report.outcome.solutions.len(),
        report.outcome.expansions,
        report.outcome.termination
    );
    println!(
        "  Distortion: volume {:.4}, bounding box {:.4}",
        report.distortion.volume, report.distortion.bounding_box
    );

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report.summary())?)?;
    }
    Ok(())
}
