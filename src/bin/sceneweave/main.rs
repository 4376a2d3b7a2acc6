//! sceneweave CLI - export scene documents to glTF sub-assets.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use glam::Vec3;

use sceneweave::config::ExportSettings;
use sceneweave::core::SceneGraph;
use sceneweave::emit::Exporter;
use sceneweave::registry::ReferenceRegistry;
use sceneweave::sync::TransformRecord;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built ",
    env!("SCENEWEAVE_BUILD_DATE"),
    " ",
    env!("SCENEWEAVE_BUILD_TIME"),
    ")"
);

#[derive(Parser)]
#[command(name = "sceneweave", version, long_version = LONG_VERSION, about = "Scene graph to glTF exporter")]
struct Cli {
    /// More output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every sub-asset of a scene document.
    Export {
        /// Scene document (JSON).
        scene: PathBuf,

        /// Settings file; defaults to sceneweave.toml next to the scene.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory, overriding the settings.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Write GLB containers instead of .gltf JSON.
        #[arg(long)]
        binary: bool,

        /// Rewrite every output even when it is current.
        #[arg(long)]
        no_cache: bool,
    },

    /// Print the stable identifier of every object.
    Ids {
        /// Scene document (JSON).
        scene: PathBuf,
    },

    /// Encode compact sync records.
    Record {
        #[command(subcommand)]
        record: RecordKind,
    },
}

#[derive(Subcommand)]
enum RecordKind {
    /// 36-byte transform: position, rotation, scale.
    Transform {
        #[arg(num_args = 9, allow_negative_numbers = true, value_names = ["X", "Y", "Z", "RX", "RY", "RZ", "SX", "SY", "SZ"])]
        values: Vec<f32>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let outcome = match cli.command {
        Commands::Export {
            scene,
            config,
            out,
            binary,
            no_cache,
        } => cmd_export(&scene, config.as_deref(), out, binary, no_cache),
        Commands::Ids { scene } => cmd_ids(&scene),
        Commands::Record {
            record: RecordKind::Transform { values },
        } => cmd_record_transform(&values),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_export(scene: &Path, config: Option<&Path>, out: Option<PathBuf>, binary: bool, no_cache: bool) -> Result<()> {
    let mut settings = match config {
        Some(path) => ExportSettings::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => {
            let dir = scene.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            ExportSettings::discover(dir)?
        }
    };
    if let Some(out) = out {
        settings.output_dir = out;
    }
    settings.binary |= binary;
    settings.use_cache &= !no_cache;

    let graph = SceneGraph::load(scene).with_context(|| format!("reading {}", scene.display()))?;
    let mut exporter = Exporter::new(settings);
    let report = exporter.export_scene(&graph)?;

    for d in &report.diagnostics {
        eprintln!("{d}");
    }
    for r in report.succeeded() {
        let state = if r.cached { "cached" } else { "written" };
        println!("{:>3}/{} {} -> {} ({state})", r.index + 1, r.count, r.name, r.path.as_deref().unwrap_or("-"));
    }
    if let Some(loader) = &report.loader {
        println!("loader: {}", loader.display());
    }
    for m in &report.manifests {
        println!("register: {}", m.display());
    }
    println!("{}", report.summary());

    if !report.is_success() {
        bail!("{} sub-asset(s) failed", report.failed().count());
    }
    Ok(())
}

fn cmd_ids(scene: &Path) -> Result<()> {
    let graph = SceneGraph::load(scene).with_context(|| format!("reading {}", scene.display()))?;
    let mut registry = ReferenceRegistry::new();

    println!("{:<12} {:<10} {:<34} NAME", "KEY", "KIND", "ID");
    for obj in graph.objects() {
        let id = registry.get_id(&graph, obj);
        let name = if obj.name.is_empty() { &obj.type_name } else { &obj.name };
        println!(
            "{:<12} {:<10} {:<34} {}",
            obj.key.as_str(),
            obj.kind.as_str(),
            id.as_ref().map(|i| i.as_str()).unwrap_or("(destroyed)"),
            name
        );
    }
    Ok(())
}

fn cmd_record_transform(values: &[f32]) -> Result<()> {
    let [x, y, z, rx, ry, rz, sx, sy, sz] = values else {
        bail!("expected 9 values, got {}", values.len());
    };
    let record = TransformRecord::new(Vec3::new(*x, *y, *z), Vec3::new(*rx, *ry, *rz), Vec3::new(*sx, *sy, *sz));
    let hex: String = record.encode().iter().map(|b| format!("{b:02x}")).collect();
    println!("{hex}");
    Ok(())
}
