use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use framelab_assets::AssetStore;
use framelab_demos::{DemoId, FramelabConfig, create};
use framelab_input::{Action, InputState};
use framelab_render::{DebugTextRenderer, FrameGraph, FrameView, Renderer};
use framelab_tween::FrameTime;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framelab-cli", about = "Run framelab demos headless")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config overriding demo defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// List the demos by number and name
    List,
    /// Step a demo for a number of frames and print the last frame
    Simulate {
        /// Demo name or number
        #[arg(short, long)]
        demo: String,
        /// Number of frames to simulate
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        #[arg(long, default_value = "800")]
        width: u32,
        #[arg(long, default_value = "600")]
        height: u32,
        /// Print a JSON summary instead of the text dump
        #[arg(long)]
        json: bool,
    },
    /// Validate and print the pass graph of an offscreen demo
    Graph {
        #[arg(short, long)]
        demo: String,
    },
    /// Resolve a demo's textures and write the asset manifest
    Textures {
        #[arg(short, long)]
        demo: String,
        /// Asset root directory
        #[arg(long, default_value = "./assets")]
        assets: PathBuf,
        /// Where to write the manifest; printed to stdout when omitted
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Print the effective configuration as YAML
    Config,
}

const FRAME_DT: f32 = 1.0 / 60.0;

fn parse_demo(name: &str) -> anyhow::Result<DemoId> {
    Ok(name.parse::<DemoId>()?)
}

fn graph_json(graph: &FrameGraph) -> serde_json::Value {
    let passes: Vec<_> = graph
        .passes
        .iter()
        .map(|pass| {
            json!({
                "label": pass.label,
                "program": pass.program,
                "inputs": pass.inputs,
                "output": pass.output,
            })
        })
        .collect();
    json!({ "targets": graph.target_count, "passes": passes })
}

fn view_json(view: &FrameView<'_>) -> serde_json::Value {
    match view {
        FrameView::Scene { scene, camera } => {
            let batches = scene.visible_meshes();
            json!({
                "nodes": scene.node_count(),
                "batches": batches.len(),
                "instances": batches.iter().map(|b| b.instances.len()).sum::<usize>(),
                "eye": camera.eye.to_array(),
            })
        }
        FrameView::Polygon(p) => json!({
            "vertices": p.mesh.vertex_count(),
            "square": p.square,
        }),
        FrameView::PointLights(p) => json!({
            "lights": p.light_positions().map(|v| v.to_array()).collect::<Vec<_>>(),
        }),
        FrameView::PostProcess { graph } => graph_json(graph),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => FramelabConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => FramelabConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("framelab-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("render: {}", framelab_render::crate_info());
            println!("assets: {}", framelab_assets::crate_info());
            println!("demos: {}", framelab_demos::crate_info());
            println!("demo count: {}", DemoId::ALL.len());
        }
        Commands::List => {
            for (i, id) in DemoId::ALL.iter().enumerate() {
                println!("{:>2}  {:<12} {}", i + 1, id.as_str(), id.title());
            }
        }
        Commands::Simulate {
            demo,
            frames,
            seed,
            width,
            height,
            json,
        } => {
            let id = parse_demo(&demo)?;
            let mut demo = create(id, &config, seed, width, height)?;
            let mut input = InputState::new(width, height);
            let resize = Action::Resize { width, height };
            input.apply(&resize);
            demo.handle(&resize);

            let mut time = FrameTime::first(FRAME_DT);
            for _ in 0..frames {
                demo.update(&time, &input);
                time = time.next(FRAME_DT);
            }
            info!(demo = %id, frames, "simulation finished");

            let view = demo.view();
            if let FrameView::PostProcess { graph } = &view {
                graph.validate()?;
            }
            if json {
                let summary = json!({
                    "demo": id.as_str(),
                    "frames": frames,
                    "seed": seed,
                    "kind": view.kind(),
                    "view": view_json(&view),
                    "textures": demo.textures().iter().map(|k| k.as_str().to_string()).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", DebugTextRenderer::new().render(&view));
            }
        }
        Commands::Graph { demo } => {
            let id = parse_demo(&demo)?;
            let demo = create(id, &config, 0, 800, 600)?;
            let view = demo.view();
            let FrameView::PostProcess { graph } = &view else {
                bail!("{id} draws directly to the screen and has no pass graph");
            };
            graph.validate()?;
            print!("{graph}");
            println!("valid: {} passes, {} targets", graph.passes.len(), graph.target_count);
        }
        Commands::Textures { demo, assets, manifest } => {
            let id = parse_demo(&demo)?;
            let demo = create(id, &config, 0, 800, 600)?;
            let keys = demo.textures();
            let mut store = AssetStore::new(assets);
            let fallbacks = store.resolve_all(&keys);
            info!(demo = %id, keys = keys.len(), fallbacks, "textures resolved");
            for key in &keys {
                let origin = store
                    .origin(key)
                    .map(|o| format!("{o:?}"))
                    .unwrap_or_else(|| "unresolved".to_string());
                println!("{:<40} {origin}", key.as_str());
            }
            match manifest {
                Some(path) => {
                    store.save_manifest(&path)?;
                    println!("manifest written to {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&store.manifest())?),
            }
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slideshow_graph_summary_lists_every_pass() {
        let demo = create(DemoId::Slideshow, &FramelabConfig::default(), 0, 800, 600).unwrap();
        let view = demo.view();
        let FrameView::PostProcess { graph } = &view else {
            panic!("slideshow renders offscreen");
        };
        let summary = graph_json(graph);
        assert_eq!(summary["targets"], 10);
        assert_eq!(summary["passes"].as_array().unwrap().len(), 11);
        assert_eq!(summary["passes"][10]["output"], "Screen");
    }

    #[test]
    fn polygon_summary_counts_vertices() {
        let demo = create(DemoId::Polygon, &FramelabConfig::default(), 0, 800, 600).unwrap();
        let summary = view_json(&demo.view());
        assert!(summary["vertices"].as_u64().unwrap() > 0);
    }

    #[test]
    fn demo_names_and_numbers_parse() {
        assert_eq!(parse_demo("lights").unwrap(), DemoId::Lights);
        assert_eq!(parse_demo("2").unwrap(), DemoId::Fan);
        assert!(parse_demo("nope").is_err());
    }
}
