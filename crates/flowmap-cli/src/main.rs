use anyhow::{Context, Result};
use clap::Parser;
use flowmap_app::{FileSource, FlowmapSession, FlowmapSettings, LoadOutcome};
use flowmap_core::NodeId;
use flowmap_graph::{NeighborRecord, NodeAlignment, Scene};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Graph JSON with `nodes` and `links`
    #[arg(short, long)]
    input: PathBuf,

    /// Canvas width in pixels
    #[arg(long)]
    width: Option<f64>,

    /// Canvas height in pixels
    #[arg(long)]
    height: Option<f64>,

    /// Node alignment: justify, left, right or center
    #[arg(short, long)]
    align: Option<NodeAlignment>,

    /// Settings JSON; missing fields use defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lock the highlight on this node and include its detail records
    #[arg(short, long)]
    focus: Option<String>,

    /// Write the output here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Output {
    scene: Scene,
    #[serde(skip_serializing_if = "Option::is_none")]
    focus: Option<Focus>,
}

#[derive(Serialize)]
struct Focus {
    node: NodeId,
    records: Vec<NeighborRecord>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => FlowmapSettings::load(path)?,
        None => FlowmapSettings::default(),
    };
    if let Some(width) = args.width {
        settings.canvas_width = width;
    }
    if let Some(height) = args.height {
        settings.canvas_height = height;
    }
    if let Some(align) = args.align {
        settings.layout.alignment = align;
    }

    let session = FlowmapSession::new(settings);
    let outcome = session
        .load(&FileSource::new(&args.input))
        .await
        .with_context(|| format!("Failed to render {}", args.input.display()))?;
    if let LoadOutcome::Applied { nodes, links } = outcome {
        tracing::info!(nodes, links, "Rendered graph");
    }

    let focus = match args.focus {
        Some(name) => {
            let node = NodeId::from(name);
            session
                .click(&node)
                .with_context(|| format!("Cannot focus `{node}`"))?;
            let records = session.detail_records(&node)?;
            Some(Focus { node, records })
        }
        None => None,
    };

    let scene = session.scene().context("No graph was loaded")?;
    let json = serde_json::to_string_pretty(&Output { scene, focus })?;
    match args.out {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}
