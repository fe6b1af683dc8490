use clap::{Parser, Subcommand};
use metromap_common::graph::CombGraph;
use metromap_common::util::config::Config;
use metromap_common::util::{generator, logger};
use metromap_optim::{OptGraph, order_lines};
use metromap_router::{check, octilinearize};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a random benchmark comb graph.
    Generate {
        #[arg(long, default_value_t = 50)]
        stations: usize,
        #[arg(long, default_value_t = 8)]
        lines: usize,
    },
    /// Route the comb graph onto the octilinear grid.
    Route,
    /// Order the parallel lines of the routed bundles.
    Order,
    /// Route, then order.
    Flow,
}

fn main() -> anyhow::Result<()> {
    logger::init();
    let args = Args::parse();

    let config = if args.config.exists() {
        log::info!("Loading configuration from {:?}", args.config);
        let config_str = std::fs::read_to_string(&args.config)
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;
        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?
    } else {
        log::warn!(
            "Configuration file {:?} not found. Using internal defaults.",
            args.config
        );
        Config::default()
    };

    let command = args.command.unwrap_or(Commands::Flow);

    match command {
        Commands::Generate { stations, lines } => {
            let comb = generator::generate_comb(stations, lines);
            prepare_parent_dir(&config.input.comb_file)?;
            std::fs::write(&config.input.comb_file, serde_json::to_string_pretty(&comb)?)?;
            log::info!("Wrote comb graph to {}", config.input.comb_file);
        }
        Commands::Route => {
            let comb = load_comb(&config)?;
            run_routing(&config, &comb)?;
        }
        Commands::Order => {
            let comb = load_comb(&config)?;
            run_ordering(&config, &comb)?;
        }
        Commands::Flow => {
            let comb = load_comb(&config)?;
            run_routing(&config, &comb)?;
            run_ordering(&config, &comb)?;
        }
    }

    Ok(())
}

fn load_comb(config: &Config) -> anyhow::Result<CombGraph> {
    let path = &config.input.comb_file;
    if !Path::new(path).exists() {
        return Err(anyhow::anyhow!(
            "Comb graph file missing: '{}'. Did you run 'generate'?",
            path
        ));
    }
    let data = std::fs::read_to_string(path)?;
    let comb: CombGraph = serde_json::from_str(&data)
        .map_err(|e| anyhow::anyhow!("Invalid comb graph in '{}': {}", path, e))?;
    log::info!(
        "Loaded comb graph: {} stations, {} links, {} lines",
        comb.num_nodes(),
        comb.num_edges(),
        comb.num_lines()
    );
    Ok(comb)
}

#[derive(Serialize)]
struct RoutedPathOut {
    edge: u32,
    cells: Vec<[usize; 2]>,
    points: Vec<[f64; 2]>,
    cost: f64,
}

fn run_routing(config: &Config, comb: &CombGraph) -> anyhow::Result<()> {
    log::info!("Starting octilinear routing...");
    let (grid, layout) = octilinearize(comb, &config.grid)?;

    check::run(&grid, comb, &layout).map_err(|e| anyhow::anyhow!("Verification failed: {}", e))?;

    let out: Vec<RoutedPathOut> = comb
        .edge_ids()
        .filter_map(|e| {
            layout.path(e).map(|p| RoutedPathOut {
                edge: e.0,
                cells: p.cells.iter().map(|&c| {
                    let (x, y) = grid.cell(c).xy();
                    [x, y]
                }).collect(),
                points: p.cells.iter().map(|&c| {
                    let pos = grid.cell(c).pos();
                    [pos.x, pos.y]
                }).collect(),
                cost: p.cost,
            })
        })
        .collect();

    prepare_parent_dir(&config.input.routed_file)?;
    std::fs::write(&config.input.routed_file, serde_json::to_string_pretty(&out)?)?;
    log::info!("Wrote routed layout to {}", config.input.routed_file);
    Ok(())
}

#[derive(Serialize)]
struct OrderOut {
    edge: u32,
    order: usize,
    positions: Vec<usize>,
}

fn run_ordering(config: &Config, comb: &CombGraph) -> anyhow::Result<()> {
    log::info!("Starting line ordering...");
    let og = OptGraph::from_comb(comb);
    let order = order_lines(&og, comb, &config.ordering)?;

    let out: Vec<OrderOut> = order
        .iter()
        .map(|(etg, ord, positions)| OrderOut {
            edge: etg.0,
            order: ord,
            positions: positions.to_vec(),
        })
        .collect();

    prepare_parent_dir(&config.input.order_file)?;
    std::fs::write(&config.input.order_file, serde_json::to_string_pretty(&out)?)?;
    log::info!("Wrote line ordering to {}", config.input.order_file);
    Ok(())
}

fn prepare_parent_dir(path_str: &str) -> anyhow::Result<()> {
    if let Some(parent) = Path::new(path_str).parent()
        && !parent.exists()
    {
        log::info!("Creating output directory: {:?}", parent);
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
