use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skilltree_author::Editor;
use skilltree_common::{Affinity, ClusterCoord, GridPos};
use skilltree_input::Action;
use skilltree_kernel::{ClusterGenerator, GridConfig, GridState};
use skilltree_tools::GridInspector;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skilltree-cli", about = "CLI tool for skill-grid operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file providing `world_seed`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// World seed (overrides the config file)
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Generate one cluster directly and print it
    Show {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        cx: i32,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        cy: i32,
        /// Bias affinity (red, blue, yellow, orange, green, violet)
        #[arg(long)]
        bias: Option<Affinity>,
    },
    /// Reveal random connectors outward from the origin
    Walk {
        /// Number of reveals
        #[arg(short = 'n', long, default_value = "50")]
        steps: usize,
        /// Seed for choosing which connector to reveal next
        #[arg(long, default_value = "0")]
        walk_seed: u64,
        /// Print every cluster after the walk
        #[arg(long)]
        render: bool,
    },
    /// Walk, then check replay and direct regeneration agree with the walk
    Verify {
        #[arg(short = 'n', long, default_value = "100")]
        steps: usize,
        #[arg(long, default_value = "0")]
        walk_seed: u64,
    },
    /// Print a generated cluster as JSON (inspection only)
    Dump {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        cx: i32,
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        cy: i32,
        #[arg(long)]
        bias: Option<Affinity>,
    },
    /// Apply scripted actions, e.g. "reveal 0 0 1" "toggle 1 0 2 2" "undo"
    Play {
        actions: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(&cli)?;
    tracing::debug!(world_seed = config.world_seed, "configuration loaded");

    match cli.command {
        Commands::Info => {
            println!("skilltree-cli v{}", env!("CARGO_PKG_VERSION"));
            for info in [
                skilltree_common::crate_info(),
                skilltree_kernel::crate_info(),
                skilltree_input::crate_info(),
                skilltree_author::crate_info(),
                skilltree_tools::crate_info(),
            ] {
                println!("  {info}");
            }
            println!("world seed: {}", config.world_seed);
        }
        Commands::Show { cx, cy, bias } => {
            let cluster = ClusterGenerator::new(config.world_seed)
                .generate(ClusterCoord::new(cx, cy), bias)?;
            print!("{}", GridInspector::render_cluster(&cluster));
        }
        Commands::Walk {
            steps,
            walk_seed,
            render,
        } => {
            let mut grid = GridState::from_config(&config);
            grid.ensure_origin()?;
            let done = random_walk(&mut grid, steps, walk_seed)?;
            println!("Walk: seed={}, reveals={done}", config.world_seed);
            if render {
                for cluster in grid.visible_clusters() {
                    println!("{}", GridInspector::render_cluster(cluster));
                }
            }
            println!("{}", GridInspector::summary(&grid));
            let report = GridInspector::validate(&grid);
            println!(
                "Validation: stitched={}, contested={}, violations={}",
                report.stitched,
                report.contested,
                report.violations.len()
            );
            for v in &report.violations {
                println!("  {v}");
            }
        }
        Commands::Verify { steps, walk_seed } => verify(&config, steps, walk_seed)?,
        Commands::Dump { cx, cy, bias } => {
            let cluster = ClusterGenerator::new(config.world_seed)
                .generate(ClusterCoord::new(cx, cy), bias)?;
            println!("{}", serde_json::to_string_pretty(&cluster)?);
        }
        Commands::Play { actions } => {
            let mut grid = GridState::from_config(&config);
            grid.ensure_origin()?;
            let mut editor = Editor::new();
            for text in &actions {
                let action: Action = text
                    .parse()
                    .with_context(|| format!("parsing action {text:?}"))?;
                match editor.apply(&mut grid, action) {
                    Ok(outcome) => println!("{text}: {outcome:?}"),
                    Err(err) => println!("{text}: rejected ({err})"),
                }
            }
            println!("{}", GridInspector::summary(&grid));
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<GridConfig> {
    let mut config = match &cli.config {
        Some(path) => GridConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GridConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.world_seed = seed;
    }
    Ok(config)
}

/// Reveal randomly chosen open connectors. Returns how many reveals ran.
fn random_walk(grid: &mut GridState, steps: usize, walk_seed: u64) -> anyhow::Result<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(walk_seed);
    for done in 0..steps {
        let frontier: Vec<(ClusterCoord, usize)> = grid
            .visible_clusters()
            .flat_map(|c| {
                c.connectors()
                    .iter()
                    .enumerate()
                    .filter(|(_, conn)| !conn.assigned)
                    .map(move |(i, _)| (c.coord, i))
            })
            .collect();
        if frontier.is_empty() {
            return Ok(done);
        }
        let (coord, i) = frontier[rng.gen_range(0..frontier.len())];
        grid.reveal_neighbor_from_connector(coord, i)?;
    }
    Ok(steps)
}

fn verify(config: &GridConfig, steps: usize, walk_seed: u64) -> anyhow::Result<()> {
    let mut grid = GridState::from_config(config);
    grid.ensure_origin()?;
    let done = random_walk(&mut grid, steps, walk_seed)?;
    println!(
        "Verify: seed={}, reveals={done}, clusters={}",
        config.world_seed,
        grid.cluster_count()
    );

    let replayed = GridState::replay(config.world_seed, grid.events())?;
    let replay_ok = replayed.state_hash() == grid.state_hash();
    println!(
        "Replay: hash={:#x} vs {:#x} ... {}",
        grid.state_hash(),
        replayed.state_hash(),
        if replay_ok { "OK" } else { "MISMATCH" }
    );

    let direct = ClusterGenerator::new(config.world_seed);
    let mut mismatches = 0;
    for cluster in grid.visible_clusters() {
        let fresh = direct.generate(cluster.coord, cluster.bias)?;
        for ((ix, iy), node) in cluster.nodes() {
            let pos = GridPos::new(cluster.coord, ix, iy)?;
            if grid.is_stitched(pos) {
                continue;
            }
            let expected = fresh.node_at(pos);
            if (node.affinity, node.node_type) != (expected.affinity, expected.node_type) {
                tracing::warn!(%pos, "node differs from direct generation");
                mismatches += 1;
            }
        }
        let same_links = fresh.connectors().len() == cluster.connectors().len()
            && fresh
                .connectors()
                .iter()
                .zip(cluster.connectors())
                .all(|(a, b)| a.same_slot(b) && a.affinity == b.affinity && a.node_type == b.node_type);
        if !same_links {
            tracing::warn!(coord = %cluster.coord, "connectors differ from direct generation");
            mismatches += 1;
        }
    }
    println!(
        "Direct regeneration: {}",
        if mismatches == 0 { "OK" } else { "MISMATCH" }
    );

    let report = GridInspector::validate(&grid);
    println!("Validation: violations={}", report.violations.len());

    if !replay_ok || mismatches > 0 || !report.is_ok() {
        anyhow::bail!("verification failed");
    }
    Ok(())
}
