//! Metgrid - inspect grid descriptions and NetCDF variables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metgrid::{FileHandler, Grid, GridBuilder, NetCdfHandler, SpatialAccessor};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "metgrid")]
#[command(about = "Inspect CDO grid descriptions and gridded NetCDF data", long_about = None)]
struct Args {
    /// Enable logging to specified file
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a grid description and print it in canonical form
    Describe {
        /// Path to the griddes file
        griddes: PathBuf,
    },
    /// List the variables of a NetCDF file
    Inspect {
        /// Path to the NetCDF file
        file: PathBuf,
    },
    /// Load one variable and bind its grid
    Extract {
        /// Path to the NetCDF file
        file: PathBuf,
        /// Variable name
        variable: String,
        /// Grid description to bind instead of the inferred grid
        #[arg(long)]
        grid: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(log_path) = &args.log {
        let file = File::create(log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        info!("Starting metgrid");
    }

    match &args.command {
        Command::Describe { griddes } => describe(griddes),
        Command::Inspect { file } => inspect(file),
        Command::Extract {
            file,
            variable,
            grid,
        } => extract(file, variable, grid.as_deref()),
    }
}

fn load_grid(path: &Path) -> Result<Grid> {
    GridBuilder::from_path(path)?
        .build()
        .with_context(|| format!("Invalid grid description {}", path.display()))
}

fn describe(path: &Path) -> Result<()> {
    let grid = load_grid(path)?;
    info!(path = %path.display(), "described {}", grid);

    println!("# {grid}");
    print!("{}", grid.describe());

    let last: Vec<usize> = grid.shape().iter().map(|n| n - 1).collect();
    let first: Vec<usize> = vec![0; last.len()];
    for (label, index) in [("first", first), ("last", last)] {
        let (y, x) = grid.coordinate(&index)?;
        let (lat, lon) = grid.lat_lon(&index)?;
        println!("# {label} point {index:?}: y={y} x={x} lat={lat:.4} lon={lon:.4}");
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let handler = NetCdfHandler::open(path)
        .with_context(|| format!("Failed to open NetCDF file {}", path.display()))?;

    for name in handler.variable_names()? {
        let message = handler.extract(&name)?;
        let grid = message
            .grid
            .as_ref()
            .map_or_else(|| "no grid".to_string(), |g| g.kind().to_string());
        println!("{name} ({}) {:?} {grid}", message.dims.join(", "), message.shape());
    }
    if let Some((lon, lat)) = handler.station_lonlat()? {
        println!("station lon={lon} lat={lat}");
    }
    Ok(())
}

fn extract(path: &Path, variable: &str, griddes: Option<&Path>) -> Result<()> {
    let handler = NetCdfHandler::open(path)
        .with_context(|| format!("Failed to open NetCDF file {}", path.display()))?;
    let mut message = handler.extract(variable)?;

    let override_grid = griddes.map(load_grid).transpose()?;
    if override_grid.is_some() {
        message.grid = None;
    }
    let mut accessor = SpatialAccessor::from_message(message)?;
    if let Some(grid) = override_grid {
        accessor
            .set_grid(grid)
            .with_context(|| format!("Grid does not fit {variable}"))?;
    }

    println!("{accessor}");
    match accessor.grid() {
        Ok(grid) => {
            let valid = accessor.data().iter().filter(|v| !v.is_nan()).count();
            println!("grid bound: {} points, {valid} valid values", grid.size());
        }
        Err(err) => println!("grid not bound: {err}"),
    }
    Ok(())
}
