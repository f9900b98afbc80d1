//! sheetcalc CLI - evaluate formulas from the command line

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sheetcalc::prelude::*;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheetcalc")]
#[command(author, version, about = "Spreadsheet formula evaluation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a grid given as CELL=VALUE assignments, e.g. A1=10 "A2==A1*2"
    Eval {
        /// Cell assignments; a value starting with `=` is a formula
        assignments: Vec<String>,

        /// Read additional assignments from a file, one per line
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Maximum formula nesting depth (default: sized to the grid)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Print literal cells too, not only formulas
        #[arg(short, long)]
        all: bool,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the bounds of the block of filled cells around a cell
    Block {
        /// Starting cell, e.g. B2
        cell: String,

        /// Cell assignments
        assignments: Vec<String>,
    },

    /// List the built-in functions
    Functions,
}

#[derive(Serialize)]
struct CellReport<'a> {
    cell: String,
    #[serde(flatten)]
    data: &'a Cell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval {
            assignments,
            file,
            max_depth,
            all,
            json,
        } => eval(&assignments, file.as_deref(), max_depth, all, json),
        Commands::Block { cell, assignments } => show_block(&cell, &assignments),
        Commands::Functions => list_functions(),
    }
}

fn build_grid(assignments: &[String], file: Option<&Path>) -> Result<Grid> {
    let mut lines: Vec<String> = Vec::new();
    if let Some(path) = file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        lines.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }
    lines.extend(assignments.iter().cloned());

    let mut grid = Grid::new();
    for line in &lines {
        let Some((label, value)) = line.split_once('=') else {
            bail!("Expected CELL=VALUE, got '{}'", line);
        };
        grid.set_label(label.trim(), value)
            .with_context(|| format!("Invalid cell in assignment '{}'", line))?;
    }
    Ok(grid)
}

fn eval(
    assignments: &[String],
    file: Option<&Path>,
    max_depth: Option<usize>,
    all: bool,
    json: bool,
) -> Result<()> {
    let mut grid = build_grid(assignments, file)?;

    let mut options = EngineOptions::for_grid(&grid);
    if let Some(depth) = max_depth {
        options.max_depth = depth;
    }
    let stats = grid.recalculate_with_options(&options);

    let reports: Vec<CellReport> = grid
        .cells()
        .filter(|(_, cell)| all || cell.is_formula())
        .map(|(addr, cell)| CellReport {
            cell: addr.to_string(),
            data: cell,
        })
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &reports).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        for report in &reports {
            writeln!(
                out,
                "{}\t{}\t{}",
                report.cell,
                report.data.value,
                report.data.display()
            )?;
        }
    }

    eprintln!(
        "Calculated {} formulas ({} errors, {} circular)",
        stats.cells_calculated, stats.errors, stats.circular_references
    );
    Ok(())
}

fn show_block(cell: &str, assignments: &[String]) -> Result<()> {
    let grid = build_grid(assignments, None)?;
    let addr = CellAddress::parse(cell).with_context(|| format!("Invalid cell '{}'", cell))?;

    match grid.contiguous_range(addr) {
        Some(range) => println!("{}", range),
        None => eprintln!("Cell {} is empty", addr),
    }
    Ok(())
}

fn list_functions() -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for def in sheetcalc::registry().definitions() {
        writeln!(out, "{:<12} {}", def.name, def.description)?;
    }
    Ok(())
}
