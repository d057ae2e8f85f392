use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser};
use skiresort::{get_best_route, GridParseError};
use tracing::{info, warn};
use util::BadInput;

const USAGE_EXIT: u8 = 1;
const READ_EXIT: u8 = 2;
const PARSE_EXIT: u8 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about = "Finds the longest, steepest downhill route on a ski map", long_about = None)]
struct Cli {
    /// Map file: a `rows cols` header followed by one line of elevations per row.
    /// Unreadable files exit with 2; malformed or non-UTF-8 content exits with 3.
    path: PathBuf,
    /// Spread the search over all cores.
    #[arg(short, long)]
    parallel: bool,
    /// Also print the route length and elevation drop.
    #[arg(short, long)]
    summary: bool,
}

fn report_parse_error(input: &str, err: &GridParseError) -> Result<()> {
    println!("An error occurred while reading the file: {err}");

    if let Some((line, offset)) = err.location() {
        if let Some(src) = input.lines().nth(line) {
            print!("{}", BadInput::new(src, offset, err.to_string()).render()?);
        }
    }

    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let bytes = match fs::read(&cli.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %cli.path.display(), "read failed");
            println!("Could not open file: {e}");
            return Ok(ExitCode::from(READ_EXIT));
        }
    };

    // The file opened fine; undecodable text is bad map content.
    let input = match String::from_utf8(bytes) {
        Ok(input) => input,
        Err(e) => {
            println!("An error occurred while reading the file: {e}");
            return Ok(ExitCode::from(PARSE_EXIT));
        }
    };

    let (grid, route) = match get_best_route(&input, cli.parallel) {
        Ok(res) => res,
        Err(e) => match e.downcast_ref::<GridParseError>() {
            Some(parse_err) => {
                report_parse_error(&input, parse_err)?;
                return Ok(ExitCode::from(PARSE_EXIT));
            }
            None => return Err(e),
        },
    };

    info!(width = grid.width(), height = grid.height(), "searched map");

    println!("{route}");
    if cli.summary {
        println!(
            "length: {}, drop: {}",
            route.len(),
            route.elevation_drop(&grid)
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(_) => {
            println!("{}", Cli::command().render_usage());
            return Ok(ExitCode::from(USAGE_EXIT));
        }
    };

    run(cli)
}
