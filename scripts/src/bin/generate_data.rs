//! Generate a dataset of random integers in `1..=n`, space separated on a single line
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use clap::Parser;
use itertools::Itertools;
use parsort::helpers::{is_power_of_two, random_fixture};

/// Struct for parsing command-line arguments
#[derive(Parser)]
struct Args {
    /// Number of elements
    #[arg(long)]
    n: usize,

    /// Output file, defaults to `data_<n>.txt`
    #[arg(long)]
    output: Option<PathBuf>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Reject element counts that are not a power of two
    #[arg(long, default_value_t = false)]
    power_of_two: bool,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    if args.power_of_two && !is_power_of_two(args.n) {
        eprintln!(
            "Error: {} is not a power of two, the next one is {}",
            args.n,
            args.n.next_power_of_two()
        );
        std::process::exit(1);
    }

    let filename = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("data_{}.txt", args.n)));

    let data = random_fixture(args.n, 1i64, args.n.max(1) as i64, args.seed);

    let mut writer = BufWriter::new(File::create(&filename)?);
    writeln!(writer, "{}", data.iter().join(" "))?;
    writer.flush()?;

    println!(
        "Successfully generated {} in {}",
        args.n,
        filename.display()
    );

    Ok(())
}
