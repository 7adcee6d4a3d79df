use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use log::info;
use rayon::ThreadPoolBuilder;

use ideal_windows::{
    FinderConfig, JsonlStore, SelectedWindow, Selector, SymbolMap, WindowCache, WindowMethod,
    export, fasta, mapper,
};

#[derive(Parser)]
#[command(name = "idealwin")]
#[command(version)]
#[command(
    about = "Find the top-K sliding windows closest to an ideal value in FASTA sequences",
    long_about = None
)]
struct Cli {
    /// Input DNA FASTA file
    #[arg(short, long)]
    input: PathBuf,

    /// Sliding window size
    #[arg(short, long)]
    window: usize,

    /// Number of ideal segments to report
    #[arg(short, long, default_value_t = 10)]
    top: usize,

    /// Ideal value of the sliding window score
    #[arg(short = 'v', long = "value")]
    value: f64,

    /// Output path; a .csv suffix selects CSV, anything else JSONL
    #[arg(short, long)]
    output: PathBuf,

    /// Dictionary mode
    #[arg(short, long, value_enum, default_value = "GC")]
    dict: DictMode,

    /// Window scoring method
    #[arg(short, long, value_enum, default_value = "mean")]
    method: MethodArg,

    /// Filter out partially overlapping runs
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    filter: bool,

    /// Value for symbols outside the dictionary
    #[arg(short, long, default_value_t = 0.0)]
    beyond: f64,

    /// Persist the numeric record file alongside the input
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    cache: bool,

    /// Emit 1-based start/end indices
    #[arg(
        short = 'r',
        long = "human-readable",
        default_value_t = true,
        action = ArgAction::Set
    )]
    human_readable: bool,

    /// Records per external-sort chunk; bigger is faster but uses more memory
    #[arg(short = 's', long = "sort-chunk-size", default_value_t = 10_000_000)]
    sort_chunk_size: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum DictMode {
    #[value(name = "GC")]
    Gc,
    #[value(name = "AT")]
    At,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Mean,
    Sum,
}

impl From<MethodArg> for WindowMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::Mean => WindowMethod::Mean,
            MethodArg::Sum => WindowMethod::Sum,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Size the global rayon pool to the machine instead of relying on
    // RAYON_NUM_THREADS, so runs behave the same across environments.
    let threads = num_cpus::get();
    let _ = ThreadPoolBuilder::new().num_threads(threads).build_global();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.window == 0 {
        bail!("--window must be at least 1");
    }
    if cli.top == 0 {
        bail!("--top must be at least 1");
    }

    let map = match cli.dict {
        DictMode::Gc => SymbolMap::gc(cli.beyond),
        DictMode::At => SymbolMap::at(cli.beyond),
    };

    // FASTA -> symbolic JSONL beside the input. Reuse an existing file only
    // when caching is off; with caching on the conversion is refreshed.
    let symbol_path = cli.input.with_extension("jsonl");
    let symbols = if cli.cache || !symbol_path.exists() {
        fasta::fasta_to_store(&cli.input, &symbol_path)
            .with_context(|| format!("reading FASTA input {:?}", cli.input))?
    } else {
        JsonlStore::open(&symbol_path)?
    };

    // Symbolic -> numeric, persisted beside the input when caching is on.
    let numeric_path = cli.input.with_extension("numeric.jsonl");
    let numeric = if cli.cache {
        if numeric_path.exists() {
            info!("reusing numeric record cache {numeric_path:?}");
            JsonlStore::open(&numeric_path)?
        } else {
            mapper::to_numeric_store(&symbols, &map, Some(&numeric_path))
                .context("building numeric records")?
        }
    } else {
        mapper::to_numeric_store(&symbols, &map, None).context("building numeric records")?
    };
    symbols.close()?;

    let config = FinderConfig {
        window: cli.window,
        top: cli.top,
        ideal_value: cli.value,
        method: cli.method.into(),
        prune_overlap: cli.filter,
        sort_chunk_size: cli.sort_chunk_size,
        precision: 4,
    };
    let mut selector = Selector::new(config);
    if cli.cache {
        selector = selector.with_cache(WindowCache::beside(&cli.input));
    }

    let saved_jsonl = cli.output.with_extension("jsonl");
    let selected = selector
        .find(numeric, Some(&saved_jsonl))
        .context("selecting ideal windows")?;
    let found = selected.len()?;
    selected.close()?;

    if cli.human_readable {
        shift_human_readable(&saved_jsonl)?;
    }

    let is_csv = cli.output.extension().is_some_and(|ext| ext == "csv");
    if is_csv {
        let store: JsonlStore<SelectedWindow> = JsonlStore::open(&saved_jsonl)?;
        export::write_csv(&store, &cli.output)
            .with_context(|| format!("writing {:?}", cli.output))?;
        store.close()?;
        fs::remove_file(&saved_jsonl)?;
    }

    if !cli.cache && symbol_path.exists() {
        fs::remove_file(&symbol_path)?;
    }

    info!(
        "found {found} ideal segments, result saved in {:?}",
        if is_csv { &cli.output } else { &saved_jsonl }
    );
    Ok(())
}

/// Rewrite a selected-window file with 1-based inclusive indices.
fn shift_human_readable(path: &Path) -> Result<()> {
    let store: JsonlStore<SelectedWindow> = JsonlStore::open(path)?;
    let mut shifted: JsonlStore<SelectedWindow> = JsonlStore::temp()?;
    for record in store.iter()? {
        let mut record = record?;
        record.start_idx += 1;
        record.end_idx += 1;
        shifted.append(&record)?;
    }
    store.close()?;
    fs::copy(shifted.path(), path)?;
    shifted.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn boolean_flags_accept_explicit_values() {
        let cli = Cli::parse_from([
            "idealwin", "-i", "in.fasta", "-w", "8", "-v", "1.0", "-o", "out.csv", "-f", "false",
            "-c", "false", "-r", "false",
        ]);
        assert!(!cli.filter);
        assert!(!cli.cache);
        assert!(!cli.human_readable);
        assert_eq!(cli.top, 10);
        assert_eq!(cli.sort_chunk_size, 10_000_000);
    }
}
