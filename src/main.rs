//! CLI entry point for ztgrep

use std::io::{self, IsTerminal};
use std::process;

use clap::{Parser, ValueEnum};
use ztgrep::path_chain::STDIN_ROOT;
use ztgrep::{
    DEFAULT_MAX_ZIP_SIZE, EventOutput, JsonOutput, Limiter, SearchConfig, SearchPattern, Searcher,
    TextOutput, parse_size,
};

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // https://no-color.org/
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            io::stdout().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ztgrep")]
#[command(about = "Search file names and contents inside nested compressed archives")]
#[command(version)]
struct Args {
    /// Regular expression to search for
    pattern: String,

    /// Files to search; "-" reads standard input, which is also the default
    paths: Vec<String>,

    /// Skip file bodies
    #[arg(short = 'b', long = "skip-body")]
    skip_body: bool,

    /// Skip file names inside of archives
    #[arg(short = 'n', long = "skip-name")]
    skip_name: bool,

    /// Maximum size of a zip that has to be buffered to be searched (default: 10M)
    /// Use suffixes: K, M, G (e.g., 50M). Zip files on disk are never limited.
    #[arg(short = 'z', long = "max-zip-size", value_name = "SIZE")]
    max_zip_size: Option<String>,

    /// Number of files searched at once
    /// (0 = auto-detect, 1 = sequential, N = use N workers)
    #[arg(short = 'j', long = "jobs", default_value = "0")]
    jobs: usize,

    /// Print one JSON object per match or error
    #[arg(long = "json")]
    json: bool,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("ZTGREP_LOG", "warn"))
        .format_timestamp(None)
        .init();
}

fn main() {
    init_logging();
    let args = Args::parse();

    // 0 keeps the default, as an unset flag does.
    let max_zip_size = match args.max_zip_size.as_deref() {
        None => DEFAULT_MAX_ZIP_SIZE,
        Some(size_str) => match parse_size(size_str) {
            Ok(0) => DEFAULT_MAX_ZIP_SIZE,
            Ok(size) => size,
            Err(e) => {
                eprintln!("ztgrep: invalid --max-zip-size '{}': {}", size_str, e);
                process::exit(1);
            }
        },
    };

    let pattern = SearchPattern::new(&args.pattern).unwrap_or_else(|e| {
        eprintln!("ztgrep: invalid pattern: {}", e);
        process::exit(1);
    });

    let limiter = Limiter::new(args.jobs).unwrap_or_else(|e| {
        eprintln!("ztgrep: cannot start workers: {}", e);
        process::exit(1);
    });

    let config = SearchConfig {
        skip_name: args.skip_name,
        skip_body: args.skip_body,
        max_zip_size,
    };
    log::debug!("{:?}, {} workers", config, limiter.workers());

    let roots = if args.paths.is_empty() {
        vec![STDIN_ROOT.to_string()]
    } else {
        args.paths
    };

    let searcher = Searcher::new(pattern, config);
    let events = searcher.start(roots, &limiter).unwrap_or_else(|e| {
        eprintln!("ztgrep: cannot start search: {}", e);
        process::exit(1);
    });

    let mut output: Box<dyn EventOutput> = if args.json {
        Box::new(JsonOutput::new(io::stdout().lock()))
    } else {
        Box::new(TextOutput::stdio(should_use_color(args.color)))
    };

    let result = events
        .iter()
        .try_for_each(|event| output.write_event(&event))
        .and_then(|()| output.finish());

    match result {
        Ok(()) => {}
        // The reader went away (e.g. `ztgrep x big.tar | head`).
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
        Err(e) => {
            eprintln!("ztgrep: error writing output: {}", e);
            process::exit(1);
        }
    }
}
