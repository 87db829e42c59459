use std::path::PathBuf;
use std::process;

use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use indicatif::{ProgressBar, ProgressStyle};

use agc_rs::align::{DEFAULT_GAP_EXTEND, DEFAULT_GAP_OPEN};
use agc_rs::config::{
    AgcConfig, DEFAULT_CHUNK_SIZE, DEFAULT_IDENTITY_THRESHOLD, DEFAULT_KMER_SIZE,
    DEFAULT_MINCOUNT, DEFAULT_MINSEQLEN, DEFAULT_OUTPUT_FILE,
};
use agc_rs::error::Result;
use agc_rs::{cluster_amplicons, scoring_scheme};

fn make_command() -> Command {
    Command::new("agc")
        .version(crate_version!())
        .about("Abundance greedy clustering of amplicons into OTUs")
        .after_help(
            r###"
Reads are dereplicated, sequences shorter than --minseqlen or seen fewer than
--mincount times are dropped, de novo chimeras are removed and the survivors
are greedily clustered at --identity percent identity.

Example:
   agc -i amplicons.fasta.gz -s 400 -m 10 -o OTU.fasta
"###,
        )
        .arg(
            Arg::new("amplicon_file")
                .long("amplicon-file")
                .short('i')
                .required(true)
                .num_args(1)
                .value_parser(value_parser!(PathBuf))
                .help("Amplicons as a compressed FASTA file (.fasta.gz)"),
        )
        .arg(
            Arg::new("minseqlen")
                .long("minseqlen")
                .short('s')
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help(format!("Minimum sequence length for dereplication [default: {}]", DEFAULT_MINSEQLEN)),
        )
        .arg(
            Arg::new("mincount")
                .long("mincount")
                .short('m')
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help(format!("Minimum count for dereplication [default: {}]", DEFAULT_MINCOUNT)),
        )
        .arg(
            Arg::new("chunk_size")
                .long("chunk-size")
                .short('c')
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help(format!("Chunk size used for chimera detection [default: {}]", DEFAULT_CHUNK_SIZE)),
        )
        .arg(
            Arg::new("kmer_size")
                .long("kmer-size")
                .short('k')
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help(format!("K-mer size used to find chimera parents [default: {}]", DEFAULT_KMER_SIZE)),
        )
        .arg(
            Arg::new("identity")
                .long("identity")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help(format!(
                    "Percent identity for a sequence to join an OTU [default: {}]",
                    DEFAULT_IDENTITY_THRESHOLD
                )),
        )
        .arg(
            Arg::new("matrix")
                .long("matrix")
                .num_args(1)
                .value_parser(value_parser!(PathBuf))
                .help("Substitution matrix file [default: match 1, mismatch -1]"),
        )
        .arg(
            Arg::new("gap_open")
                .long("gap-open")
                .num_args(1)
                .allow_hyphen_values(true)
                .value_parser(value_parser!(i32))
                .help(format!("Score of the first position of a gap [default: {}]", DEFAULT_GAP_OPEN)),
        )
        .arg(
            Arg::new("gap_extend")
                .long("gap-extend")
                .num_args(1)
                .allow_hyphen_values(true)
                .value_parser(value_parser!(i32))
                .help(format!("Score of each further position of a gap [default: {}]", DEFAULT_GAP_EXTEND)),
        )
        .arg(
            Arg::new("output_file")
                .long("output-file")
                .short('o')
                .num_args(1)
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_OUTPUT_FILE)
                .help("Output file"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Log progress to stderr"),
        )
}

fn config_from_args(args: &ArgMatches) -> Result<AgcConfig> {
    // amplicon_file is required; every other absent option takes its default
    let amplicon_file = args
        .get_one::<PathBuf>("amplicon_file")
        .cloned()
        .unwrap_or_default();

    let scoring = scoring_scheme(
        args.get_one::<PathBuf>("matrix").map(PathBuf::as_path),
        *args.get_one("gap_open").unwrap_or(&DEFAULT_GAP_OPEN),
        *args.get_one("gap_extend").unwrap_or(&DEFAULT_GAP_EXTEND),
    )?;

    Ok(AgcConfig {
        minseqlen: *args.get_one("minseqlen").unwrap_or(&DEFAULT_MINSEQLEN),
        mincount: *args.get_one("mincount").unwrap_or(&DEFAULT_MINCOUNT),
        chunk_size: *args.get_one("chunk_size").unwrap_or(&DEFAULT_CHUNK_SIZE),
        kmer_size: *args.get_one("kmer_size").unwrap_or(&DEFAULT_KMER_SIZE),
        identity_threshold: *args
            .get_one("identity")
            .unwrap_or(&DEFAULT_IDENTITY_THRESHOLD),
        output_file: args
            .get_one::<PathBuf>("output_file")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE)),
        scoring,
        ..AgcConfig::new(amplicon_file)
    })
}

fn spinner(color: &str, msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{color}}} {{msg}}");
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
    {
        spinner.set_style(style);
    }
    spinner.set_message(msg);
    spinner
}

fn run(args: &ArgMatches) -> Result<()> {
    let config = config_from_args(args)?;

    // 1. Dereplication, chimera removal and clustering
    let bar = spinner("green", "Clustering amplicons...");
    let results = cluster_amplicons(&config)?;
    bar.finish_with_message(format!(
        "{} OTUs from {} dereplicated sequences ({} chimeras removed).",
        results.stats.otus, results.stats.dereplicated, results.stats.chimeras_removed
    ));

    // 2. Output
    let bar = spinner("yellow", "Writing OTUs...");
    results.write(&config)?;
    bar.finish_with_message(format!("OTUs written to {}.", config.output_file.display()));

    Ok(())
}

fn main() {
    let args = make_command().get_matches();

    let level = if args.get_flag("verbose") {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("agc: {}", e);
        process::exit(1);
    }
}
