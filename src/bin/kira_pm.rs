use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_pathway_mapper::analysis::{
    DEFAULT_P_VALUE_CUTOFF, EnrichmentRow, gene_list, pathway_occupancy, rank_enrichment,
};
use kira_pathway_mapper::app::{App, BatchOptions, ClientSettings, ProgressSink};
use kira_pathway_mapper::config::{ConfigLoader, ConfigOverrides};
use kira_pathway_mapper::error::KiraError;
use kira_pathway_mapper::kegg::KeggHttpClient;
use kira_pathway_mapper::mapping::{Mapping, Schema};
use kira_pathway_mapper::output::{self, JsonOutput, LogProgress, OutputMode};
use kira_pathway_mapper::pathways::PathwayNameIndex;
use kira_pathway_mapper::store::Store;
use kira_pathway_mapper::uniprot::UniprotHttpClient;

#[derive(Parser)]
#[command(name = "kira-pm")]
#[command(about = "Map UniProt accessions to KEGG genes, gene names and pathways")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true, help = "Print machine readable JSON instead of a summary")]
    json: bool,

    #[arg(long, global = true, help = "Config file (defaults to ./kira-pm.json when present)")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve accessions and write the mapping")]
    Map(MapArgs),
    #[command(about = "Rank pathways by how many accessions reach them")]
    Summary(SummaryArgs),
    #[command(about = "Print the gene list used as enrichment input")]
    Genes(DirArgs),
    #[command(about = "Rank an enrichment result table against the mapped genes")]
    Rank(RankArgs),
}

#[derive(Args)]
struct MapArgs {
    accessions: Vec<String>,

    #[arg(long)]
    accessions_file: Option<PathBuf>,

    #[arg(long)]
    organism: Option<String>,

    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, help = "Query every KEGG identifier instead of stopping at the first hit")]
    exhaustive: bool,

    #[arg(long)]
    no_names: bool,

    #[arg(long)]
    checkpoint_every: Option<usize>,

    #[arg(long)]
    resume: bool,
}

#[derive(Args)]
struct DirArgs {
    #[arg(long)]
    dir: Option<PathBuf>,
}

#[derive(Args)]
struct SummaryArgs {
    #[command(flatten)]
    dir: DirArgs,

    #[arg(long, default_value_t = 10)]
    top: usize,
}

#[derive(Args)]
struct RankArgs {
    #[command(flatten)]
    dir: DirArgs,

    #[arg(long, help = "JSON array of enrichment records")]
    enrichment: PathBuf,

    #[arg(long, default_value_t = DEFAULT_P_VALUE_CUTOFF)]
    p_value: f64,

    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::InvalidAccession(_)
        | KiraError::InvalidOrganism(_)
        | KiraError::NoAccessions
        | KiraError::MissingConfig
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::CheckpointMismatch { .. } => 2,
        err if err.is_remote() => 3,
        KiraError::StructureMismatch { .. }
        | KiraError::InvalidFormat(_)
        | KiraError::MappingNotFinalized
        | KiraError::Filesystem(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Map(args) => run_map(args, cli.config.as_deref(), output_mode),
        Commands::Summary(args) => run_summary(args, cli.config.as_deref(), output_mode),
        Commands::Genes(args) => run_genes(args, cli.config.as_deref()),
        Commands::Rank(args) => run_rank(args, cli.config.as_deref(), output_mode),
    }
}

fn run_map(args: MapArgs, config: Option<&str>, output_mode: OutputMode) -> miette::Result<()> {
    let overrides = ConfigOverrides {
        organism: args.organism,
        accessions: args.accessions,
        accessions_file: args.accessions_file,
        output_dir: args.out,
        exhaustive: args.exhaustive,
        skip_names: args.no_names,
        checkpoint_every: args.checkpoint_every,
    };
    let resolved = ConfigLoader::resolve_with_overrides(config, overrides)?;

    let store = Store::new(resolved.output_dir.clone());
    let uniprot = UniprotHttpClient::new()?;
    let kegg = KeggHttpClient::new()?;
    let app = App::new(store, uniprot, kegg, ClientSettings::from(&resolved));
    let options = BatchOptions::from_config(&resolved, args.resume);

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &LogProgress,
    };
    let result = app.run_batch(&resolved.accessions, &resolved.organism, &options, sink)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_batch(&result).into_diagnostic()?,
        OutputMode::Human => output::print_batch_summary(&result),
    }
    Ok(())
}

fn resolve_output(args: &DirArgs, config: Option<&str>) -> miette::Result<(Store, Schema)> {
    let resolved = ConfigLoader::resolve_with_overrides(config, ConfigOverrides::default())?;
    let store = match &args.dir {
        Some(dir) => Store::from_path(dir)?,
        None => Store::new(resolved.output_dir),
    };
    Ok((store, resolved.schema))
}

fn load_names(store: &Store) -> miette::Result<Option<PathwayNameIndex>> {
    let path = store.pathway_names_path();
    if !path.as_std_path().exists() {
        return Ok(None);
    }
    Ok(Some(Store::read_json(&path)?))
}

fn run_summary(
    args: SummaryArgs,
    config: Option<&str>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let (store, schema) = resolve_output(&args.dir, config)?;
    let mapping = Mapping::load(&store, &schema)?;
    let names = load_names(&store)?;
    let rows = pathway_occupancy(&mapping, names.as_ref(), Some(args.top));

    match output_mode {
        OutputMode::Json => JsonOutput::print_occupancy(&rows).into_diagnostic()?,
        OutputMode::Human => output::print_occupancy(&rows, mapping.pathways.len()),
    }
    Ok(())
}

fn run_genes(args: DirArgs, config: Option<&str>) -> miette::Result<()> {
    let (store, schema) = resolve_output(&args, config)?;
    let mapping = Mapping::load(&store, &schema)?;
    for gene in gene_list(&mapping) {
        println!("{gene}");
    }
    Ok(())
}

fn run_rank(args: RankArgs, config: Option<&str>, output_mode: OutputMode) -> miette::Result<()> {
    let (store, schema) = resolve_output(&args.dir, config)?;
    let mapping = Mapping::load(&store, &schema)?;
    let content = std::fs::read_to_string(&args.enrichment).into_diagnostic()?;
    let rows: Vec<EnrichmentRow> = serde_json::from_str(&content).into_diagnostic()?;
    let ranked = rank_enrichment(&rows, &gene_list(&mapping), args.p_value, Some(args.top))?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_ranked(&ranked).into_diagnostic()?,
        OutputMode::Human => output::print_ranked(&ranked),
    }
    Ok(())
}
