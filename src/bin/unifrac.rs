//! unifrac - EMD UniFrac distances and hotspot profiles
//!
//! Command-line interface for pairwise UniFrac with per-edge
//! differential-abundance decomposition.

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::path::PathBuf;
use unifrac_hotspot::data::FeatureTable;
use unifrac_hotspot::error::{Result, UniFracError};
use unifrac_hotspot::hotspot::{emd_unifrac, hotspot, hotspot_pairs};
use unifrac_hotspot::normalize::Metric;
use unifrac_hotspot::source::Source;
use unifrac_hotspot::tree::{IndexedTree, Tree};

/// CLI-friendly metric enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMetric {
    /// Abundance-weighted UniFrac (total-sum scaled masses)
    Weighted,
    /// Presence/absence UniFrac (classical unshared-branch ratio)
    Unweighted,
}

impl From<CliMetric> for Metric {
    fn from(metric: CliMetric) -> Self {
        match metric {
            CliMetric::Weighted => Metric::Weighted,
            CliMetric::Unweighted => Metric::Unweighted,
        }
    }
}

/// EMD UniFrac with hotspot profiling
#[derive(Parser)]
#[command(name = "unifrac")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile the hotspot edge for one pair of samples
    Hotspot {
        /// Path to Newick tree
        #[arg(short, long)]
        tree: PathBuf,

        /// Path to feature table TSV
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// First sample id
        #[arg(long)]
        sample_1: String,

        /// Second sample id
        #[arg(long)]
        sample_2: String,

        /// UniFrac variant
        #[arg(short, long, value_enum, default_value = "weighted")]
        metric: CliMetric,

        /// Output format: text, json, or yaml
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Compute hotspot profiles for a batch of sample pairs
    Pairs {
        /// Path to Newick tree
        #[arg(short, long)]
        tree: PathBuf,

        /// Path to feature table TSV
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to pairs CSV (columns sample_1,sample_2; header row)
        #[arg(short, long)]
        pairs: PathBuf,

        /// UniFrac variant
        #[arg(short, long, value_enum, default_value = "weighted")]
        metric: CliMetric,

        /// Output path for results TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Optional path for a JSON copy of the full result set
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Compute the UniFrac distance for one pair of samples
    Distance {
        /// Path to Newick tree
        #[arg(short, long)]
        tree: PathBuf,

        /// Path to feature table TSV
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// First sample id
        #[arg(long)]
        sample_1: String,

        /// Second sample id
        #[arg(long)]
        sample_2: String,

        /// UniFrac variant
        #[arg(short, long, value_enum, default_value = "weighted")]
        metric: CliMetric,

        /// Also print the per-edge decomposition sorted by magnitude
        #[arg(long)]
        decompose: bool,
    },

    /// Check that every table feature maps to a tree node
    Check {
        /// Path to Newick tree
        #[arg(short, long)]
        tree: PathBuf,

        /// Path to feature table TSV
        #[arg(short = 'c', long)]
        counts: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Hotspot {
            tree,
            counts,
            sample_1,
            sample_2,
            metric,
            format,
        } => cmd_hotspot(&tree, &counts, &sample_1, &sample_2, metric.into(), &format),

        Commands::Pairs {
            tree,
            counts,
            pairs,
            metric,
            output,
            json,
        } => cmd_pairs(&tree, &counts, &pairs, metric.into(), &output, json.as_ref()),

        Commands::Distance {
            tree,
            counts,
            sample_1,
            sample_2,
            metric,
            decompose,
        } => cmd_distance(&tree, &counts, &sample_1, &sample_2, metric.into(), decompose),

        Commands::Check { tree, counts } => cmd_check(&tree, &counts),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Profile the hotspot for one pair
fn cmd_hotspot(
    tree_path: &PathBuf,
    counts_path: &PathBuf,
    sample_1: &str,
    sample_2: &str,
    metric: Metric,
    format: &str,
) -> Result<()> {
    eprintln!("Loading data...");
    let table = FeatureTable::from_tsv(counts_path)?;

    eprintln!(
        "Loaded {} features x {} samples",
        table.n_features(),
        table.n_samples()
    );

    let u = table.sample_vector(sample_1)?;
    let v = table.sample_vector(sample_2)?;

    eprintln!(
        "Computing {} UniFrac hotspot for '{}' vs '{}'...",
        metric, sample_1, sample_2
    );
    let profile = hotspot(
        u.as_slice(),
        v.as_slice(),
        table.feature_ids(),
        Source::path(tree_path),
        metric,
    )?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&profile)?),
        "yaml" => print!("{}", serde_yaml::to_string(&profile)?),
        _ => match &profile {
            Some(p) => print!("{}", p),
            None => println!(
                "Samples '{}' and '{}' are identical under the tree metric; no hotspot edge.",
                sample_1, sample_2
            ),
        },
    }

    Ok(())
}

/// Run the batch pipeline over a pairs file
fn cmd_pairs(
    tree_path: &PathBuf,
    counts_path: &PathBuf,
    pairs_path: &PathBuf,
    metric: Metric,
    output_path: &PathBuf,
    json_path: Option<&PathBuf>,
) -> Result<()> {
    eprintln!("Reading pairs from {:?}...", pairs_path);
    let pairs = read_pairs(pairs_path)?;
    eprintln!("  {} pairs", pairs.len());

    eprintln!("Computing {} UniFrac hotspots...", metric);
    let set = hotspot_pairs(
        Source::path(counts_path),
        Source::path(tree_path),
        &pairs,
        metric,
    )?;

    eprintln!("Writing results to {:?}...", output_path);
    set.to_tsv(output_path)?;

    if let Some(path) = json_path {
        std::fs::write(path, serde_json::to_string_pretty(&set)?)?;
        eprintln!("Wrote JSON copy to {:?}", path);
    }

    eprintln!("Done!");
    print!("{}", set.summary());

    Ok(())
}

/// Compute one distance, optionally with the per-edge decomposition
fn cmd_distance(
    tree_path: &PathBuf,
    counts_path: &PathBuf,
    sample_1: &str,
    sample_2: &str,
    metric: Metric,
    decompose: bool,
) -> Result<()> {
    eprintln!("Loading data...");
    let table = FeatureTable::from_tsv(counts_path)?;
    let tree = Tree::from_source(Source::path(tree_path))?;

    let u = table.sample_vector(sample_1)?;
    let v = table.sample_vector(sample_2)?;

    let result = emd_unifrac(
        u.as_slice(),
        v.as_slice(),
        table.feature_ids(),
        Source::loaded(tree.clone()),
        metric,
    )?;

    println!("{:.6}", result.distance);

    if decompose {
        // Node ids are assigned on the restricted tree.
        let restricted = tree.restrict(table.feature_ids())?;
        let indexed = IndexedTree::from_tree(&restricted)?;
        println!();
        println!("node_id\tnode_name\tdifferential_abundance");
        for (id, value) in result.entries_by_magnitude() {
            println!("{}\t{}\t{:+.6}", id, indexed.name(id).unwrap_or("NA"), value);
        }
    }

    Ok(())
}

/// Report table/tree consistency; exits 1 when features are unmapped
fn cmd_check(tree_path: &PathBuf, counts_path: &PathBuf) -> Result<()> {
    eprintln!("Loading data...");
    let tree = Tree::from_source(Source::path(tree_path))?;
    let table = FeatureTable::from_tsv(counts_path)?;

    let known: HashSet<&str> = (0..tree.len()).filter_map(|i| tree.name(i)).collect();
    let missing: Vec<&String> = table
        .feature_ids()
        .iter()
        .filter(|id| !known.contains(id.as_str()))
        .collect();
    let matched = table.n_features() - missing.len();

    println!("Consistency Report");
    println!("==================");
    println!();
    println!("Tree:");
    println!("  Nodes: {}", tree.len());
    println!("  Tips:  {}", tree.leaf_count());
    println!("  Total branch length: {:.6}", tree.total_branch_length());
    println!();
    println!("Table:");
    println!("  Features: {}", table.n_features());
    println!("  Samples:  {}", table.n_samples());
    println!();
    println!(
        "Features matched to tree nodes: {} / {}",
        matched,
        table.n_features()
    );

    if !missing.is_empty() {
        println!();
        println!("Missing from tree:");
        for id in missing.iter().take(10) {
            println!("  {}", id);
        }
        if missing.len() > 10 {
            println!("  ... and {} more", missing.len() - 10);
        }
        std::process::exit(1);
    }

    println!();
    println!("OK: every table feature maps to a tree node.");

    Ok(())
}

/// Read a two-column sample-pair CSV (header row expected).
fn read_pairs(path: &PathBuf) -> Result<Vec<(String, String)>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut pairs = Vec::new();

    for record in reader.records() {
        let record = record?;
        let sample_1 = record.get(0).map(str::trim).filter(|s| !s.is_empty());
        let sample_2 = record.get(1).map(str::trim).filter(|s| !s.is_empty());
        match (sample_1, sample_2) {
            (Some(a), Some(b)) => pairs.push((a.to_string(), b.to_string())),
            _ => {
                let line = record.position().map_or(0, |p| p.line());
                return Err(UniFracError::InvalidParameter(format!(
                    "pairs file line {}: expected two sample ids",
                    line
                )));
            }
        }
    }

    if pairs.is_empty() {
        return Err(UniFracError::EmptyData(
            "pairs file has no data rows".to_string(),
        ));
    }

    Ok(pairs)
}
