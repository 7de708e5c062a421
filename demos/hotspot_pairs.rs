//! Example tracking a gut community through an enterotype shift.
//!
//! This example shows how to:
//! 1. Parse a phylogeny and build a feature table in memory
//! 2. Run the batch hotspot pipeline over consecutive timepoints
//! 3. Inspect the per-edge decomposition of the largest shift
//! 4. Compare weighted and unweighted metrics

use sprs::TriMat;
use unifrac_hotspot::prelude::*;

/// Small gut phylogeny; Akkermansia sits on a unary stalk.
const GUT_TREE: &str = "((Lacto_acidophilus:0.08,Lacto_gasseri:0.06)Lactobacillus:0.22,\
((Bact_fragilis:0.12,Bact_ovatus:0.10)Bacteroides:0.18,\
(Prevotella_copri:0.15,Prevotella_oris:0.11)Prevotella:0.20)Bacteroidetes:0.09,\
(Akk_muciniphila:0.30)Akkermansia:0.25)root;";

fn main() -> Result<()> {
    println!("=== UniFrac Hotspot Example ===\n");

    let tree = parse_newick(GUT_TREE)?;
    let table = create_example_table();

    println!("Data dimensions:");
    println!("  Features: {}", table.n_features());
    println!("  Samples:  {}", table.n_samples());
    println!("  Tree tips: {}", tree.leaf_count());
    println!();

    // Consecutive timepoint pairs.
    let sample_ids = table.sample_ids().to_vec();
    let pairs: Vec<(String, String)> = sample_ids
        .windows(2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect();

    println!("=== Weighted UniFrac over consecutive timepoints ===\n");

    let set = hotspot_pairs(
        Source::loaded(table.clone()),
        Source::loaded(tree.clone()),
        &pairs,
        Metric::Weighted,
    )?;

    println!(
        "{:<5} {:<5} {:>9} {:<18} {:>9} {:<10}",
        "From", "To", "Distance", "Hotspot", "Value", "Elevated"
    );
    println!("{}", "-".repeat(62));
    for pair in set.iter() {
        match &pair.hotspot {
            Some(h) => println!(
                "{:<5} {:<5} {:>9.4} {:<18} {:>9.4} {:<10}",
                pair.sample_1,
                pair.sample_2,
                pair.distance,
                h.node_name.as_deref().unwrap_or("(unnamed)"),
                h.differential_abundance,
                pair.elevated_in().unwrap_or("NA"),
            ),
            None => println!(
                "{:<5} {:<5} {:>9.4} {:<18} {:>9} {:<10}",
                pair.sample_1, pair.sample_2, pair.distance, "(none)", "-", "-"
            ),
        }
    }
    println!();

    println!("=== Summary ===\n");
    print!("{}", set.summary());
    println!();

    // Deep dive into the largest shift.
    if let Some(biggest) = set
        .iter()
        .filter(|p| p.hotspot.is_some())
        .max_by(|a, b| a.distance.total_cmp(&b.distance))
    {
        println!(
            "=== Largest shift: {} -> {} ===\n",
            biggest.sample_1, biggest.sample_2
        );
        if let Some(profile) = &biggest.hotspot {
            print!("{}", profile);
        }
        println!();

        let u = table.sample_vector(&biggest.sample_1)?;
        let v = table.sample_vector(&biggest.sample_2)?;
        let result = emd_unifrac(
            u.as_slice(),
            v.as_slice(),
            table.feature_ids(),
            Source::loaded(tree.clone()),
            Metric::Weighted,
        )?;

        let restricted = tree.restrict(table.feature_ids())?;
        let indexed = IndexedTree::from_tree(&restricted)?;

        println!("Per-edge decomposition (top 5 by magnitude):");
        for (id, value) in result.entries_by_magnitude().into_iter().take(5) {
            println!(
                "  {:<18} {:>9.4}",
                indexed.name(id).unwrap_or("(unnamed)"),
                value
            );
        }
        println!();
    }

    // Unweighted UniFrac sees only membership turnover: Prevotella is
    // absent at the start of the series.
    println!("=== Unweighted comparison: first vs last timepoint ===\n");

    let first = table.sample_vector(&sample_ids[0])?;
    let last = table.sample_vector(&sample_ids[sample_ids.len() - 1])?;
    let membership = hotspot(
        first.as_slice(),
        last.as_slice(),
        table.feature_ids(),
        Source::loaded(tree),
        Metric::Unweighted,
    )?;
    match membership {
        Some(profile) => print!("{}", profile),
        None => println!("No membership change between first and last timepoints."),
    }
    println!();

    println!("=== First pair as JSON ===\n");
    println!("{}", serde_json::to_string_pretty(&set.results[0])?);

    Ok(())
}

/// Six timepoints through a Bacteroides-to-Prevotella transition.
/// Prevotella is absent at T0/T1 and dominant by T5.
fn create_example_table() -> FeatureTable {
    let feature_ids = [
        "Lacto_acidophilus",
        "Lacto_gasseri",
        "Bact_fragilis",
        "Bact_ovatus",
        "Prevotella_copri",
        "Prevotella_oris",
        "Akk_muciniphila",
    ];
    // Target masses per timepoint, library size near 10000.
    let trajectory: [[f64; 6]; 7] = [
        [1800.0, 1700.0, 1500.0, 1300.0, 1200.0, 1100.0],
        [1200.0, 1100.0, 1000.0, 900.0, 800.0, 700.0],
        [3200.0, 3000.0, 2400.0, 1500.0, 900.0, 600.0],
        [2300.0, 2100.0, 1700.0, 1100.0, 700.0, 400.0],
        [0.0, 0.0, 600.0, 2200.0, 3600.0, 4500.0],
        [0.0, 0.0, 300.0, 1000.0, 1700.0, 2100.0],
        [900.0, 950.0, 1000.0, 1050.0, 1100.0, 1150.0],
    ];

    let mut seed = 42u64;
    let rand_uniform = |s: &mut u64| -> f64 {
        *s = s.wrapping_mul(1103515245).wrapping_add(12345);
        ((*s >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let mut tri_mat = TriMat::new((7, 6));
    for (feat, masses) in trajectory.iter().enumerate() {
        for (sample, &mass) in masses.iter().enumerate() {
            if mass == 0.0 {
                continue;
            }
            let noise = 0.9 + 0.2 * rand_uniform(&mut seed);
            tri_mat.add_triplet(feat, sample, (mass * noise).round());
        }
    }

    let feature_ids: Vec<String> = feature_ids.iter().map(|s| s.to_string()).collect();
    let sample_ids: Vec<String> = (0..6).map(|t| format!("T{}", t)).collect();
    FeatureTable::new(tri_mat.to_csr(), feature_ids, sample_ids)
        .expect("dimensions match by construction")
}
