//! Code implementing the "genotype assemble" sub command.

use std::time::Instant;

use clap::Parser;

use crate::common::io::open_write_maybe_gz;
use crate::common::trace_rss_now;
use crate::genotype::assembler::GenotypeAssembler;
use crate::genotype::input;
use crate::genotype::schema::{BackgroundCatalog, GenotypeRow, ReagentCatalog};
use crate::genotype::sink::MemoryGraph;
use crate::genotype::zygosity::HintTable;

/// Command line arguments for `genotype assemble` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Assemble genotype graphs from normalized rows", long_about = None)]
pub struct Args {
    /// Path to the normalized genotype-features TSV file.
    #[arg(long, required = true)]
    pub path_input: String,
    /// Path to the genotype-to-background mapping TSV file.
    #[arg(long)]
    pub path_backgrounds: Option<String>,
    /// Path to the knockdown-reagent catalog TSV file.
    #[arg(long)]
    pub path_reagents: Option<String>,
    /// Path to a zygosity hint vocabulary TSV file (term, zygosity).
    #[arg(long)]
    pub path_hints: Option<String>,
    /// Path to the output graph TSV file.
    #[arg(long, required = true)]
    pub path_output: String,

    /// Assume the input is grouped by genotype key and flush eagerly.
    #[arg(long, default_value_t = false)]
    pub grouped: bool,
    /// Optional maximal number of rows to process.
    #[arg(long)]
    pub max_rows: Option<usize>,
}

/// Main entry point for `genotype assemble` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    let backgrounds = match &args.path_backgrounds {
        Some(path) => input::load_backgrounds(path)?,
        None => BackgroundCatalog::default(),
    };
    let reagents = match &args.path_reagents {
        Some(path) => input::load_reagents(path)?,
        None => ReagentCatalog::default(),
    };
    let hints = match &args.path_hints {
        Some(path) => input::load_hints(path)?,
        None => HintTable::default(),
    };
    tracing::info!(
        "loaded {} backgrounds, {} reagents, {} zygosity hint terms",
        backgrounds.len(),
        reagents.len(),
        hints.len()
    );

    tracing::info!("assembling genotypes...");
    let before_assembly = Instant::now();
    let mut graph = MemoryGraph::new();
    let stats = {
        let mut assembler = GenotypeAssembler::new(&mut graph, &backgrounds, &reagents, &hints)
            .grouped(args.grouped);
        let rows: Box<dyn Iterator<Item = Result<GenotypeRow, csv::Error>>> = match args.max_rows {
            Some(max_rows) => Box::new(input::genotype_rows(&args.path_input)?.take(max_rows)),
            None => Box::new(input::genotype_rows(&args.path_input)?),
        };
        for row in rows {
            match row {
                Ok(row) => assembler.consume_row(&row)?,
                Err(error) => assembler.skip_malformed(&error),
            }
        }
        assembler.finish()?
    };
    tracing::info!(
        "...done assembling in {:?}: stats = {}",
        before_assembly.elapsed(),
        serde_json::to_string(&stats)?
    );
    if stats.rows_skipped > 0 {
        tracing::warn!("{} rows were skipped as malformed", stats.rows_skipped);
    }

    trace_rss_now();

    tracing::info!("writing graph to {:?}...", &args.path_output);
    graph.write_tsv(open_write_maybe_gz(&args.path_output)?)?;
    tracing::info!(
        "...wrote {} entities and {} relations; all done in {:?}",
        graph.entity_count(),
        graph.relation_count(),
        before_anything.elapsed()
    );

    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    #[test]
    fn run_assemble_smoke() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let path_output = tmp_dir
            .path()
            .join("graph.tsv")
            .to_str()
            .unwrap()
            .to_string();

        let args_common = crate::common::Args::default();
        let args = super::Args {
            path_input: "tests/genotype/assemble/features.tsv".into(),
            path_backgrounds: Some("tests/genotype/assemble/backgrounds.tsv".into()),
            path_reagents: Some("tests/genotype/assemble/reagents.tsv".into()),
            path_hints: Some("tests/genotype/assemble/hints.tsv".into()),
            path_output: path_output.clone(),
            grouped: true,
            max_rows: None,
        };

        super::run(&args_common, &args)?;

        let text = std::fs::read_to_string(&path_output)?;
        assert!(text.starts_with("# dipper-genotype-worker x.y.z\n"));
        // The heterozygous pair of G1: VSLC label plus the source genotype
        // label with its background embedded.
        assert!(text.contains("geneA<a1label>/geneA<a2label>"));
        assert!(text.contains("a1/a2 [AB]"));
        // The morpholino knockdown of G2 composes an effective genotype.
        assert!(text.contains("shha<MO1-shha (2 ng)>"));
        assert!(text.contains("extrinsic_genotype"));
        assert!(text.contains("effective_genotype"));

        Ok(())
    }

    #[test]
    fn run_assemble_max_rows() -> Result<(), anyhow::Error> {
        let tmp_dir = tempfile::tempdir()?;
        let path_output = tmp_dir
            .path()
            .join("graph.tsv")
            .to_str()
            .unwrap()
            .to_string();

        let args_common = crate::common::Args::default();
        let args = super::Args {
            path_input: "tests/genotype/assemble/features.tsv".into(),
            path_backgrounds: None,
            path_reagents: None,
            path_hints: None,
            path_output: path_output.clone(),
            grouped: false,
            max_rows: Some(1),
        };

        super::run(&args_common, &args)?;

        let text = std::fs::read_to_string(&path_output)?;
        let genotypes = text
            .lines()
            .filter(|line| line.contains("\tintrinsic_genotype\t"))
            .count();
        assert_eq!(1, genotypes);

        Ok(())
    }
}
