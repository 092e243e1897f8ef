//! Reading of normalized input tables (the RowSource side of the worker).
//!
//! Upstream parsers are responsible for flattening their own formats into
//! these TSVs; the readers here only deserialize and hand rows to the
//! assembler.  All files may be plain or gzipped and may carry `#` comment
//! lines.

use std::io::BufRead;

use serde::Deserialize;

use crate::common::io::open_read_maybe_gz;
use crate::genotype::schema::{
    BackgroundCatalog, BackgroundInfo, GeneRef, GenotypeRow, ReagentCatalog,
};
use crate::genotype::zygosity::{HintTable, ZygosityKind};

fn tsv_reader(path: &str) -> Result<csv::Reader<Box<dyn BufRead>>, anyhow::Error> {
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(open_read_maybe_gz(path)?))
}

/// Open the genotype-features table as a lazy row stream.
///
/// Unparseable records surface as `Err` items for the caller to count and
/// skip; they must not abort the stream.
pub fn genotype_rows(
    path: &str,
) -> Result<impl Iterator<Item = Result<GenotypeRow, csv::Error>>, anyhow::Error> {
    Ok(tsv_reader(path)?.into_deserialize())
}

/// One record of the genotype-to-background mapping table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct BackgroundRecord {
    genotype_id: String,
    background_id: String,
    background_label: Option<String>,
    taxon_id: Option<String>,
}

/// Load the genotype-to-background mapping table.
pub fn load_backgrounds(path: &str) -> Result<BackgroundCatalog, anyhow::Error> {
    tracing::debug!("loading background records from {:?}...", path);
    let mut catalog = BackgroundCatalog::default();
    let mut reader = tsv_reader(path)?;
    for record in reader.deserialize() {
        let record: BackgroundRecord = record?;
        if record.genotype_id.is_empty() || record.background_id.is_empty() {
            tracing::warn!("skipping background record with missing ids");
            continue;
        }
        catalog.insert(
            &record.genotype_id,
            BackgroundInfo {
                background_id: record.background_id,
                background_label: record.background_label,
                taxon_id: record.taxon_id,
            },
        );
    }
    Ok(catalog)
}

/// One record of the knockdown-reagent table; reagents targeting several
/// genes repeat over multiple records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ReagentRecord {
    reagent_id: String,
    reagent_label: Option<String>,
    concentration: Option<String>,
    gene_id: Option<String>,
    gene_symbol: Option<String>,
}

/// Load the knockdown-reagent catalog.
pub fn load_reagents(path: &str) -> Result<ReagentCatalog, anyhow::Error> {
    tracing::debug!("loading reagent records from {:?}...", path);
    let mut catalog = ReagentCatalog::default();
    let mut reader = tsv_reader(path)?;
    for record in reader.deserialize() {
        let record: ReagentRecord = record?;
        if record.reagent_id.is_empty() {
            tracing::warn!("skipping reagent record with missing id");
            continue;
        }
        let info = catalog.entry(&record.reagent_id);
        if info.label.is_none() {
            info.label = record.reagent_label;
        }
        if info.concentration.is_none() {
            info.concentration = record.concentration;
        }
        if let Some(gene_id) = record.gene_id {
            if !info.targets.iter().any(|target| target.id == gene_id) {
                info.targets.push(GeneRef {
                    id: gene_id,
                    label: record.gene_symbol,
                });
            }
        }
    }
    Ok(catalog)
}

/// One record of a zygosity hint vocabulary table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct HintRecord {
    term: String,
    zygosity: String,
}

/// Load a source's zygosity hint vocabulary, extending the built-in table.
///
/// A record with an unknown zygosity name is a configuration error and
/// fails the load.
pub fn load_hints(path: &str) -> Result<HintTable, anyhow::Error> {
    tracing::debug!("loading zygosity hints from {:?}...", path);
    let mut table = HintTable::default();
    let mut reader = tsv_reader(path)?;
    for record in reader.deserialize() {
        let record: HintRecord = record?;
        if record.term.is_empty() {
            tracing::warn!("skipping hint record with empty term");
            continue;
        }
        let kind = record.zygosity.parse::<ZygosityKind>().map_err(|_| {
            anyhow::anyhow!(
                "unknown zygosity {:?} for hint term {:?}",
                &record.zygosity,
                &record.term
            )
        })?;
        table.insert(&record.term, kind);
    }
    Ok(table)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use crate::genotype::zygosity::ZygosityKind;

    fn write_tmp(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn genotype_rows_parses_optional_fields() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_tmp(
            &dir,
            "features.tsv",
            "# comment line\n\
             genotype_key\tgenotype_label\tgene_id\tgene_symbol\tallele_id\tallele_label\tzygosity\n\
             ZFIN:G1\tg1\tGENE:A\tgeneA\tALLELE:a1\ta1label\thomozygous\n\
             ZFIN:G2\t\t\t\tALLELE:x\t\t\n",
        );

        let rows = super::genotype_rows(&path)?.collect::<Result<Vec<_>, _>>()?;

        assert_eq!(2, rows.len());
        assert_eq!("ZFIN:G1", rows[0].genotype_key);
        assert_eq!(Some("geneA"), rows[0].gene_symbol.as_deref());
        assert_eq!(Some("homozygous"), rows[0].zygosity.as_deref());
        // Absent columns and empty fields both come back as `None`.
        assert_eq!(None, rows[0].background_id);
        assert_eq!(None, rows[1].gene_id);
        assert_eq!(None, rows[1].zygosity);
        assert_eq!("ALLELE:x", rows[1].allele_id);

        Ok(())
    }

    #[test]
    fn load_backgrounds_skips_incomplete_records() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_tmp(
            &dir,
            "backgrounds.tsv",
            "genotype_id\tbackground_id\tbackground_label\ttaxon_id\n\
             ZFIN:G1\tSTRAIN:bg1\tbgLabel\tNCBITaxon:7955\n\
             \tSTRAIN:bg2\torphan\t\n",
        );

        let catalog = super::load_backgrounds(&path)?;

        assert_eq!(1, catalog.len());
        let info = catalog.get("ZFIN:G1").unwrap();
        assert_eq!("STRAIN:bg1", info.background_id);
        assert_eq!(Some("bgLabel"), info.background_label.as_deref());
        assert_eq!(Some("NCBITaxon:7955"), info.taxon_id.as_deref());

        Ok(())
    }

    #[test]
    fn load_reagents_merges_multi_target_records() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_tmp(
            &dir,
            "reagents.tsv",
            "reagent_id\treagent_label\tconcentration\tgene_id\tgene_symbol\n\
             ZFIN:MO1\tMO1-shha\t2 ng\tZFIN:GENE-shha\tshha\n\
             ZFIN:MO1\tMO1-shha\t2 ng\tZFIN:GENE-shhb\tshhb\n",
        );

        let catalog = super::load_reagents(&path)?;

        assert_eq!(1, catalog.len());
        let info = catalog.get("ZFIN:MO1").unwrap();
        assert_eq!(Some("MO1-shha"), info.label.as_deref());
        assert_eq!(2, info.targets.len());
        assert_eq!("ZFIN:GENE-shhb", info.targets[1].id);

        Ok(())
    }

    #[test]
    fn load_hints_extends_the_builtin_table() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_tmp(
            &dir,
            "hints.tsv",
            "term\tzygosity\n\
             complex\tindeterminate\n\
             maternal\theteroplasmic\n",
        );

        let table = super::load_hints(&path)?;

        assert_eq!(Some(ZygosityKind::Indeterminate), table.get("complex"));
        assert_eq!(Some(ZygosityKind::Heteroplasmic), table.get("maternal"));
        // Built-in vocabulary stays available.
        assert_eq!(Some(ZygosityKind::Homozygous), table.get("homozygous"));

        Ok(())
    }

    #[test]
    fn load_hints_rejects_unknown_zygosity_names() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = write_tmp(&dir, "hints.tsv", "term\tzygosity\nweird\tnot_a_kind\n");

        assert!(super::load_hints(&path).is_err());

        Ok(())
    }
}
