//! Core data model for genotype graph construction.

use indexmap::IndexMap;

/// One normalized input row as produced by an upstream source adapter.
///
/// Each row describes one allele observation within one genotype.  The exact
/// file format behind it (genotype-features table, allele-pair table, chado
/// dump) is the adapter's business; by the time a row reaches the assembler
/// it has this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct GenotypeRow {
    /// Identifier of the genotype the row belongs to.
    pub genotype_key: String,
    /// Source-supplied genotype label, if any.
    pub genotype_label: Option<String>,
    /// Identifier of the affected gene; absent when the source only knows
    /// the sequence alteration.
    pub gene_id: Option<String>,
    /// Symbol of the affected gene.
    pub gene_symbol: Option<String>,
    /// Identifier of the allele observed at the locus.
    pub allele_id: String,
    /// Label of the allele.
    pub allele_label: Option<String>,
    /// Source vocabulary term for the sequence alteration type.
    pub allele_type: Option<String>,
    /// Zygosity hint from the source's controlled vocabulary.
    pub zygosity: Option<String>,
    /// Genomic background of the genotype, when the source carries it on
    /// the row instead of in a separate mapping table.
    pub background_id: Option<String>,
    /// Transgenic construct the allele derives from.
    pub construct_id: Option<String>,
    /// Label of the construct.
    pub construct_label: Option<String>,
    /// Knockdown reagent applied to this genotype (morpholino, TALEN,
    /// CRISPR); triggers the extrinsic path.
    pub reagent_id: Option<String>,
}

/// Relationship vocabulary emitted by the assembler.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Predicate {
    /// Composition of genotype/GVC/VSLC down to the variant parts.
    HasAlternatePart,
    /// Genotype to its genomic background.
    HasReferencePart,
    /// Allele (or reagent-targeted gene) to the gene it varies.
    IsAlleleOf,
    /// Strain to taxon.
    InTaxon,
    /// Allele to the transgenic construct it derives from.
    DerivesFrom,
    /// VSLC to its zygosity classification.
    HasZygosity,
}

impl Predicate {
    /// The CURIE this predicate serializes to.
    pub fn curie(&self) -> &'static str {
        match self {
            Predicate::HasAlternatePart => "GENO:0000382",
            Predicate::HasReferencePart => "GENO:0000385",
            Predicate::IsAlleleOf => "GENO:0000408",
            Predicate::InTaxon => "RO:0002162",
            Predicate::DerivesFrom => "RO:0001000",
            Predicate::HasZygosity => "GENO:0000608",
        }
    }
}

/// Sequence alteration classification, shared by all source adapters.
///
/// The variants spell the upstream vocabulary (`strum::EnumString` parses
/// the snake_case source terms directly).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum SequenceAlterationType {
    ComplexSubstitution,
    Deficiency,
    Deletion,
    Indel,
    Insertion,
    PointMutation,
    SequenceVariant,
    TransgenicInsertion,
    TransgenicUnspecified,
    Transloc,
    Unspecified,
}

impl SequenceAlterationType {
    /// The SO class this alteration type maps to.
    pub fn curie(&self) -> &'static str {
        match self {
            SequenceAlterationType::ComplexSubstitution => "SO:1000005",
            SequenceAlterationType::Deficiency => "SO:1000029",
            SequenceAlterationType::Deletion => "SO:0000159",
            SequenceAlterationType::Indel => "SO:1000032",
            SequenceAlterationType::Insertion => "SO:0000667",
            SequenceAlterationType::PointMutation => "SO:1000008",
            SequenceAlterationType::SequenceVariant => "SO:0001060",
            SequenceAlterationType::TransgenicInsertion => "SO:0001218",
            SequenceAlterationType::TransgenicUnspecified => "SO:0000781",
            SequenceAlterationType::Transloc => "SO:0000199",
            SequenceAlterationType::Unspecified => "SO:0001059",
        }
    }
}

/// Entity classification for graph declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Gene,
    /// Allele with no source-supplied alteration type.
    Allele,
    /// Allele typed by its sequence alteration classification.
    SequenceAlteration(SequenceAlterationType),
    VariantSingleLocusComplement,
    GenomicVariationComplement,
    IntrinsicGenotype,
    ExtrinsicGenotype,
    EffectiveGenotype,
    GenomicBackground,
    TargetedGeneSubregion,
    ReagentTargetedGene,
    TargetedGeneComplement,
    Construct,
    Taxon,
}

impl EntityKind {
    /// Short tag naming the kind in dumps.
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Gene => "gene",
            EntityKind::Allele => "allele",
            EntityKind::SequenceAlteration(_) => "sequence_alteration",
            EntityKind::VariantSingleLocusComplement => "variant_single_locus_complement",
            EntityKind::GenomicVariationComplement => "genomic_variation_complement",
            EntityKind::IntrinsicGenotype => "intrinsic_genotype",
            EntityKind::ExtrinsicGenotype => "extrinsic_genotype",
            EntityKind::EffectiveGenotype => "effective_genotype",
            EntityKind::GenomicBackground => "genomic_background",
            EntityKind::TargetedGeneSubregion => "targeted_gene_subregion",
            EntityKind::ReagentTargetedGene => "reagent_targeted_gene",
            EntityKind::TargetedGeneComplement => "targeted_gene_complement",
            EntityKind::Construct => "construct",
            EntityKind::Taxon => "taxon",
        }
    }

    /// The GENO/SO class this kind maps to.
    pub fn curie(&self) -> &'static str {
        match self {
            EntityKind::Gene => "SO:0000704",
            EntityKind::Allele => "GENO:0000008",
            EntityKind::SequenceAlteration(t) => t.curie(),
            EntityKind::VariantSingleLocusComplement => "GENO:0000030",
            EntityKind::GenomicVariationComplement => "GENO:0000009",
            EntityKind::IntrinsicGenotype => "GENO:0000000",
            EntityKind::ExtrinsicGenotype => "GENO:0000524",
            EntityKind::EffectiveGenotype => "GENO:0000525",
            EntityKind::GenomicBackground => "GENO:0000010",
            EntityKind::TargetedGeneSubregion => "GENO:0000534",
            EntityKind::ReagentTargetedGene => "GENO:0000504",
            EntityKind::TargetedGeneComplement => "GENO:0000527",
            EntityKind::Construct => "SO:0000902",
            EntityKind::Taxon => "owl:Class",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Labels learned while streaming rows, keyed by entity identifier.
///
/// This is explicit state threaded through the builder instead of the
/// per-parser instance-wide label dictionaries the upstream sources used.
/// Recording is first-wins, mirroring how the sources populated their
/// hashes.
#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
    genes: IndexMap<String, String>,
    alleles: IndexMap<String, String>,
    genotypes: IndexMap<String, String>,
    backgrounds: IndexMap<String, String>,
}

impl LabelCatalog {
    pub fn record_gene(&mut self, id: &str, label: Option<&str>) {
        if let Some(label) = label {
            self.genes
                .entry(id.to_string())
                .or_insert_with(|| label.to_string());
        }
    }

    pub fn record_allele(&mut self, id: &str, label: Option<&str>) {
        if let Some(label) = label {
            self.alleles
                .entry(id.to_string())
                .or_insert_with(|| label.to_string());
        }
    }

    pub fn record_genotype(&mut self, id: &str, label: Option<&str>) {
        if let Some(label) = label {
            self.genotypes
                .entry(id.to_string())
                .or_insert_with(|| label.to_string());
        }
    }

    pub fn record_background(&mut self, id: &str, label: Option<&str>) {
        if let Some(label) = label {
            self.backgrounds
                .entry(id.to_string())
                .or_insert_with(|| label.to_string());
        }
    }

    pub fn gene(&self, id: &str) -> Option<&str> {
        self.genes.get(id).map(String::as_str)
    }

    pub fn allele(&self, id: &str) -> Option<&str> {
        self.alleles.get(id).map(String::as_str)
    }

    pub fn genotype(&self, id: &str) -> Option<&str> {
        self.genotypes.get(id).map(String::as_str)
    }

    pub fn background(&self, id: &str) -> Option<&str> {
        self.backgrounds.get(id).map(String::as_str)
    }

    pub fn has_genotype(&self, id: &str) -> bool {
        self.genotypes.contains_key(id)
    }
}

/// Genomic background of one genotype, from the background mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundInfo {
    /// Identifier of the background strain (itself a genotype upstream).
    pub background_id: String,
    /// Label of the background strain.
    pub background_label: Option<String>,
    /// Taxon of the background strain.
    pub taxon_id: Option<String>,
}

/// Lookup of genomic backgrounds keyed by genotype identifier.
#[derive(Debug, Clone, Default)]
pub struct BackgroundCatalog {
    entries: IndexMap<String, BackgroundInfo>,
}

impl BackgroundCatalog {
    pub fn insert(&mut self, genotype_id: &str, info: BackgroundInfo) {
        self.entries
            .entry(genotype_id.to_string())
            .or_insert(info);
    }

    pub fn get(&self, genotype_id: &str) -> Option<&BackgroundInfo> {
        self.entries.get(genotype_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A gene targeted by a knockdown reagent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneRef {
    pub id: String,
    pub label: Option<String>,
}

/// What is known about one knockdown reagent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReagentInfo {
    /// Label of the reagent.
    pub label: Option<String>,
    /// Applied concentration, already formatted (e.g. `"2 ng"`).
    pub concentration: Option<String>,
    /// Genes the reagent targets.
    pub targets: Vec<GeneRef>,
}

/// Lookup of knockdown reagents keyed by reagent identifier.
#[derive(Debug, Clone, Default)]
pub struct ReagentCatalog {
    entries: IndexMap<String, ReagentInfo>,
}

impl ReagentCatalog {
    pub fn entry(&mut self, reagent_id: &str) -> &mut ReagentInfo {
        self.entries.entry(reagent_id.to_string()).or_default()
    }

    pub fn get(&self, reagent_id: &str) -> Option<&ReagentInfo> {
        self.entries.get(reagent_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Non-fatal problems encountered while assembling.
///
/// None of these abort a run; the assembler logs them, degrades the affected
/// record, and tallies them into [`AssemblyStats`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("row {line} is missing required field `{field}`")]
    MalformedRow { line: u64, field: &'static str },
    #[error("zygosity hint {hint:?} is not in the recognized vocabulary")]
    UnmappedZygosityHint { hint: String },
    #[error("locus {locus} of genotype {genotype} has {count} alleles; keeping the first two")]
    TooManyAlleles {
        genotype: String,
        locus: String,
        count: usize,
    },
    #[error("no label material for {kind} {id}")]
    MissingLabel { kind: &'static str, id: String },
}

/// Counters surfaced to the caller after a full run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AssemblyStats {
    /// Rows seen, including skipped ones.
    pub rows_read: usize,
    /// Rows skipped as malformed.
    pub rows_skipped: usize,
    /// Zygosity hints outside the recognized vocabulary.
    pub unmapped_hints: usize,
    /// Loci truncated to two alleles.
    pub truncated_loci: usize,
    /// Entities emitted with an empty label.
    pub missing_labels: usize,
    /// Intrinsic genotypes written.
    pub genotypes: usize,
    /// Distinct VSLCs written.
    pub vslcs: usize,
    /// Distinct GVCs written.
    pub gvcs: usize,
    /// Extrinsic genotypes written.
    pub extrinsic_genotypes: usize,
    /// Effective genotypes written.
    pub effective_genotypes: usize,
}

impl AssemblyStats {
    /// Tally one non-fatal error into the matching counter.
    pub fn tally(&mut self, error: &Error) {
        match error {
            Error::MalformedRow { .. } => self.rows_skipped += 1,
            Error::UnmappedZygosityHint { .. } => self.unmapped_hints += 1,
            Error::TooManyAlleles { .. } => self.truncated_loci += 1,
            Error::MissingLabel { .. } => self.missing_labels += 1,
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case(Predicate::HasAlternatePart, "has_alternate_part", "GENO:0000382")]
    #[case(Predicate::HasReferencePart, "has_reference_part", "GENO:0000385")]
    #[case(Predicate::IsAlleleOf, "is_allele_of", "GENO:0000408")]
    #[case(Predicate::InTaxon, "in_taxon", "RO:0002162")]
    #[case(Predicate::DerivesFrom, "derives_from", "RO:0001000")]
    #[case(Predicate::HasZygosity, "has_zygosity", "GENO:0000608")]
    fn predicate_tags_and_curies(
        #[case] predicate: Predicate,
        #[case] tag: &str,
        #[case] curie: &str,
    ) {
        assert_eq!(tag, predicate.to_string());
        assert_eq!(curie, predicate.curie());
    }

    #[rstest::rstest]
    #[case("complex_substitution", "SO:1000005")]
    #[case("deletion", "SO:0000159")]
    #[case("point_mutation", "SO:1000008")]
    #[case("transgenic_insertion", "SO:0001218")]
    #[case("unspecified", "SO:0001059")]
    fn sequence_alteration_type_from_source_vocab(#[case] term: &str, #[case] curie: &str) {
        let alteration = SequenceAlterationType::from_str(term).unwrap();
        assert_eq!(curie, alteration.curie());
    }

    #[test]
    fn sequence_alteration_type_unmapped_term() {
        assert!(SequenceAlterationType::from_str("inversion_maybe").is_err());
    }

    #[test]
    fn entity_kind_of_typed_allele() {
        let kind = EntityKind::SequenceAlteration(SequenceAlterationType::PointMutation);
        assert_eq!("sequence_alteration", kind.tag());
        assert_eq!("SO:1000008", kind.curie());
    }

    #[test]
    fn label_catalog_is_first_wins() {
        let mut catalog = LabelCatalog::default();
        catalog.record_gene("ZFIN:G1", Some("shha"));
        catalog.record_gene("ZFIN:G1", Some("renamed"));
        catalog.record_gene("ZFIN:G2", None);

        assert_eq!(Some("shha"), catalog.gene("ZFIN:G1"));
        assert_eq!(None, catalog.gene("ZFIN:G2"));
    }

    #[test]
    fn stats_tally() {
        let mut stats = AssemblyStats::default();
        stats.tally(&Error::UnmappedZygosityHint {
            hint: "complex".into(),
        });
        stats.tally(&Error::MissingLabel {
            kind: "VSLC",
            id: "MONARCH:x".into(),
        });

        assert_eq!(1, stats.unmapped_hints);
        assert_eq!(1, stats.missing_labels);
    }
}
