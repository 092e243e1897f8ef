//! Aggregation of per-row allele records into VSLC/GVC structures.
//!
//! One `GenotypePartBuilder` holds the state of one genotype under
//! construction: for every locus, the ordered list of allele identifiers
//! seen so far.  The state is explicit and owned by the assembler for the
//! duration of one run; nothing here touches the sink.

use indexmap::{IndexMap, IndexSet};

use crate::genotype::ids;
use crate::genotype::labels;
use crate::genotype::schema::{Error, LabelCatalog};
use crate::genotype::zygosity::{self, HintTable, ZygosityKind, UNKNOWN_ALLELE};

/// Hint values with a structural meaning at collection time; everything
/// else is resolved against the hint vocabulary when the VSLC is built.
const HINT_HOMOZYGOUS: &str = "homozygous";
const HINT_UNKNOWN: &str = "unknown";

/// State of one locus within one genotype under construction.
#[derive(Debug, Clone, Default)]
struct LocusState {
    /// Gene at the locus; `None` when the source only knows the allele.
    gene_id: Option<String>,
    /// Allele identifiers in row order, including the homozygous
    /// duplication and the `?` unknown sentinel.
    alleles: Vec<String>,
    /// First zygosity hint seen for the locus.
    hint: Option<String>,
}

/// A constructed variant single locus complement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vslc {
    pub id: String,
    /// Composed label; empty when no label material was available.
    pub label: String,
    pub gene_id: Option<String>,
    pub allele1_id: String,
    pub allele2_id: Option<String>,
    pub zygosity: ZygosityKind,
}

/// A constructed genomic variation complement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gvc {
    pub id: String,
    pub label: String,
    /// Constituent VSLCs in discovery order.
    pub vslc_ids: Vec<String>,
}

/// Per-genotype aggregation state.
#[derive(Debug, Clone, Default)]
pub struct GenotypePartBuilder {
    genotype_key: String,
    loci: IndexMap<String, LocusState>,
}

impl GenotypePartBuilder {
    pub fn new(genotype_key: &str) -> Self {
        Self {
            genotype_key: genotype_key.to_string(),
            ..Default::default()
        }
    }

    pub fn genotype_key(&self) -> &str {
        &self.genotype_key
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    /// Record one allele observation for the locus of `gene_id` (or of the
    /// allele itself when the gene is unknown).
    ///
    /// A `homozygous` hint appends the allele a second time and an
    /// `unknown` hint appends the `?` sentinel -- the source convention for
    /// representing those states as a pair list.  All other hint values are
    /// kept for the resolver and not treated specially here.
    pub fn add_allele(&mut self, gene_id: Option<&str>, allele_id: &str, hint: Option<&str>) {
        let locus_key = gene_id.unwrap_or(allele_id).to_string();
        let locus = self.loci.entry(locus_key).or_default();
        if locus.gene_id.is_none() {
            locus.gene_id = gene_id.map(str::to_string);
        }

        locus.alleles.push(allele_id.to_string());
        match hint {
            Some(HINT_HOMOZYGOUS) => locus.alleles.push(allele_id.to_string()),
            Some(HINT_UNKNOWN) => locus.alleles.push(UNKNOWN_ALLELE.to_string()),
            _ => (),
        }
        if locus.hint.is_none() {
            locus.hint = hint.filter(|h| !h.trim().is_empty()).map(str::to_string);
        }
    }

    /// Build one VSLC per locus, in locus discovery order.
    ///
    /// The identifier is content-addressed from `(gene-or-empty, allele1,
    /// allele2-or-empty)`, so identical locus states across genotypes
    /// collapse onto the same id; the caller deduplicates emission.
    /// Non-fatal problems are pushed onto `warnings`.
    pub fn build_vslcs(
        &self,
        catalog: &LabelCatalog,
        hints: &HintTable,
        warnings: &mut Vec<Error>,
    ) -> Vec<Vslc> {
        let mut result = Vec::with_capacity(self.loci.len());

        for (locus_key, locus) in &self.loci {
            let mut entries = locus.alleles.clone();
            if entries.len() > 2 {
                warnings.push(Error::TooManyAlleles {
                    genotype: self.genotype_key.clone(),
                    locus: locus_key.clone(),
                    count: entries.len(),
                });
                entries.truncate(2);
            }

            let allele1_id = entries[0].clone();
            let allele2_raw = entries.get(1).cloned();
            let unknown_second = allele2_raw.as_deref() == Some(UNKNOWN_ALLELE);
            let allele2_id = allele2_raw.clone().filter(|_| !unknown_second);

            let zygosity = match zygosity::resolve_with_hint(
                hints,
                locus.hint.as_deref(),
                &allele1_id,
                allele2_raw.as_deref(),
            ) {
                Ok(zygosity) => zygosity,
                Err(error) => {
                    warnings.push(error);
                    ZygosityKind::Indeterminate
                }
            };

            let id = ids::make_id(&[
                locus.gene_id.as_deref().unwrap_or(""),
                &allele1_id,
                allele2_id.as_deref().unwrap_or(""),
            ]);

            let gene_label = locus.gene_id.as_deref().and_then(|g| catalog.gene(g));
            let allele1_label = catalog.allele(&allele1_id);
            // An unknown second allele keeps the `?` as its displayed label
            // even though it contributes nothing to the identifier.
            let allele2_label = if unknown_second {
                Some(UNKNOWN_ALLELE)
            } else {
                allele2_id.as_deref().and_then(|a| catalog.allele(a))
            };

            let label = match labels::vslc_label(gene_label, allele1_label, allele2_label) {
                Some(label) => label,
                None => {
                    warnings.push(Error::MissingLabel {
                        kind: "VSLC",
                        id: id.clone(),
                    });
                    String::new()
                }
            };

            result.push(Vslc {
                id,
                label,
                gene_id: locus.gene_id.clone(),
                allele1_id,
                allele2_id,
                zygosity,
            });
        }

        result
    }

    /// Build the GVC over the given VSLCs.
    ///
    /// The identifier hashes the VSLC ids in discovery order, not sorted;
    /// the label joins the VSLC labels in the same order.
    pub fn build_gvc(&self, vslcs: &[Vslc]) -> Gvc {
        let mut vslc_ids = IndexSet::new();
        let mut vslc_labels = Vec::new();
        for vslc in vslcs {
            if vslc_ids.insert(vslc.id.clone()) {
                vslc_labels.push(vslc.label.as_str());
            }
        }

        let id_parts = vslc_ids.iter().map(String::as_str).collect::<Vec<_>>();
        Gvc {
            id: ids::make_id(&id_parts),
            label: labels::gvc_label(vslc_labels),
            vslc_ids: vslc_ids.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::genotype::ids;
    use crate::genotype::schema::{Error, LabelCatalog};
    use crate::genotype::zygosity::{HintTable, ZygosityKind};

    use super::GenotypePartBuilder;

    fn catalog() -> LabelCatalog {
        let mut catalog = LabelCatalog::default();
        catalog.record_gene("GENE:A", Some("geneA"));
        catalog.record_allele("ALLELE:a1", Some("a1label"));
        catalog.record_allele("ALLELE:a2", Some("a2label"));
        catalog
    }

    #[test]
    fn heterozygous_pair_builds_one_vslc() {
        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(Some("GENE:A"), "ALLELE:a1", Some("heterozygous"));
        builder.add_allele(Some("GENE:A"), "ALLELE:a2", Some("heterozygous"));

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);

        assert_eq!(1, vslcs.len());
        assert_eq!("geneA<a1label>/geneA<a2label>", vslcs[0].label);
        assert_eq!(ZygosityKind::Heterozygous, vslcs[0].zygosity);
        assert_eq!("ALLELE:a1", vslcs[0].allele1_id);
        assert_eq!(Some("ALLELE:a2".to_string()), vslcs[0].allele2_id);
        assert_eq!(
            ids::make_id(&["GENE:A", "ALLELE:a1", "ALLELE:a2"]),
            vslcs[0].id
        );
        assert_eq!(Vec::<Error>::new(), warnings);
    }

    #[test]
    fn homozygous_hint_duplicates_the_allele() {
        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(Some("GENE:A"), "ALLELE:a1", Some("homozygous"));

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);

        assert_eq!(1, vslcs.len());
        assert_eq!("geneA<a1label>/geneA<a1label>", vslcs[0].label);
        assert_eq!(ZygosityKind::Homozygous, vslcs[0].zygosity);
        assert_eq!(Some("ALLELE:a1".to_string()), vslcs[0].allele2_id);
    }

    #[test]
    fn unknown_hint_keeps_the_sentinel_label() {
        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(Some("GENE:A"), "ALLELE:a1", Some("unknown"));

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);

        assert_eq!(1, vslcs.len());
        // The sentinel shows up in the label but not in the identifier.
        assert_eq!("geneA<a1label>/geneA<?>", vslcs[0].label);
        assert_eq!(ZygosityKind::Indeterminate, vslcs[0].zygosity);
        assert_eq!(None, vslcs[0].allele2_id);
        assert_eq!(ids::make_id(&["GENE:A", "ALLELE:a1", ""]), vslcs[0].id);
    }

    #[test]
    fn unknown_gene_keys_the_locus_by_allele() {
        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(None, "ALLELE:a1", None);

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);

        assert_eq!(1, vslcs.len());
        assert_eq!("<a1label>", vslcs[0].label);
        assert_eq!(None, vslcs[0].gene_id);
        assert_eq!(ids::make_id(&["", "ALLELE:a1", ""]), vslcs[0].id);
    }

    #[test]
    fn more_than_two_alleles_truncates_with_warning() {
        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(Some("GENE:A"), "ALLELE:a1", None);
        builder.add_allele(Some("GENE:A"), "ALLELE:a2", None);
        builder.add_allele(Some("GENE:A"), "ALLELE:a3", None);

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);

        assert_eq!(1, vslcs.len());
        assert_eq!(ZygosityKind::Heterozygous, vslcs[0].zygosity);
        assert_eq!(Some("ALLELE:a2".to_string()), vslcs[0].allele2_id);
        assert_eq!(
            vec![Error::TooManyAlleles {
                genotype: "ZFIN:G1".into(),
                locus: "GENE:A".into(),
                count: 3,
            }],
            warnings
        );
    }

    #[test]
    fn missing_labels_yield_empty_label_and_warning() {
        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(Some("GENE:X"), "ALLELE:x9", None);

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&LabelCatalog::default(), &HintTable::default(), &mut warnings);

        assert_eq!(1, vslcs.len());
        assert_eq!("", vslcs[0].label);
        assert_eq!(1, warnings.len());
        assert!(matches!(warnings[0], Error::MissingLabel { kind: "VSLC", .. }));
    }

    #[test]
    fn identical_locus_state_yields_identical_vslc_id_across_genotypes() {
        let mut warnings = Vec::new();

        let mut first = GenotypePartBuilder::new("ZFIN:G1");
        first.add_allele(Some("GENE:A"), "ALLELE:a1", Some("homozygous"));
        let first_vslcs = first.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);

        let mut second = GenotypePartBuilder::new("ZFIN:G2");
        second.add_allele(Some("GENE:A"), "ALLELE:a1", Some("homozygous"));
        let second_vslcs = second.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);

        assert_eq!(first_vslcs[0].id, second_vslcs[0].id);
        assert_eq!(Vec::<Error>::new(), warnings);
    }

    #[test]
    fn gvc_hashes_vslc_ids_in_discovery_order() {
        let mut catalog = catalog();
        catalog.record_gene("GENE:B", Some("geneB"));
        catalog.record_allele("ALLELE:b1", Some("b1label"));

        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(Some("GENE:B"), "ALLELE:b1", None);
        builder.add_allele(Some("GENE:A"), "ALLELE:a1", None);

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&catalog, &HintTable::default(), &mut warnings);
        let gvc = builder.build_gvc(&vslcs);

        assert_eq!(vec![vslcs[0].id.clone(), vslcs[1].id.clone()], gvc.vslc_ids);
        assert_eq!(
            ids::make_id(&[&vslcs[0].id, &vslcs[1].id]),
            gvc.id
        );
        assert_eq!("geneB<b1label>; geneA<a1label>", gvc.label);
    }

    #[test]
    fn single_vslc_gvc_label_is_the_vslc_label() {
        let mut builder = GenotypePartBuilder::new("ZFIN:G1");
        builder.add_allele(Some("GENE:A"), "ALLELE:a1", Some("heterozygous"));
        builder.add_allele(Some("GENE:A"), "ALLELE:a2", Some("heterozygous"));

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&catalog(), &HintTable::default(), &mut warnings);
        let gvc = builder.build_gvc(&vslcs);

        assert_eq!(vslcs[0].label, gvc.label);
    }
}
