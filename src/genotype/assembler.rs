//! Streaming assembly of genotype rows into the output graph.

use indexmap::{IndexMap, IndexSet};

use crate::genotype::builder::GenotypePartBuilder;
use crate::genotype::extrinsic;
use crate::genotype::labels;
use crate::genotype::schema::{
    AssemblyStats, BackgroundCatalog, BackgroundInfo, EntityKind, Error, GenotypeRow,
    LabelCatalog, Predicate, ReagentCatalog, SequenceAlterationType,
};
use crate::genotype::sink::GraphSink;
use crate::genotype::zygosity::HintTable;

/// Single-pass, single-threaded assembler.
///
/// Rows stream through [`GenotypeAssembler::consume_row`]; only the state of
/// genotypes still "open" is held.  In grouped mode (input sorted by
/// genotype) a genotype is flushed as soon as the next key appears, so
/// memory stays flat for arbitrarily large inputs.  [`GenotypeAssembler::finish`]
/// flushes whatever remains and returns the run's counters.
pub struct GenotypeAssembler<'a, S> {
    sink: &'a mut S,
    backgrounds: &'a BackgroundCatalog,
    reagents: &'a ReagentCatalog,
    hints: &'a HintTable,
    grouped: bool,

    labels: LabelCatalog,
    builders: IndexMap<String, GenotypePartBuilder>,
    reagents_by_genotype: IndexMap<String, IndexSet<String>>,
    row_backgrounds: IndexMap<String, String>,
    /// Content-addressed and background nodes already declared this run.
    declared: IndexSet<String>,
    genes_declared: IndexSet<String>,
    alleles_declared: IndexSet<String>,
    stats: AssemblyStats,
    line: u64,
}

impl<'a, S> GenotypeAssembler<'a, S>
where
    S: GraphSink,
{
    pub fn new(
        sink: &'a mut S,
        backgrounds: &'a BackgroundCatalog,
        reagents: &'a ReagentCatalog,
        hints: &'a HintTable,
    ) -> Self {
        Self {
            sink,
            backgrounds,
            reagents,
            hints,
            grouped: false,
            labels: LabelCatalog::default(),
            builders: IndexMap::new(),
            reagents_by_genotype: IndexMap::new(),
            row_backgrounds: IndexMap::new(),
            declared: IndexSet::new(),
            genes_declared: IndexSet::new(),
            alleles_declared: IndexSet::new(),
            stats: AssemblyStats::default(),
            line: 0,
        }
    }

    /// Enable eager flushing for inputs grouped by genotype key.
    pub fn grouped(mut self, grouped: bool) -> Self {
        self.grouped = grouped;
        self
    }

    /// Number of genotypes currently held open.
    pub fn open_genotypes(&self) -> usize {
        self.builders.len()
    }

    /// Record that one row could not be parsed at all.
    pub fn skip_malformed<E>(&mut self, error: E)
    where
        E: std::fmt::Display,
    {
        self.line += 1;
        self.stats.rows_read += 1;
        self.stats.rows_skipped += 1;
        tracing::warn!("skipping unparseable row {}: {}", self.line, error);
    }

    /// Consume one row, updating per-genotype state and declaring the
    /// gene/allele entities it mentions.
    pub fn consume_row(&mut self, row: &GenotypeRow) -> Result<(), anyhow::Error> {
        self.line += 1;
        self.stats.rows_read += 1;

        let genotype_key = row.genotype_key.trim().to_string();
        let allele_id = row.allele_id.trim().to_string();
        if genotype_key.is_empty() {
            self.skip_row("genotype_key");
            return Ok(());
        }
        if allele_id.is_empty() {
            self.skip_row("allele_id");
            return Ok(());
        }

        if self.grouped {
            let stale = self
                .builders
                .keys()
                .filter(|key| **key != genotype_key)
                .cloned()
                .collect::<Vec<_>>();
            for key in stale {
                self.flush_genotype(&key)?;
            }
        }

        let gene_id = normalize(row.gene_id.as_deref());
        let background_id = normalize(row.background_id.as_deref());
        let construct_id = normalize(row.construct_id.as_deref());
        let reagent_id = normalize(row.reagent_id.as_deref());

        // Labels learned from this row; recording is first-wins.
        if let Some(gene_id) = &gene_id {
            self.labels.record_gene(gene_id, row.gene_symbol.as_deref());
        }
        self.labels.record_allele(&allele_id, row.allele_label.as_deref());
        if let Some(background_id) = &background_id {
            self.row_backgrounds
                .entry(genotype_key.clone())
                .or_insert_with(|| background_id.clone());
        }
        // The genotype label is stored with its background already
        // embedded, so the effective-genotype path can reuse it verbatim.
        if !self.labels.has_genotype(&genotype_key) {
            if let Some(raw) = row.genotype_label.as_deref() {
                let background_label = self.background_of(&genotype_key).and_then(|info| {
                    info.background_label
                });
                let composed = labels::genotype_label(raw, background_label.as_deref());
                self.labels.record_genotype(&genotype_key, Some(&composed));
            }
        }

        // Gene and allele entities are declared on first mention.
        if let Some(gene_id) = &gene_id {
            if self.genes_declared.insert(gene_id.clone()) {
                self.sink
                    .declare(gene_id, row.gene_symbol.as_deref(), EntityKind::Gene)?;
            }
        }
        if self.alleles_declared.insert(allele_id.clone()) {
            let kind = allele_kind(row.allele_type.as_deref());
            self.sink
                .declare(&allele_id, row.allele_label.as_deref(), kind)?;
        }
        // Wiring is re-emitted whenever a row carries it; deduplication of
        // triples is the sink's responsibility, so an allele whose gene only
        // shows up on a later row still gets connected.
        if let Some(gene_id) = &gene_id {
            self.sink
                .relate(&allele_id, Predicate::IsAlleleOf, gene_id)?;
        }
        if let Some(construct_id) = &construct_id {
            self.sink.declare(
                construct_id,
                row.construct_label.as_deref(),
                EntityKind::Construct,
            )?;
            self.sink
                .relate(&allele_id, Predicate::DerivesFrom, construct_id)?;
        }

        self.builders
            .entry(genotype_key.clone())
            .or_insert_with(|| GenotypePartBuilder::new(&genotype_key))
            .add_allele(gene_id.as_deref(), &allele_id, row.zygosity.as_deref());

        if let Some(reagent_id) = reagent_id {
            self.reagents_by_genotype
                .entry(genotype_key)
                .or_default()
                .insert(reagent_id);
        }

        Ok(())
    }

    /// Flush all remaining genotypes and return the run's counters.
    pub fn finish(mut self) -> Result<AssemblyStats, anyhow::Error> {
        while let Some(key) = self.builders.keys().next().cloned() {
            self.flush_genotype(&key)?;
        }
        Ok(self.stats)
    }

    fn skip_row(&mut self, field: &'static str) {
        let error = Error::MalformedRow {
            line: self.line,
            field,
        };
        tracing::warn!("{}", &error);
        self.stats.tally(&error);
    }

    /// Resolve the background of a genotype, preferring the mapping table
    /// over row-supplied ids.
    fn background_of(&self, genotype_key: &str) -> Option<BackgroundInfo> {
        if let Some(info) = self.backgrounds.get(genotype_key) {
            return Some(info.clone());
        }
        self.row_backgrounds
            .get(genotype_key)
            .map(|background_id| BackgroundInfo {
                background_id: background_id.clone(),
                background_label: self.labels.background(background_id).map(str::to_string),
                taxon_id: None,
            })
    }

    /// Build and emit everything for one genotype: VSLCs, the GVC, the
    /// genotype itself with its background, and the extrinsic/effective
    /// path when reagents were applied.
    fn flush_genotype(&mut self, genotype_key: &str) -> Result<(), anyhow::Error> {
        let Some(builder) = self.builders.shift_remove(genotype_key) else {
            return Ok(());
        };

        let mut warnings = Vec::new();
        let vslcs = builder.build_vslcs(&self.labels, self.hints, &mut warnings);

        for vslc in &vslcs {
            if self.declared.insert(vslc.id.clone()) {
                self.sink.declare(
                    &vslc.id,
                    non_empty(&vslc.label),
                    EntityKind::VariantSingleLocusComplement,
                )?;
                self.sink
                    .relate(&vslc.id, Predicate::HasAlternatePart, &vslc.allele1_id)?;
                if let Some(allele2_id) = &vslc.allele2_id {
                    self.sink
                        .relate(&vslc.id, Predicate::HasAlternatePart, allele2_id)?;
                }
                self.sink
                    .relate(&vslc.id, Predicate::HasZygosity, vslc.zygosity.curie())?;
                self.stats.vslcs += 1;
            }
        }

        let gvc = (!vslcs.is_empty()).then(|| builder.build_gvc(&vslcs));
        if let Some(gvc) = &gvc {
            if self.declared.insert(gvc.id.clone()) {
                self.sink.declare(
                    &gvc.id,
                    non_empty(&gvc.label),
                    EntityKind::GenomicVariationComplement,
                )?;
                for vslc_id in &gvc.vslc_ids {
                    self.sink
                        .relate(&gvc.id, Predicate::HasAlternatePart, vslc_id)?;
                }
                self.stats.gvcs += 1;
            }
        }

        // The genotype label: source-supplied (already background-bracketed
        // at recording time), else composed from the GVC label.
        let background = self.background_of(genotype_key);
        if !self.labels.has_genotype(genotype_key) {
            let composed = gvc
                .as_ref()
                .and_then(|gvc| non_empty(&gvc.label))
                .map(|core| {
                    labels::genotype_label(
                        core,
                        background
                            .as_ref()
                            .and_then(|info| info.background_label.as_deref()),
                    )
                });
            match composed {
                Some(composed) => {
                    self.labels.record_genotype(genotype_key, Some(&composed));
                }
                None => warnings.push(Error::MissingLabel {
                    kind: "genotype",
                    id: genotype_key.to_string(),
                }),
            }
        }
        let genotype_label = self.labels.genotype(genotype_key).map(str::to_string);

        self.sink.declare(
            genotype_key,
            genotype_label.as_deref(),
            EntityKind::IntrinsicGenotype,
        )?;
        self.stats.genotypes += 1;
        if let Some(gvc) = &gvc {
            self.sink
                .relate(genotype_key, Predicate::HasAlternatePart, &gvc.id)?;
        }

        if let Some(background) = &background {
            if self.declared.insert(background.background_id.clone()) {
                self.sink.declare(
                    &background.background_id,
                    background.background_label.as_deref(),
                    EntityKind::GenomicBackground,
                )?;
            }
            self.sink.relate(
                genotype_key,
                Predicate::HasReferencePart,
                &background.background_id,
            )?;
            if let Some(taxon_id) = &background.taxon_id {
                self.sink.declare(taxon_id, None, EntityKind::Taxon)?;
                self.sink
                    .relate(&background.background_id, Predicate::InTaxon, taxon_id)?;
            }
        }

        if let Some(reagent_ids) = self.reagents_by_genotype.shift_remove(genotype_key) {
            let reagent_ids = reagent_ids.into_iter().collect::<Vec<_>>();
            self.flush_extrinsic(genotype_key, &reagent_ids, &mut warnings)?;
        }

        for warning in &warnings {
            tracing::warn!("{}", warning);
            self.stats.tally(warning);
        }

        Ok(())
    }

    /// Emit the extrinsic path for one genotype plus the effective genotype
    /// composing the two.
    fn flush_extrinsic(
        &mut self,
        genotype_key: &str,
        reagent_ids: &[String],
        warnings: &mut Vec<Error>,
    ) -> Result<(), anyhow::Error> {
        let built = extrinsic::build(reagent_ids, self.reagents, warnings);

        if self.declared.insert(built.genotype_id.clone()) {
            self.sink.declare(
                &built.genotype_id,
                built.genotype_label.as_deref(),
                EntityKind::ExtrinsicGenotype,
            )?;
            self.stats.extrinsic_genotypes += 1;
        }

        for subregion in &built.subregions {
            if self.declared.insert(subregion.id.clone()) {
                self.sink.declare(
                    &subregion.id,
                    non_empty(&subregion.label),
                    EntityKind::TargetedGeneSubregion,
                )?;
                self.sink
                    .relate(&subregion.id, Predicate::HasAlternatePart, &subregion.reagent_id)?;
            }
            for targeted in &subregion.targeted {
                if self.genes_declared.insert(targeted.gene_id.clone()) {
                    self.sink.declare(
                        &targeted.gene_id,
                        targeted.gene_label.as_deref(),
                        EntityKind::Gene,
                    )?;
                }
                if self.declared.insert(targeted.id.clone()) {
                    self.sink.declare(
                        &targeted.id,
                        non_empty(&targeted.label),
                        EntityKind::ReagentTargetedGene,
                    )?;
                    self.sink
                        .relate(&targeted.id, Predicate::HasAlternatePart, &subregion.id)?;
                    self.sink
                        .relate(&targeted.id, Predicate::IsAlleleOf, &targeted.gene_id)?;
                }
            }
        }

        if let Some(complement) = &built.complement {
            if self.declared.insert(complement.id.clone()) {
                self.sink.declare(
                    &complement.id,
                    non_empty(&complement.label),
                    EntityKind::TargetedGeneComplement,
                )?;
                for targeted_id in &complement.targeted_ids {
                    self.sink
                        .relate(&complement.id, Predicate::HasAlternatePart, targeted_id)?;
                }
            }
            self.sink.relate(
                &built.genotype_id,
                Predicate::HasAlternatePart,
                &complement.id,
            )?;
        }

        let (effective_id, effective_label) = extrinsic::effective_genotype(
            genotype_key,
            self.labels.genotype(genotype_key),
            &built,
            warnings,
        );
        if self.declared.insert(effective_id.clone()) {
            self.sink.declare(
                &effective_id,
                non_empty(&effective_label),
                EntityKind::EffectiveGenotype,
            )?;
            self.sink
                .relate(&effective_id, Predicate::HasAlternatePart, genotype_key)?;
            self.sink
                .relate(&effective_id, Predicate::HasAlternatePart, &built.genotype_id)?;
            self.stats.effective_genotypes += 1;
        }

        Ok(())
    }
}

/// Map a source allele type term to the entity kind of the allele node.
fn allele_kind(allele_type: Option<&str>) -> EntityKind {
    match allele_type.map(str::trim).filter(|t| !t.is_empty()) {
        None => EntityKind::Allele,
        Some(term) => match term.parse::<SequenceAlterationType>() {
            Ok(alteration) => EntityKind::SequenceAlteration(alteration),
            Err(_) => {
                tracing::warn!(
                    "sequence alteration type {:?} not mapped; using the generic class",
                    term
                );
                EntityKind::SequenceAlteration(SequenceAlterationType::Unspecified)
            }
        },
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn non_empty(label: &str) -> Option<&str> {
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}
