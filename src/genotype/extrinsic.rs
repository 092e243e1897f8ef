//! Reagent-targeted ("extrinsic") genotype construction.
//!
//! The extrinsic path mirrors the intrinsic one with reagent targets in
//! place of alleles: one targeted gene subregion per reagent application,
//! one reagent-targeted gene per gene the reagent knocks down, and the
//! targeted gene complement collecting them, wrapped in an extrinsic
//! genotype.  An effective genotype composes the extrinsic genotype with
//! the intrinsic one it was applied to.

use indexmap::IndexSet;

use crate::genotype::ids;
use crate::genotype::labels;
use crate::genotype::schema::{Error, ReagentCatalog};

/// Placeholder identifier part for an unspecified concentration.
const CONCENTRATION_NOT_SPECIFIED: &str = "ns";

/// One reagent-targeted gene (the extrinsic analogue of a variant locus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedGene {
    pub id: String,
    pub label: String,
    pub gene_id: String,
    pub gene_label: Option<String>,
}

/// The subregion targeted by one reagent at one concentration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedSubregion {
    pub id: String,
    pub label: String,
    pub reagent_id: String,
    pub targeted: Vec<TargetedGene>,
}

/// The targeted gene complement (extrinsic analogue of the GVC).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedComplement {
    pub id: String,
    pub label: String,
    /// Constituent targeted genes in discovery order.
    pub targeted_ids: Vec<String>,
}

/// The fully built extrinsic portion of a genotype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtrinsicComplement {
    /// Content-addressed identifier of the extrinsic genotype.
    pub genotype_id: String,
    /// Label of the extrinsic genotype (the complement label, when one
    /// could be composed).
    pub genotype_label: Option<String>,
    pub subregions: Vec<TargetedSubregion>,
    /// Absent when no reagent had resolvable targets.
    pub complement: Option<TargetedComplement>,
}

/// Build the extrinsic complement for one genotype from the reagents
/// applied to it, in application (discovery) order.
pub fn build(
    reagent_ids: &[String],
    reagents: &ReagentCatalog,
    warnings: &mut Vec<Error>,
) -> ExtrinsicComplement {
    let id_parts = reagent_ids.iter().map(String::as_str).collect::<Vec<_>>();
    let genotype_id = ids::make_id(&id_parts);

    let mut subregions = Vec::with_capacity(reagent_ids.len());
    let mut targeted_ids = IndexSet::new();
    let mut targeted_labels = IndexSet::new();

    for reagent_id in reagent_ids {
        let info = reagents.get(reagent_id);
        if info.is_none() {
            warnings.push(Error::MissingLabel {
                kind: "reagent",
                id: reagent_id.clone(),
            });
        }

        let reagent_label = info
            .and_then(|info| info.label.as_deref())
            .unwrap_or(reagent_id);
        let concentration = info.and_then(|info| info.concentration.as_deref());
        let subregion_label = labels::targeted_gene_subregion_label(reagent_label, concentration);

        let concentration_part = concentration.unwrap_or(CONCENTRATION_NOT_SPECIFIED);
        let targets = info.map(|info| info.targets.as_slice()).unwrap_or(&[]);

        let mut subregion_id_parts = vec![reagent_id.as_str(), concentration_part];
        subregion_id_parts.extend(targets.iter().map(|target| target.id.as_str()));
        let subregion_id = ids::make_id(&subregion_id_parts);

        let targeted = targets
            .iter()
            .map(|target| {
                let id = ids::make_id(&[&target.id, reagent_id, concentration_part]);
                let label =
                    labels::targeted_gene_variant_label(target.label.as_deref(), &subregion_label);
                targeted_ids.insert(id.clone());
                targeted_labels.insert(label.clone());
                TargetedGene {
                    id,
                    label,
                    gene_id: target.id.clone(),
                    gene_label: target.label.clone(),
                }
            })
            .collect();

        subregions.push(TargetedSubregion {
            id: subregion_id,
            label: subregion_label,
            reagent_id: reagent_id.clone(),
            targeted,
        });
    }

    let complement = if targeted_ids.is_empty() {
        None
    } else {
        let complement_id_parts = targeted_ids.iter().map(String::as_str).collect::<Vec<_>>();
        Some(TargetedComplement {
            id: ids::make_id(&complement_id_parts),
            label: labels::gvc_label(targeted_labels.iter().map(String::as_str)),
            targeted_ids: targeted_ids.into_iter().collect(),
        })
    };

    ExtrinsicComplement {
        genotype_id,
        genotype_label: complement.as_ref().map(|complement| complement.label.clone()),
        subregions,
        complement,
    }
}

/// Compose the effective genotype of an intrinsic genotype and the
/// extrinsic complement applied to it.
///
/// Returns the content-addressed identifier and the composed label; a
/// missing label on both sides degrades to the empty string with a warning.
pub fn effective_genotype(
    intrinsic_id: &str,
    intrinsic_label: Option<&str>,
    extrinsic: &ExtrinsicComplement,
    warnings: &mut Vec<Error>,
) -> (String, String) {
    let id = ids::make_id(&[intrinsic_id, &extrinsic.genotype_id]);
    let label =
        match labels::effective_genotype_label(intrinsic_label, extrinsic.genotype_label.as_deref())
        {
            Some(label) => label,
            None => {
                warnings.push(Error::MissingLabel {
                    kind: "effective genotype",
                    id: id.clone(),
                });
                String::new()
            }
        };
    (id, label)
}
