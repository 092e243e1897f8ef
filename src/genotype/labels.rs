//! Composition of human-readable labels for genotype parts.
//!
//! All functions here are pure; callers decide what to do when no label can
//! be composed (log a data-quality warning and fall back to the empty
//! string, so entity declarations stay well-formed).

use itertools::Itertools;

/// Placeholder used when a genomic background is not specified.
pub const NOT_SPECIFIED: &str = "n.s.";

/// Compose the label of a VSLC from its parts' labels.
///
/// The allele labels are wrapped in angle brackets and attached to the gene
/// label when one is known: `g<a1>/g<a2>`, `<a1>/<a2>`, `g<a1>`, or `<a1>`.
/// Returns `None` when not even the first allele label is available.
pub fn vslc_label(
    gene: Option<&str>,
    allele1: Option<&str>,
    allele2: Option<&str>,
) -> Option<String> {
    match (gene, allele1, allele2) {
        (Some(g), Some(a1), Some(a2)) => Some(format!("{g}<{a1}>/{g}<{a2}>")),
        (None, Some(a1), Some(a2)) => Some(format!("<{a1}>/<{a2}>")),
        (Some(g), Some(a1), None) => Some(format!("{g}<{a1}>")),
        (None, Some(a1), None) => Some(format!("<{a1}>")),
        _ => None,
    }
}

/// Compose the label of a GVC (or targeted gene complement) from its parts.
///
/// Joined with `"; "` in the order given, which is the order the parts were
/// first encountered, not a sorted order.
pub fn gvc_label<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts.into_iter().join("; ")
}

/// Append the genomic background to an intrinsic genotype label.
///
/// The background label goes in square brackets; `[n.s.]` marks an unknown
/// background.
pub fn genotype_label(intrinsic: &str, background: Option<&str>) -> String {
    match background {
        Some(background) => format!("{intrinsic} [{background}]"),
        None => format!("{intrinsic} [{NOT_SPECIFIED}]"),
    }
}

/// Compose the label of an effective genotype from its intrinsic and
/// extrinsic parts, using whichever are present.
pub fn effective_genotype_label(
    intrinsic: Option<&str>,
    extrinsic: Option<&str>,
) -> Option<String> {
    match (intrinsic, extrinsic) {
        (Some(intrinsic), Some(extrinsic)) => Some(format!("{intrinsic}; {extrinsic}")),
        (Some(intrinsic), None) => Some(intrinsic.to_string()),
        (None, Some(extrinsic)) => Some(extrinsic.to_string()),
        (None, None) => None,
    }
}

/// Label of a targeted gene subregion: reagent label plus the applied
/// concentration, `(n.s.)` when the concentration is unknown.
pub fn targeted_gene_subregion_label(reagent: &str, concentration: Option<&str>) -> String {
    match concentration {
        Some(concentration) => format!("<{reagent} ({concentration})>"),
        None => format!("<{reagent} ({NOT_SPECIFIED})>"),
    }
}

/// Label of a reagent-targeted gene: the gene label prefixed onto the
/// subregion label.
pub fn targeted_gene_variant_label(gene: Option<&str>, subregion_label: &str) -> String {
    match gene {
        Some(gene) => format!("{gene}{subregion_label}"),
        None => subregion_label.to_string(),
    }
}
