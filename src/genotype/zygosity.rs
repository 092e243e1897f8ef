//! Zygosity determination for variant loci.

use indexmap::IndexMap;

use crate::genotype::schema::Error;

/// Sentinel standing in for an unknown second allele in a locus list.
///
/// Sources represent "zygosity unknown" by appending this instead of a
/// second allele identifier.
pub const UNKNOWN_ALLELE: &str = "?";

/// Zygosity classification of one locus.
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
pub enum ZygosityKind {
    Homozygous,
    Heterozygous,
    Indeterminate,
    /// General hemizygosity (insertions/deletions without a located pair).
    Hemizygous,
    HemizygousXLinked,
    HemizygousYLinked,
    Heteroplasmic,
    Homoplasmic,
}

impl ZygosityKind {
    /// The GENO class this zygosity maps to.
    pub fn curie(&self) -> &'static str {
        match self {
            ZygosityKind::Homozygous => "GENO:0000136",
            ZygosityKind::Heterozygous => "GENO:0000135",
            ZygosityKind::Indeterminate => "GENO:0000137",
            ZygosityKind::Hemizygous => "GENO:0000606",
            ZygosityKind::HemizygousXLinked => "GENO:0000605",
            ZygosityKind::HemizygousYLinked => "GENO:0000604",
            ZygosityKind::Heteroplasmic => "GENO:0000603",
            ZygosityKind::Homoplasmic => "GENO:0000602",
        }
    }
}

/// Determine zygosity from the allele pair alone.
///
/// The decision table, in order: missing or unknown second allele is
/// indeterminate, identical identifiers are homozygous, differing
/// identifiers are heterozygous.
pub fn resolve(allele1: &str, allele2: Option<&str>) -> ZygosityKind {
    match allele2 {
        None | Some(UNKNOWN_ALLELE) => ZygosityKind::Indeterminate,
        Some(allele2) if allele2 == allele1 => ZygosityKind::Homozygous,
        Some(_) => ZygosityKind::Heterozygous,
    }
}

/// Mapping from a source's controlled zygosity vocabulary to [`ZygosityKind`].
///
/// Sources carry their own vocabularies (and their own capitalization); the
/// built-in table covers the terms observed upstream, and adapters extend or
/// replace it.
#[derive(Debug, Clone)]
pub struct HintTable {
    entries: IndexMap<String, ZygosityKind>,
}

impl Default for HintTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (term, kind) in [
            ("homozygous", ZygosityKind::Homozygous),
            ("heterozygous", ZygosityKind::Heterozygous),
            ("indeterminate", ZygosityKind::Indeterminate),
            ("unknown", ZygosityKind::Indeterminate),
            ("Homozygous", ZygosityKind::Homozygous),
            ("Heterozygous", ZygosityKind::Heterozygous),
            ("Indeterminate", ZygosityKind::Indeterminate),
            ("Hemizygous X-linked", ZygosityKind::HemizygousXLinked),
            ("Hemizygous Y-linked", ZygosityKind::HemizygousYLinked),
            ("Hemizygous Insertion", ZygosityKind::Hemizygous),
            ("Hemizygous Deletion", ZygosityKind::Hemizygous),
            ("Heteroplasmic", ZygosityKind::Heteroplasmic),
            ("Homoplasmic", ZygosityKind::Homoplasmic),
        ] {
            table.insert(term, kind);
        }
        table
    }
}

impl HintTable {
    /// A table with no entries; every hint will be reported as unmapped.
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Insert or override a vocabulary term.
    pub fn insert(&mut self, term: &str, kind: ZygosityKind) {
        self.entries.insert(term.trim().to_string(), kind);
    }

    /// Look up a hint; whitespace around the hint is ignored.
    pub fn get(&self, hint: &str) -> Option<ZygosityKind> {
        self.entries.get(hint.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Determine zygosity, consulting the source's hint vocabulary first.
///
/// With no hint (or a blank one) this falls back to the allele-comparison
/// table of [`resolve`].  A hint outside the vocabulary is an error the
/// caller logs and degrades to [`ZygosityKind::Indeterminate`].
pub fn resolve_with_hint(
    table: &HintTable,
    hint: Option<&str>,
    allele1: &str,
    allele2: Option<&str>,
) -> Result<ZygosityKind, Error> {
    match hint {
        None => Ok(resolve(allele1, allele2)),
        Some(hint) if hint.trim().is_empty() => Ok(resolve(allele1, allele2)),
        Some(hint) => table.get(hint).ok_or_else(|| Error::UnmappedZygosityHint {
            hint: hint.to_string(),
        }),
    }
}
