//! Code for the "genotype *" sub commands and the genotype construction model.
//!
//! The model assembles flat per-row allele/gene/zygosity records into the
//! compositional GENO structure: variant loci are aggregated per gene into
//! variant single locus complements (VSLC), VSLCs into the genomic variation
//! complement (GVC), and the GVC into the genotype together with its genomic
//! background.  Reagent-induced perturbations take the parallel "extrinsic"
//! path and compose with the intrinsic genotype into an effective genotype.

pub mod assemble;
pub mod assembler;
pub mod builder;
pub mod extrinsic;
pub mod ids;
pub mod input;
pub mod labels;
pub mod schema;
pub mod sink;
pub mod zygosity;
