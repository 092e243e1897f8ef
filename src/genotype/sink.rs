//! Graph output interface and implementations.
//!
//! The assembler is agnostic of the concrete serialization; it emits entity
//! declarations, relationship triples, and deprecation/equivalence markers
//! through [`GraphSink`].  [`MemoryGraph`] collects them with idempotent
//! declarations, which is what allows content-addressed nodes to be
//! re-declared from many genotypes without duplication.

use std::io::Write;

use indexmap::{IndexMap, IndexSet};

use crate::genotype::schema::{EntityKind, Predicate};

/// Consumer of the records the assembler produces.
pub trait GraphSink {
    /// Declare an entity; repeated declarations of the same id must be
    /// harmless.
    fn declare(
        &mut self,
        id: &str,
        label: Option<&str>,
        kind: EntityKind,
    ) -> Result<(), anyhow::Error>;

    /// Add a relationship triple.
    fn relate(
        &mut self,
        subject: &str,
        predicate: Predicate,
        object: &str,
    ) -> Result<(), anyhow::Error>;

    /// Mark an identifier as retired, optionally pointing at its
    /// replacement.
    fn deprecate(&mut self, id: &str, replacement: Option<&str>) -> Result<(), anyhow::Error>;

    /// Mark two identifiers as equivalent.
    fn equate(&mut self, lhs: &str, rhs: &str) -> Result<(), anyhow::Error>;
}

/// A declared entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: String,
    pub label: Option<String>,
    pub kind: EntityKind,
}

/// In-memory graph with deduplicated declarations and triples.
#[derive(Debug, Clone, Default)]
pub struct MemoryGraph {
    entities: IndexMap<String, Entity>,
    relations: IndexSet<(String, Predicate, String)>,
    deprecations: IndexMap<String, Option<String>>,
    equivalences: IndexSet<(String, String)>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relations(&self) -> impl Iterator<Item = &(String, Predicate, String)> {
        self.relations.iter()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn has_relation(&self, subject: &str, predicate: Predicate, object: &str) -> bool {
        self.relations
            .contains(&(subject.to_string(), predicate, object.to_string()))
    }

    pub fn deprecations(&self) -> impl Iterator<Item = (&String, &Option<String>)> {
        self.deprecations.iter()
    }

    pub fn equivalences(&self) -> impl Iterator<Item = &(String, String)> {
        self.equivalences.iter()
    }

    /// Dump the graph as TSV, one record per line.
    pub fn write_tsv<W>(&self, mut out: W) -> Result<(), anyhow::Error>
    where
        W: Write,
    {
        writeln!(
            out,
            "# dipper-genotype-worker {}",
            crate::common::worker_version()
        )?;
        for entity in self.entities.values() {
            writeln!(
                out,
                "entity\t{}\t{}\t{}\t{}",
                entity.id,
                entity.label.as_deref().unwrap_or(""),
                entity.kind.tag(),
                entity.kind.curie()
            )?;
        }
        for (subject, predicate, object) in &self.relations {
            writeln!(
                out,
                "triple\t{}\t{}\t{}\t{}",
                subject,
                predicate,
                predicate.curie(),
                object
            )?;
        }
        for (id, replacement) in &self.deprecations {
            writeln!(
                out,
                "deprecated\t{}\t{}",
                id,
                replacement.as_deref().unwrap_or("")
            )?;
        }
        for (lhs, rhs) in &self.equivalences {
            writeln!(out, "equivalent\t{lhs}\t{rhs}")?;
        }
        Ok(())
    }
}

impl GraphSink for MemoryGraph {
    fn declare(
        &mut self,
        id: &str,
        label: Option<&str>,
        kind: EntityKind,
    ) -> Result<(), anyhow::Error> {
        match self.entities.get_mut(id) {
            Some(existing) => {
                // First declaration wins for the kind; a label fills in
                // whenever the earlier declarations had none.
                if existing.label.is_none() {
                    existing.label = label.map(str::to_string);
                }
            }
            None => {
                self.entities.insert(
                    id.to_string(),
                    Entity {
                        id: id.to_string(),
                        label: label.map(str::to_string),
                        kind,
                    },
                );
            }
        }
        Ok(())
    }

    fn relate(
        &mut self,
        subject: &str,
        predicate: Predicate,
        object: &str,
    ) -> Result<(), anyhow::Error> {
        self.relations
            .insert((subject.to_string(), predicate, object.to_string()));
        Ok(())
    }

    fn deprecate(&mut self, id: &str, replacement: Option<&str>) -> Result<(), anyhow::Error> {
        self.deprecations
            .entry(id.to_string())
            .or_insert_with(|| replacement.map(str::to_string));
        Ok(())
    }

    fn equate(&mut self, lhs: &str, rhs: &str) -> Result<(), anyhow::Error> {
        self.equivalences
            .insert((lhs.to_string(), rhs.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::genotype::schema::{EntityKind, Predicate};

    use super::{GraphSink, MemoryGraph};

    #[test]
    fn declare_is_idempotent_and_fills_labels() -> Result<(), anyhow::Error> {
        let mut graph = MemoryGraph::new();
        graph.declare("ZFIN:G1", None, EntityKind::IntrinsicGenotype)?;
        graph.declare("ZFIN:G1", Some("labelled"), EntityKind::IntrinsicGenotype)?;
        graph.declare("ZFIN:G1", Some("ignored"), EntityKind::Gene)?;

        assert_eq!(1, graph.entity_count());
        let entity = graph.entity("ZFIN:G1").unwrap();
        assert_eq!(Some("labelled"), entity.label.as_deref());
        assert_eq!(EntityKind::IntrinsicGenotype, entity.kind);

        Ok(())
    }

    #[test]
    fn relate_deduplicates_triples() -> Result<(), anyhow::Error> {
        let mut graph = MemoryGraph::new();
        graph.relate("a", Predicate::HasAlternatePart, "b")?;
        graph.relate("a", Predicate::HasAlternatePart, "b")?;
        graph.relate("a", Predicate::HasReferencePart, "b")?;

        assert_eq!(2, graph.relation_count());
        assert!(graph.has_relation("a", Predicate::HasAlternatePart, "b"));
        assert!(!graph.has_relation("b", Predicate::HasAlternatePart, "a"));

        Ok(())
    }

    #[test]
    fn deprecate_and_equate_are_recorded() -> Result<(), anyhow::Error> {
        let mut graph = MemoryGraph::new();
        graph.deprecate("ZFIN:old", Some("ZFIN:new"))?;
        graph.deprecate("ZFIN:gone", None)?;
        graph.equate("ZFIN:G1", "OTHER:G1")?;

        assert_eq!(2, graph.deprecations().count());
        assert_eq!(1, graph.equivalences().count());

        Ok(())
    }

    #[test]
    fn write_tsv_dump() -> Result<(), anyhow::Error> {
        let mut graph = MemoryGraph::new();
        graph.declare("ZFIN:G1", Some("g1 label"), EntityKind::IntrinsicGenotype)?;
        graph.relate("ZFIN:G1", Predicate::HasReferencePart, "ZFIN:bg1")?;
        graph.deprecate("ZFIN:old", Some("ZFIN:new"))?;
        graph.equate("ZFIN:G1", "OTHER:G1")?;

        let mut buf = Vec::new();
        graph.write_tsv(&mut buf)?;
        let text = String::from_utf8(buf)?;

        assert_eq!(
            "# dipper-genotype-worker x.y.z\n\
             entity\tZFIN:G1\tg1 label\tintrinsic_genotype\tGENO:0000000\n\
             triple\tZFIN:G1\thas_reference_part\tGENO:0000385\tZFIN:bg1\n\
             deprecated\tZFIN:old\tZFIN:new\n\
             equivalent\tZFIN:G1\tOTHER:G1\n",
            text
        );

        Ok(())
    }
}
