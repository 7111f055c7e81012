//! Construction-time field registry for entities
//!
//! Every entity carries a descriptor fixing which property names are
//! relations (and with which cardinality) and which are plain data fields.
//! Classification never changes after construction and is never inferred
//! from response shape.

/// Supplies the descriptor of a relation's target type.
pub type DescriptorFn = fn() -> EntityDescriptor;

/// Declared kind of a navigation or media property
#[derive(Debug, Clone, Copy)]
pub enum RelationKind {
    /// Single related entity of the given target type
    Single(DescriptorFn),
    /// Ordered collection of related entities of the given target type
    Collection(DescriptorFn),
    /// Binary media resource addressed by URL
    Stream,
}

/// Field registry for one entity type
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// Name of the field holding the instance identity
    pub primary_key: &'static str,
    /// Declared relations, name to kind
    pub relations: &'static [(&'static str, RelationKind)],
}

impl EntityDescriptor {
    /// Descriptor for untyped use: identity field `id`, no relations.
    pub fn generic() -> Self {
        Self {
            primary_key: "id",
            relations: &[],
        }
    }

    /// Look up the declared kind of a relation name.
    pub fn relation(&self, name: &str) -> Option<RelationKind> {
        self.relations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn is_relation(&self, name: &str) -> bool {
        self.relation(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> EntityDescriptor {
        EntityDescriptor::generic()
    }

    #[test]
    fn test_generic_descriptor() {
        let d = EntityDescriptor::generic();
        assert_eq!(d.primary_key, "id");
        assert!(!d.is_relation("anything"));
    }

    #[test]
    fn test_relation_lookup() {
        let d = EntityDescriptor {
            primary_key: "id",
            relations: &[
                ("lines", RelationKind::Collection(target)),
                ("customer", RelationKind::Single(target)),
                ("picture", RelationKind::Stream),
            ],
        };
        assert!(matches!(d.relation("lines"), Some(RelationKind::Collection(_))));
        assert!(matches!(d.relation("customer"), Some(RelationKind::Single(_))));
        assert!(matches!(d.relation("picture"), Some(RelationKind::Stream)));
        assert!(d.relation("number").is_none());
    }
}
