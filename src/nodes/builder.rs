use super::node::{Member, Node, NodeId, NodeKind, NodeTree, Slot};
use crate::error::FixtureError;
use crate::resolve::resolve;
use crate::select::SelectorGroup;
use fixture_core::{Settings, TypeBindings, TypeCatalog, TypeRef, TypeShape};
use tracing::{debug, trace};

/// Builds the node tree for a root type.
///
/// Construction is depth-first. A node whose type and declaring member both
/// equal those of one of its ancestors becomes a [`NodeKind::Cyclic`]
/// terminal instead of being expanded, so the tree is bounded by the longest
/// non-repeating chain of positions. Element, key, value and inner slots
/// have no member and compare like the root.
pub struct NodeBuilder<'a> {
    catalog: &'a TypeCatalog,
    settings: &'a Settings,
    ignored: &'a [SelectorGroup],
}

impl<'a> NodeBuilder<'a> {
    pub fn new(catalog: &'a TypeCatalog, settings: &'a Settings) -> Self {
        Self {
            catalog,
            settings,
            ignored: &[],
        }
    }

    /// Nodes matched by any of these selectors are built as [`NodeKind::Ignored`].
    pub fn with_ignored(mut self, ignored: &'a [SelectorGroup]) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn build(&self, root: &TypeRef) -> Result<NodeTree, FixtureError> {
        let mut tree = NodeTree::default();
        self.build_node(&mut tree, root, &TypeBindings::new(), Slot::Root, None, 0)?;
        debug!(
            "Built node tree for {}: {} nodes, {} cyclic, {} ignored",
            root,
            tree.len(),
            tree.count(NodeKind::Cyclic),
            tree.count(NodeKind::Ignored)
        );
        Ok(tree)
    }

    fn build_node(
        &self,
        tree: &mut NodeTree,
        declared: &TypeRef,
        inherited: &TypeBindings,
        slot: Slot,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId, FixtureError> {
        let resolved = resolve(self.catalog, declared, inherited)?;
        let kind = self.classify(&resolved.ty);
        let id = tree.push(Node {
            id: NodeId(0),
            ty: resolved.ty,
            kind,
            slot,
            parent,
            children: Vec::new(),
            bindings: resolved.bindings,
            depth,
        });
        if let Some(parent) = parent {
            tree.get_mut(parent).children.push(id);
        }

        if self.ignored.iter().any(|group| group.matches(tree, id)) {
            tree.get_mut(id).kind = NodeKind::Ignored;
            trace!("Ignoring {}", tree.path(id));
            return Ok(id);
        }

        let cyclic = {
            let node = tree.get(id);
            tree.ancestors(id)
                .any(|ancestor| ancestor.ty == node.ty && ancestor.member() == node.member())
        };
        if cyclic {
            tree.get_mut(id).kind = NodeKind::Cyclic;
            trace!("Cycle detected at {}", tree.path(id));
            return Ok(id);
        }

        if depth > self.settings.max_depth {
            return Err(FixtureError::DepthExceeded {
                max_depth: self.settings.max_depth,
                path: tree.path(id),
            });
        }

        let ty = tree.get(id).ty.clone();
        let bindings = tree.get(id).bindings.clone();
        let next = depth + 1;
        match (kind, &ty) {
            (NodeKind::Compound, TypeRef::Named { name, .. }) => {
                let def = self.catalog.get(name).ok_or_else(|| FixtureError::TypeResolution {
                    type_name: ty.to_string(),
                    reason: format!("type '{name}' is not defined"),
                })?;
                for field in def.fields().iter().filter(|field| !field.read_only) {
                    let member = Member {
                        owner: name.clone(),
                        name: field.name.clone(),
                        setter: field.setter.clone(),
                    };
                    self.build_node(tree, &field.ty, &bindings, Slot::Field(member), Some(id), next)?;
                }
            }
            (NodeKind::Sequence, TypeRef::Seq { element, .. }) => {
                self.build_node(tree, element, &bindings, Slot::Element, Some(id), next)?;
            }
            (NodeKind::Mapping, TypeRef::Map { key, value }) => {
                self.build_node(tree, key, &bindings, Slot::Key, Some(id), next)?;
                self.build_node(tree, value, &bindings, Slot::Value, Some(id), next)?;
            }
            (NodeKind::Wrapper, TypeRef::Option(inner)) => {
                self.build_node(tree, inner, &bindings, Slot::Inner, Some(id), next)?;
            }
            (NodeKind::Wrapper, TypeRef::Named { name, .. }) => {
                if let Some(TypeShape::Wrapper { wraps }) = self.catalog.get(name).map(|d| &d.shape) {
                    self.build_node(tree, wraps, &bindings, Slot::Inner, Some(id), next)?;
                }
            }
            _ => {}
        }
        Ok(id)
    }

    fn classify(&self, ty: &TypeRef) -> NodeKind {
        match ty {
            TypeRef::Seq { .. } => NodeKind::Sequence,
            TypeRef::Map { .. } => NodeKind::Mapping,
            TypeRef::Option(_) => NodeKind::Wrapper,
            TypeRef::Named { name, .. } => match self.catalog.get(name).map(|def| &def.shape) {
                Some(TypeShape::Record { fields }) if fields.iter().any(|f| !f.read_only) => {
                    NodeKind::Compound
                }
                Some(TypeShape::Wrapper { .. }) => NodeKind::Wrapper,
                _ => NodeKind::Leaf,
            },
            TypeRef::Leaf(_) | TypeRef::Param(_) | TypeRef::Wildcard { .. } => NodeKind::Leaf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::Selector;

    const TYPES: &str = r#"
types:
  - name: Person
    shape:
      type: record
      fields:
        - name: name
          type: String
        - name: age
          type: i32
        - name: id
          type: Uuid
          read_only: true
  - name: Family
    shape:
      type: record
      fields:
        - name: members
          type: Vec<Person>
        - name: ages
          type: Map<String, i32>
        - name: nickname
          type: Option<String>
        - name: head
          type: Boxed<Person>
  - name: Boxed
    params: [T]
    shape:
      type: wrapper
      wraps: T
  - name: Tree
    shape:
      type: record
      fields:
        - name: value
          type: i32
        - name: children
          type: Vec<Tree>
        - name: index
          type: Map<Tree, String>
  - name: Spouse
    shape:
      type: record
      fields:
        - name: name
          type: String
        - name: spouse
          type: Spouse
  - name: Sealed
    shape:
      type: record
      fields:
        - name: id
          type: Uuid
          read_only: true
"#;

    fn build(root: &str) -> Result<NodeTree, FixtureError> {
        let catalog = TypeCatalog::from_yaml(TYPES).unwrap();
        let settings = Settings::default();
        NodeBuilder::new(&catalog, &settings).build(&TypeRef::parse(root).unwrap())
    }

    #[test]
    fn test_compound_has_child_per_writable_field() {
        let tree = build("Person").unwrap();
        let root = tree.root();
        assert_eq!(root.kind(), NodeKind::Compound);
        assert_eq!(root.children().len(), 2);
        assert!(tree.find_field("Person", "id").is_none());

        let age = tree.find_field("Person", "age").unwrap();
        assert_eq!(age.kind(), NodeKind::Leaf);
        assert_eq!(age.to_string(), "Node[Person.age, depth=1, type=i32]");
        assert_eq!(root.to_string(), "Node[Person, depth=0, type=Person]");
    }

    #[test]
    fn test_container_shapes() {
        let tree = build("Family").unwrap();

        let members = tree.find_field("Family", "members").unwrap();
        assert_eq!(members.kind(), NodeKind::Sequence);
        assert_eq!(members.children().len(), 1);
        assert_eq!(tree.get(members.children()[0]).kind(), NodeKind::Compound);

        let ages = tree.find_field("Family", "ages").unwrap();
        assert_eq!(ages.kind(), NodeKind::Mapping);
        assert_eq!(ages.children().len(), 2);
        assert_eq!(tree.get(ages.children()[0]).slot(), &Slot::Key);
        assert_eq!(tree.get(ages.children()[1]).slot(), &Slot::Value);

        let nickname = tree.find_field("Family", "nickname").unwrap();
        assert_eq!(nickname.kind(), NodeKind::Wrapper);
        assert_eq!(nickname.children().len(), 1);

        let head = tree.find_field("Family", "head").unwrap();
        assert_eq!(head.kind(), NodeKind::Wrapper);
        let inner = tree.get(head.children()[0]);
        assert_eq!(inner.ty().to_string(), "Person");
        assert_eq!(inner.kind(), NodeKind::Compound);
        assert_eq!(tree.path(inner.children()[0]), "Family.head?.name");
    }

    #[test]
    fn test_cycles_terminate() {
        let tree = build("Tree").unwrap();

        let children = tree.find_field("Tree", "children").unwrap();
        let element = tree.get(children.children()[0]);
        assert_eq!(element.kind(), NodeKind::Cyclic);
        assert!(element.children().is_empty());

        let index = tree.find_field("Tree", "index").unwrap();
        assert_eq!(tree.get(index.children()[0]).kind(), NodeKind::Cyclic);
        assert_eq!(tree.get(index.children()[1]).kind(), NodeKind::Leaf);
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn test_self_member_expands_once() {
        let tree = build("Spouse").unwrap();

        let outer = tree.get(tree.root().children()[1]);
        assert_eq!(outer.kind(), NodeKind::Compound);
        assert_eq!(outer.to_string(), "Node[Spouse.spouse, depth=1, type=Spouse]");

        let inner = tree.get(outer.children()[1]);
        assert_eq!(inner.kind(), NodeKind::Cyclic);
        assert_eq!(tree.path(inner.id()), "Spouse.spouse.spouse");
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_record_without_writable_fields_is_leaf() {
        let tree = build("Sealed").unwrap();
        assert_eq!(tree.root().kind(), NodeKind::Leaf);
        assert!(tree.root().children().is_empty());
    }

    #[test]
    fn test_ignored_subtree_not_expanded() {
        let catalog = TypeCatalog::from_yaml(TYPES).unwrap();
        let settings = Settings::default();
        let ignored = vec![SelectorGroup::from(Selector::field("Family", "members"))];
        let tree = NodeBuilder::new(&catalog, &settings)
            .with_ignored(&ignored)
            .build(&TypeRef::parse("Family").unwrap())
            .unwrap();

        let members = tree.find_field("Family", "members").unwrap();
        assert_eq!(members.kind(), NodeKind::Ignored);
        assert!(members.children().is_empty());
    }

    #[test]
    fn test_depth_bound() {
        let catalog = TypeCatalog::from_yaml(TYPES).unwrap();
        let settings = Settings {
            max_depth: 2,
            ..Settings::default()
        };
        let result = NodeBuilder::new(&catalog, &settings)
            .build(&TypeRef::parse("Vec<Vec<Vec<i32>>>").unwrap());
        assert!(matches!(
            result,
            Err(FixtureError::DepthExceeded { max_depth: 2, ref path }) if path == "Vec[][][]"
        ));
    }
}
