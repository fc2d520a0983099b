use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use super::domain::{Department, DepartmentId};

/// Errors raised when a proposed parent link would break the forest shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("a department cannot be its own parent")]
    SelfParent,
    #[error("department hierarchy cannot contain a cycle")]
    Cycle,
    #[error("parent department {0:?} does not exist")]
    UnknownParent(DepartmentId),
}

/// Adjacency view of the department forest, built once per operation.
#[derive(Debug, Clone, Default)]
pub struct DepartmentTree {
    parents: HashMap<DepartmentId, Option<DepartmentId>>,
    children: HashMap<DepartmentId, Vec<DepartmentId>>,
}

impl DepartmentTree {
    pub fn from_departments<'a, I>(departments: I) -> Self
    where
        I: IntoIterator<Item = &'a Department>,
    {
        let mut tree = Self::default();
        for department in departments {
            tree.parents.insert(department.id, department.parent);
            if let Some(parent) = department.parent {
                tree.children.entry(parent).or_default().push(department.id);
            }
        }
        for siblings in tree.children.values_mut() {
            siblings.sort();
        }
        tree
    }

    pub fn contains(&self, id: DepartmentId) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn parent_of(&self, id: DepartmentId) -> Option<DepartmentId> {
        self.parents.get(&id).copied().flatten()
    }

    pub fn children_of(&self, id: DepartmentId) -> &[DepartmentId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Targets plus every transitive descendant, walked breadth-first.
    pub fn closure<I>(&self, targets: I) -> BTreeSet<DepartmentId>
    where
        I: IntoIterator<Item = DepartmentId>,
    {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();

        for target in targets {
            if visited.insert(target) {
                queue.push_back(target);
            }
        }

        while let Some(current) = queue.pop_front() {
            for &child in self.children_of(current) {
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }

        visited
    }

    /// The department itself followed by each ancestor up to its root.
    pub fn ancestors(&self, start: DepartmentId) -> Vec<DepartmentId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            chain.push(id);
            current = self.parent_of(id);
        }

        chain
    }

    /// Checks that attaching `department` under `parent` keeps the forest acyclic.
    ///
    /// `department` is `None` for a department that has not been saved yet, which can never
    /// close a cycle but still requires an existing parent.
    pub fn validate_parent(
        &self,
        department: Option<DepartmentId>,
        parent: Option<DepartmentId>,
    ) -> Result<(), HierarchyError> {
        let Some(parent) = parent else {
            return Ok(());
        };

        if !self.contains(parent) {
            return Err(HierarchyError::UnknownParent(parent));
        }

        let Some(department) = department else {
            return Ok(());
        };

        if department == parent {
            return Err(HierarchyError::SelfParent);
        }

        if self.ancestors(parent).contains(&department) {
            return Err(HierarchyError::Cycle);
        }

        Ok(())
    }

    /// Renders `Parent / Child` style labels used by listings and CSV imports.
    pub fn path_label(&self, departments: &[Department], id: DepartmentId) -> String {
        let names: HashMap<DepartmentId, &str> = departments
            .iter()
            .map(|department| (department.id, department.name.as_str()))
            .collect();
        let mut chain = self.ancestors(id);
        chain.reverse();
        chain
            .into_iter()
            .filter_map(|id| names.get(&id).copied())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}
