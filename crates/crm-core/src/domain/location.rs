// ============================================================================
// CRM Core - Location Entity
// File: crates/crm-core/src/domain/location.rs
// Description: Country > governorate > city hierarchy stored as a nested set
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;

string_enum! {
    pub enum LocationKind {
        Country => "country",
        Governorate => "governorate",
        City => "city",
    }
    default = Country
}

impl LocationKind {
    pub fn depth(&self) -> i32 {
        match self {
            LocationKind::Country => 0,
            LocationKind::Governorate => 1,
            LocationKind::City => 2,
        }
    }

    pub fn child(&self) -> Option<LocationKind> {
        match self {
            LocationKind::Country => Some(LocationKind::Governorate),
            LocationKind::Governorate => Some(LocationKind::City),
            LocationKind::City => None,
        }
    }
}

/// Invariants: `lft < rgt`; a descendant's bounds lie strictly inside its
/// ancestor's; `rgt - lft + 1 == 2 * subtree_size`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub kind: LocationKind,
    pub parent_id: Option<Uuid>,
    pub lft: i32,
    pub rgt: i32,
    pub depth: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewLocation {
    #[validate(length(min = 1, max = 100, message = "Location name must be between 1 and 100 characters"))]
    pub name: String,
    pub kind: LocationKind,
    pub parent_id: Option<Uuid>,
}

impl NewLocation {
    /// Check the kind against the parent (or its absence).
    pub fn check_parent(&self, parent: Option<&Location>) -> Result<(), DomainError> {
        self.validate()?;
        let expected = match parent {
            None => Some(LocationKind::Country),
            Some(parent) => parent.kind.child(),
        };
        match expected {
            Some(kind) if kind == self.kind => Ok(()),
            Some(kind) => Err(DomainError::ValidationError(format!(
                "expected a {} here, got a {}",
                kind, self.kind
            ))),
            None => Err(DomainError::ValidationError(
                "cities cannot have child locations".to_string(),
            )),
        }
    }
}

impl Location {
    /// Row for a new node placed at `[lft, lft + 1]`.
    pub fn leaf(input: NewLocation, lft: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            depth: input.kind.depth(),
            kind: input.kind,
            parent_id: input.parent_id,
            lft,
            rgt: lft + 1,
            created_at: Utc::now(),
        }
    }

    /// Number of bound values occupied by this subtree.
    pub fn width(&self) -> i32 {
        self.rgt - self.lft + 1
    }

    pub fn subtree_size(&self) -> i32 {
        self.width() / 2
    }

    pub fn is_ancestor_of(&self, other: &Location) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }
}

/// Nested JSON view of a subtree.
#[derive(Debug, Clone, Serialize)]
pub struct LocationTree {
    pub id: Uuid,
    pub name: String,
    pub kind: LocationKind,
    pub depth: i32,
    pub children: Vec<LocationTree>,
}

impl LocationTree {
    fn node(location: Location) -> (Self, i32) {
        let rgt = location.rgt;
        (
            Self {
                id: location.id,
                name: location.name,
                kind: location.kind,
                depth: location.depth,
                children: Vec::new(),
            },
            rgt,
        )
    }

    /// Builds forests from rows. Rows are sorted by `lft` first; each node is
    /// attached to the nearest open node whose `rgt` encloses it.
    pub fn build(mut rows: Vec<Location>) -> Vec<LocationTree> {
        rows.sort_by_key(|l| l.lft);

        let mut roots: Vec<LocationTree> = Vec::new();
        let mut stack: Vec<(LocationTree, i32)> = Vec::new();

        for row in rows {
            let lft = row.lft;
            while let Some((_, rgt)) = stack.last() {
                if *rgt > lft {
                    break;
                }
                Self::close(&mut stack, &mut roots);
            }
            stack.push(Self::node(row));
        }
        while !stack.is_empty() {
            Self::close(&mut stack, &mut roots);
        }
        roots
    }

    fn close(stack: &mut Vec<(LocationTree, i32)>, roots: &mut Vec<LocationTree>) {
        if let Some((done, _)) = stack.pop() {
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(done),
                None => roots.push(done),
            }
        }
    }

    pub fn count(&self) -> usize {
        1 + self.children.iter().map(LocationTree::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, kind: LocationKind, lft: i32, rgt: i32) -> Location {
        Location {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            parent_id: None,
            lft,
            rgt,
            depth: kind.depth(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_kind_must_descend() {
        let egypt = row("Egypt", LocationKind::Country, 1, 2);
        let city = NewLocation { name: "Giza".to_string(), kind: LocationKind::City, parent_id: Some(egypt.id) };
        assert!(city.check_parent(Some(&egypt)).is_err());

        let gov = NewLocation { name: "Giza".to_string(), kind: LocationKind::Governorate, parent_id: Some(egypt.id) };
        assert!(gov.check_parent(Some(&egypt)).is_ok());
        assert!(gov.check_parent(None).is_err());
    }

    #[test]
    fn test_build_tree_from_rows() {
        // Egypt(1,10) > Cairo(2,5) > Nasr City(3,4); Egypt > Giza(6,9) > Dokki(7,8); Jordan(11,12)
        let rows = vec![
            row("Giza", LocationKind::Governorate, 6, 9),
            row("Egypt", LocationKind::Country, 1, 10),
            row("Dokki", LocationKind::City, 7, 8),
            row("Jordan", LocationKind::Country, 11, 12),
            row("Cairo", LocationKind::Governorate, 2, 5),
            row("Nasr City", LocationKind::City, 3, 4),
        ];
        let forest = LocationTree::build(rows);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].name, "Egypt");
        assert_eq!(forest[0].count(), 5);
        assert_eq!(forest[0].children[0].name, "Cairo");
        assert_eq!(forest[0].children[1].children[0].name, "Dokki");
        assert!(forest[1].children.is_empty());
    }

    #[test]
    fn test_width_matches_subtree_size() {
        let egypt = row("Egypt", LocationKind::Country, 1, 10);
        let dokki = row("Dokki", LocationKind::City, 7, 8);
        assert_eq!(egypt.subtree_size(), 5);
        assert!(egypt.is_ancestor_of(&dokki));
        assert!(!dokki.is_ancestor_of(&egypt));
    }
}
