use std::fmt;

/// A permission reference exactly as it appears in source
/// (`android.Manifest.permission.DUMP`, `"com.example.PERM"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission(String);

impl Permission {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical AND/OR tree over permissions, leaves in source order.
///
/// The type admits arbitrary nesting; the folder only ever builds trees of
/// depth ≤ 1 and the synthesizer rejects anything deeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPredicate {
    Leaf(Permission),
    All(Vec<PermissionPredicate>),
    Any(Vec<PermissionPredicate>),
}

impl PermissionPredicate {
    /// Number of combinator levels: 0 for a leaf, 1 for a flat `All`/`Any`.
    pub fn depth(&self) -> usize {
        match self {
            PermissionPredicate::Leaf(_) => 0,
            PermissionPredicate::All(children) | PermissionPredicate::Any(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
        }
    }

    /// Leaves in source order.
    pub fn permissions(&self) -> Vec<&Permission> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Permission>) {
        match self {
            PermissionPredicate::Leaf(p) => out.push(p),
            PermissionPredicate::All(children) | PermissionPredicate::Any(children) => {
                for child in children {
                    child.collect(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> PermissionPredicate {
        PermissionPredicate::Leaf(Permission::new(name))
    }

    #[test]
    fn test_depth() {
        assert_eq!(leaf("A").depth(), 0);
        assert_eq!(PermissionPredicate::All(vec![leaf("A"), leaf("B")]).depth(), 1);
        let nested =
            PermissionPredicate::Any(vec![leaf("A"), PermissionPredicate::All(vec![leaf("B")])]);
        assert_eq!(nested.depth(), 2);
    }

    #[test]
    fn test_permissions_in_order() {
        let p = PermissionPredicate::All(vec![leaf("B"), leaf("A")]);
        let names: Vec<&str> = p.permissions().iter().map(|p| p.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }
}
