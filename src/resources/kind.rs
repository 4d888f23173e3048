//! # Closed set of resource kinds.
//!
//! The pool distributes exactly three kinds of resources. They are known at
//! compile time so every vector in the ledger is a fixed-size array indexed by
//! [`ResourceKind`].

use std::fmt;

/// One kind of pooled resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    /// Vaccine doses.
    Vaccines,
    /// Syringes used to administer the doses.
    Syringes,
    /// Refrigerated delivery trucks.
    Trucks,
}

impl ResourceKind {
    /// Number of distinct kinds.
    pub const COUNT: usize = 3;

    /// All kinds in their canonical (index) order.
    pub const ALL: [ResourceKind; Self::COUNT] = [
        ResourceKind::Vaccines,
        ResourceKind::Syringes,
        ResourceKind::Trucks,
    ];

    /// Position of this kind inside a resource vector.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            ResourceKind::Vaccines => 0,
            ResourceKind::Syringes => 1,
            ResourceKind::Trucks => 2,
        }
    }

    /// Full human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            ResourceKind::Vaccines => "Vaccines",
            ResourceKind::Syringes => "Syringes",
            ResourceKind::Trucks => "Trucks",
        }
    }

    /// One-letter label used in compact vector output (`V:4 S:2 T:0`).
    pub const fn short(self) -> &'static str {
        match self {
            ResourceKind::Vaccines => "V",
            ResourceKind::Syringes => "S",
            ResourceKind::Trucks => "T",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
