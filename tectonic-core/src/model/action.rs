//! Invertible mutations of a cluster assignment
//!
//! All indices are dense model indices, not public identifiers. Generators
//! only derive actions from current model state, so applying one can assume
//! its preconditions hold.

/// An atomic mutation of the assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Do nothing; the normal signal for "nothing useful to do this step"
    Null,
    /// Place a region on a server, regardless of current placement. Used
    /// when seeding externally computed placements, never by the search.
    Assign { region: usize, server: usize },
    /// Move a region from one server to another
    Move {
        region: usize,
        from: usize,
        to: usize,
    },
    /// Exchange two regions between two servers
    Swap {
        region_a: usize,
        server_a: usize,
        region_b: usize,
        server_b: usize,
    },
}

impl Action {
    pub fn is_null(&self) -> bool {
        matches!(self, Action::Null)
    }

    /// The action that restores the state from before this one was applied
    ///
    /// Panics for `Assign`: assignments have no recorded prior placement and
    /// the search loop never undoes one.
    pub fn inverse(&self) -> Action {
        match *self {
            Action::Null => Action::Null,
            Action::Move { region, from, to } => Action::Move {
                region,
                from: to,
                to: from,
            },
            Action::Swap {
                region_a,
                server_a,
                region_b,
                server_b,
            } => Action::Swap {
                region_a: region_b,
                server_a,
                region_b: region_a,
                server_b,
            },
            Action::Assign { .. } => {
                unreachable!("assign actions are never undone")
            }
        }
    }
}
