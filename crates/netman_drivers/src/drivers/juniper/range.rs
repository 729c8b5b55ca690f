//! VLAN-range membership algebra (§4.4.1). Kept free of any XML or I/O
//! concern: callers parse tokens out of `<members>` elements and turn a
//! `Removal` back into edit fragments themselves.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipToken {
    Literal(u16),
    Range(u16, u16),
    Named(String),
}

impl MembershipToken {
    /// The literal string Junos would print inside `<members>`.
    pub fn rendered(&self) -> String {
        match self {
            MembershipToken::Literal(n) => n.to_string(),
            MembershipToken::Range(a, b) => format!("{a}-{b}"),
            MembershipToken::Named(name) => name.clone(),
        }
    }

    pub fn contains(&self, v: u16, resolve: &dyn Fn(&str) -> Option<u16>) -> bool {
        match self {
            MembershipToken::Literal(n) => *n == v,
            MembershipToken::Range(a, b) => *a <= v && v <= *b,
            MembershipToken::Named(name) => resolve(name) == Some(v),
        }
    }
}

/// Indices of every token in `tokens` that covers `v`.
pub fn tokens_containing(
    tokens: &[MembershipToken],
    v: u16,
    resolve: &dyn Fn(&str) -> Option<u16>,
) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.contains(v, resolve))
        .map(|(i, _)| i)
        .collect()
}

/// The result of removing `v` from a token set: which original token index
/// to delete, and zero or more replacement tokens to add back (for a split
/// range).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub index: usize,
    pub deleted: MembershipToken,
    pub additions: Vec<MembershipToken>,
}

fn collapse(a: u16, b: u16) -> MembershipToken {
    if a == b {
        MembershipToken::Literal(a)
    } else {
        MembershipToken::Range(a, b)
    }
}

/// Computes the edit needed to remove `v` from `tokens`, per §4.4.1. Returns
/// `None` if no token covers `v` (caller raises `TrunkVlanNotSet`).
pub fn remove(
    tokens: &[MembershipToken],
    v: u16,
    resolve: &dyn Fn(&str) -> Option<u16>,
) -> Option<Removal> {
    let index = tokens_containing(tokens, v, resolve).into_iter().next()?;
    let token = &tokens[index];
    let additions = match token {
        MembershipToken::Literal(_) => Vec::new(),
        MembershipToken::Named(_) => Vec::new(),
        MembershipToken::Range(a, b) => {
            let (a, b) = (*a, *b);
            if a == v && b == v {
                Vec::new()
            } else if a == v {
                vec![collapse(a + 1, b)]
            } else if b == v {
                vec![collapse(a, b - 1)]
            } else {
                vec![collapse(a, v - 1), collapse(v + 1, b)]
            }
        }
    };
    Some(Removal {
        index,
        deleted: token.clone(),
        additions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_names(_: &str) -> Option<u16> {
        None
    }

    #[test]
    fn removes_literal() {
        let tokens = vec![MembershipToken::Literal(10)];
        let removal = remove(&tokens, 10, &no_names).unwrap();
        assert_eq!(removal.index, 0);
        assert!(removal.additions.is_empty());
    }

    #[test]
    fn singleton_range_just_deletes() {
        let tokens = vec![MembershipToken::Range(1000, 1000)];
        let removal = remove(&tokens, 1000, &no_names).unwrap();
        assert!(removal.additions.is_empty());
    }

    #[test]
    fn left_edge_of_range() {
        // 1000-1001, remove 1000 -> keep 1001 as literal
        let tokens = vec![MembershipToken::Range(1000, 1001)];
        let removal = remove(&tokens, 1000, &no_names).unwrap();
        assert_eq!(removal.additions, vec![MembershipToken::Literal(1001)]);
    }

    #[test]
    fn right_edge_of_range() {
        // 999-1000, remove 1000 -> keep 999 as literal
        let tokens = vec![MembershipToken::Range(999, 1000)];
        let removal = remove(&tokens, 1000, &no_names).unwrap();
        assert_eq!(removal.additions, vec![MembershipToken::Literal(999)]);
    }

    #[test]
    fn interior_of_range_splits_in_two() {
        // 999-1001, remove 1000 -> keep 999 and 1001 as literals
        let tokens = vec![MembershipToken::Range(999, 1001)];
        let removal = remove(&tokens, 1000, &no_names).unwrap();
        assert_eq!(
            removal.additions,
            vec![MembershipToken::Literal(999), MembershipToken::Literal(1001)]
        );
    }

    #[test]
    fn wide_interior_keeps_subranges() {
        // 998-1002, remove 1000 -> keep 998-999 and 1001-1002
        let tokens = vec![MembershipToken::Range(998, 1002)];
        let removal = remove(&tokens, 1000, &no_names).unwrap();
        assert_eq!(
            removal.additions,
            vec![MembershipToken::Range(998, 999), MembershipToken::Range(1001, 1002)]
        );
    }

    #[test]
    fn named_token_resolving_to_target_deletes_with_no_additions() {
        let tokens = vec![MembershipToken::Named("STANDARD".into())];
        let resolve = |name: &str| if name == "STANDARD" { Some(10) } else { None };
        let removal = remove(&tokens, 10, &resolve).unwrap();
        assert!(removal.additions.is_empty());
    }

    #[test]
    fn nothing_covering_target_returns_none() {
        let tokens = vec![MembershipToken::Literal(5), MembershipToken::Range(20, 30)];
        assert!(remove(&tokens, 10, &no_names).is_none());
    }

    #[test]
    fn wide_range_example_from_cascade_scenario() {
        // 9-15, remove 10 -> keep 9 and 11-15 (from the VLAN removal cascade scenario)
        let tokens = vec![MembershipToken::Range(9, 15)];
        let removal = remove(&tokens, 10, &no_names).unwrap();
        assert_eq!(
            removal.additions,
            vec![MembershipToken::Literal(9), MembershipToken::Range(11, 15)]
        );
    }
}
