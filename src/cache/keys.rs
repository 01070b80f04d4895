//! Cache key space.
//!
//! The full-list and count shelves key on the guestbook id itself. Paginated
//! responses key on a structured triple so that invalidation never has to
//! parse or prefix-match rendered strings.

use std::fmt;

/// Guestbook identifier as stored by the persistence layer.
pub type GuestbookId = u64;

// == List Key ==
/// Log rendering of a full-list key, `all_messages_<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListKey(pub GuestbookId);

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all_messages_{}", self.0)
    }
}

// == Page Key ==
/// Key of one cached page: guestbook, 1-based page number, page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    pub guestbook_id: GuestbookId,
    pub page: u32,
    pub limit: u32,
}

impl PageKey {
    pub fn new(guestbook_id: GuestbookId, page: u32, limit: u32) -> Self {
        Self {
            guestbook_id,
            page,
            limit,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "paginated_messages_{}_p{}_l{}",
            self.guestbook_id, self.page, self.limit
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_rendering() {
        assert_eq!(ListKey(7).to_string(), "all_messages_7");
        assert_eq!(
            PageKey::new(7, 2, 20).to_string(),
            "paginated_messages_7_p2_l20"
        );
    }

    #[test]
    fn test_page_keys_do_not_collide_across_ids() {
        // "1" + "1" vs "11": rendered prefixes overlap, structured keys do not
        let a = PageKey::new(1, 1, 20);
        let b = PageKey::new(11, 1, 20);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_ne!(a, b);
    }
}
