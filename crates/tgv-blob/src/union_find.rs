/// A growable disjoint-set forest over blob ids.
///
/// Ids are handed out in creation order by [`UnionFind::push`]. Merging never
/// picks a root on its own: the caller names the survivor, which lets the blob
/// extractor apply its own tie-break rule.
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    /// Adds a singleton set and returns its id.
    pub fn push(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        id
    }

    /// Returns the representative (root) of the set containing `id`, with path compression.
    pub fn find(&mut self, mut id: usize) -> usize {
        let mut root = id;

        // Chase down the root
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Go back and collapse the tree
        while self.parent[id] != root {
            let tmp = self.parent[id];
            self.parent[id] = root;
            id = tmp;
        }

        root
    }

    /// Redirects the root `absorbed` to the root `survivor`.
    ///
    /// Both ids must be roots; `absorbed` never becomes a root again.
    pub fn absorb(&mut self, absorbed: usize, survivor: usize) {
        debug_assert!(self.is_root(absorbed) && self.is_root(survivor));
        self.parent[absorbed] = survivor;
    }

    /// Whether `id` is the representative of its set.
    pub fn is_root(&self, id: usize) -> bool {
        self.parent[id] == id
    }

    /// Removes every id.
    pub fn clear(&mut self) {
        self.parent.clear();
    }
}
