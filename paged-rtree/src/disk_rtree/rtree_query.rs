//! Lazy range query cursor.

use crate::bounding_box::BoundingBox;

use super::rtree_impl::DiskRTree;
use super::rtree_node::NodeKind;
use super::rtree_types::{NodeId, RowId, SpatialResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Predicate {
    Intersects,
    Contained,
}

/// Cursor over the row ids matching a range query.
///
/// Pages are read only when the cursor reaches them, and only for
/// subtrees whose box intersects the query. The cursor holds the tree
/// mutably, so the tree cannot change while it is alive. Once it yields an
/// error it is exhausted.
pub struct QueryIter<'a> {
    tree: &'a mut DiskRTree,
    query: BoundingBox,
    predicate: Predicate,
    stack: Vec<NodeId>,
    /// Matches of the current leaf, reversed
    pending: Vec<RowId>,
    failed: bool,
}

impl<'a> QueryIter<'a> {
    fn new(tree: &'a mut DiskRTree, query: BoundingBox, predicate: Predicate) -> Self {
        let stack = vec![tree.root];
        Self {
            tree,
            query,
            predicate,
            stack,
            pending: Vec::new(),
            failed: false,
        }
    }

    fn matches(&self, bbox: &BoundingBox) -> bool {
        match self.predicate {
            Predicate::Intersects => self.query.intersects(bbox),
            Predicate::Contained => self.query.contains(bbox),
        }
    }

    fn expand(&mut self, id: NodeId) -> SpatialResult<()> {
        self.tree.ensure_loaded(id)?;
        let node = self.tree.arena.get(id)?;
        match node.kind() {
            NodeKind::Leaf(entries) => {
                let matched: Vec<RowId> = entries
                    .iter()
                    .filter(|e| self.matches(&e.bbox))
                    .map(|e| e.row_id)
                    .collect();
                self.pending.extend(matched.into_iter().rev());
            }
            NodeKind::Internal(children) => {
                let query = self.query;
                self.stack.extend(
                    children
                        .iter()
                        .rev()
                        .filter(|c| c.bbox.intersects(&query))
                        .map(|c| c.node),
                );
            }
        }
        Ok(())
    }
}

impl Iterator for QueryIter<'_> {
    type Item = SpatialResult<RowId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row_id) = self.pending.pop() {
                return Some(Ok(row_id));
            }
            if self.failed {
                return None;
            }
            let id = self.stack.pop()?;
            if let Err(err) = self.expand(id) {
                self.failed = true;
                self.stack.clear();
                return Some(Err(err));
            }
        }
    }
}

impl DiskRTree {
    /// Row ids of every entry whose box intersects `bbox`, produced lazily.
    ///
    /// Boxes that only touch `bbox` along an edge or corner count as
    /// intersecting.
    pub fn query(&mut self, bbox: &BoundingBox) -> SpatialResult<QueryIter<'_>> {
        self.check_open()?;
        Ok(QueryIter::new(self, *bbox, Predicate::Intersects))
    }

    /// Row ids of every entry whose box lies entirely inside `bbox`
    pub fn query_contained(&mut self, bbox: &BoundingBox) -> SpatialResult<QueryIter<'_>> {
        self.check_open()?;
        Ok(QueryIter::new(self, *bbox, Predicate::Contained))
    }

    /// Collects [`DiskRTree::query`]
    pub fn query_vec(&mut self, bbox: &BoundingBox) -> SpatialResult<Vec<RowId>> {
        self.query(bbox)?.collect()
    }
}
