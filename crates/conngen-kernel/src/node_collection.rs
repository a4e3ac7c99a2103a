//! Immutable ordered sets of node ids

use crate::{
    error::{KernelError, Result},
    NodeId,
};

use core::fmt;
use std::sync::Arc;

#[derive(Debug, PartialEq, Eq)]
enum Repr {
    /// Contiguous ids `first..first + len`
    Range { first: u64, len: usize },
    /// Strictly ascending ids
    List(Vec<NodeId>),
}

/// Ordered, read-only collection of node ids
///
/// Cloning is cheap; the id storage is shared. Local indices (`lid`) are
/// positions within the collection.
#[derive(Clone)]
pub struct NodeCollection {
    inner: Arc<Repr>,
}

impl NodeCollection {
    /// Empty collection
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Repr::List(Vec::new())),
        }
    }

    /// Contiguous range of `len` ids starting at `first`
    pub fn range(first: NodeId, len: usize) -> Result<Self> {
        if !first.is_valid() && len > 0 {
            return Err(KernelError::invalid_collection("node ids start at 1"));
        }
        if len == 0 {
            return Ok(Self::empty());
        }
        Ok(Self {
            inner: Arc::new(Repr::Range {
                first: first.raw(),
                len,
            }),
        })
    }

    /// Collection from explicit ids, which must be valid and strictly ascending
    pub fn from_ids<I>(ids: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let ids: Vec<NodeId> = ids.into_iter().map(Into::into).collect();
        if ids.iter().any(|id| !id.is_valid()) {
            return Err(KernelError::invalid_collection("node ids start at 1"));
        }
        if ids.windows(2).any(|w| w[0] >= w[1]) {
            return Err(KernelError::invalid_collection(
                "node ids must be unique and sorted in ascending order",
            ));
        }
        Ok(Self {
            inner: Arc::new(Repr::List(ids)),
        })
    }

    /// Number of ids
    pub fn len(&self) -> usize {
        match &*self.inner {
            Repr::Range { len, .. } => *len,
            Repr::List(ids) => ids.len(),
        }
    }

    /// Whether the collection holds no ids
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Id at local index `lid`
    pub fn get(&self, lid: usize) -> Option<NodeId> {
        match &*self.inner {
            Repr::Range { first, len } => (lid < *len).then(|| NodeId::new(first + lid as u64)),
            Repr::List(ids) => ids.get(lid).copied(),
        }
    }

    /// Local index of `id`, if it is a member
    pub fn get_lid(&self, id: NodeId) -> Option<usize> {
        match &*self.inner {
            Repr::Range { first, len } => {
                let offset = id.raw().checked_sub(*first)?;
                (offset < *len as u64).then_some(offset as usize)
            }
            Repr::List(ids) => ids.binary_search(&id).ok(),
        }
    }

    /// Membership test
    pub fn contains(&self, id: NodeId) -> bool {
        self.get_lid(id).is_some()
    }

    /// Whether the ids form one contiguous range
    pub fn is_range(&self) -> bool {
        match &*self.inner {
            Repr::Range { .. } => true,
            Repr::List(ids) => ids.windows(2).all(|w| w[1].raw() == w[0].raw() + 1),
        }
    }

    /// Iterate over the ids in order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            collection: self,
            next: 0,
            end: self.len(),
        }
    }

    /// Iterate over `(local index, id)` pairs
    pub fn iter_with_lid(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.iter().enumerate()
    }

    /// Copy of the ids as a vector
    pub fn ids(&self) -> Vec<NodeId> {
        self.iter().collect()
    }

    /// Sub-collection of `len` consecutive members starting at local index `start`
    pub fn slice(&self, start: usize, len: usize) -> Result<Self> {
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                KernelError::invalid_collection(format!(
                    "slice {}..{} out of bounds for collection of size {}",
                    start,
                    start.saturating_add(len),
                    self.len()
                ))
            })?;
        match &*self.inner {
            Repr::Range { first, .. } if len > 0 => Self::range(NodeId::new(first + start as u64), len),
            _ => Self::from_ids((start..end).filter_map(|lid| self.get(lid))),
        }
    }
}

impl PartialEq for NodeCollection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.len() == other.len() && self.iter().eq(other.iter()))
    }
}

impl Eq for NodeCollection {}

impl fmt::Debug for NodeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.inner {
            Repr::Range { first, len } if *len > 0 => {
                write!(f, "NodeCollection({}..={})", first, first + *len as u64 - 1)
            }
            _ => f.debug_list().entries(self.iter()).finish(),
        }
    }
}

impl<'a> IntoIterator for &'a NodeCollection {
    type Item = NodeId;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the ids of a [`NodeCollection`]
#[derive(Debug)]
pub struct Iter<'a> {
    collection: &'a NodeCollection,
    next: usize,
    end: usize,
}

impl Iterator for Iter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let id = self.collection.get(self.next);
        self.next += 1;
        id
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}
