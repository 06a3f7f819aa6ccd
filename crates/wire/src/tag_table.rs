//! TagTable - interning of tag strings into small integer ids

use std::collections::HashMap;

use bytes::BufMut;
use parking_lot::RwLock;
use tracing::debug;

/// Id of the untagged entry (empty tag string)
pub const UNTAGGED: i32 = 0;

/// Append-only string → id table.
///
/// Ids are minted sequentially from `1` in first-seen order; `0` is reserved
/// for the empty tag. Safe to share between producer threads.
#[derive(Debug)]
pub struct TagTable {
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    ids: HashMap<String, i32>,
    /// Index = id
    names: Vec<String>,
}

impl Default for TagTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TagTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                ids: HashMap::new(),
                names: vec![String::new()],
            }),
        }
    }

    /// Id for `tag`, minting a new one on first sight
    pub fn get_tag_id(&self, tag: &str) -> i32 {
        if tag.is_empty() {
            return UNTAGGED;
        }

        if let Some(&id) = self.inner.read().ids.get(tag) {
            return id;
        }

        let mut inner = self.inner.write();
        // Another thread may have minted it between the two locks
        if let Some(&id) = inner.ids.get(tag) {
            return id;
        }

        let id = inner.names.len() as i32;
        inner.names.push(tag.to_string());
        inner.ids.insert(tag.to_string(), id);
        debug!(tag, id, "Minted tag id");
        id
    }

    /// Tag string for `id`
    pub fn tag_name(&self, id: i32) -> Option<String> {
        let inner = self.inner.read();
        usize::try_from(id).ok().and_then(|i| inner.names.get(i).cloned())
    }

    /// Number of minted tags (excluding the reserved untagged id)
    pub fn len(&self) -> usize {
        self.inner.read().names.len() - 1
    }

    /// Whether no tag has been minted yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the dictionary for `ids`: `i32 count`, then `(i32 id, i32 len, utf8)` per id.
    ///
    /// Ids must be distinct; unknown ids are written with an empty name.
    pub fn write<B: BufMut>(&self, ids: &[i32], out: &mut B) {
        let inner = self.inner.read();

        out.put_i32_le(ids.len() as i32);
        for &id in ids {
            let name = usize::try_from(id)
                .ok()
                .and_then(|i| inner.names.get(i))
                .map(String::as_str)
                .unwrap_or_default();

            out.put_i32_le(id);
            out.put_i32_le(name.len() as i32);
            out.put_slice(name.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_are_sequential_and_stable() {
        let table = TagTable::new();
        assert_eq!(table.get_tag_id("Sales.OrderPlaced"), 1);
        assert_eq!(table.get_tag_id("Sales.OrderBilled"), 2);
        assert_eq!(table.get_tag_id("Sales.OrderPlaced"), 1);
        assert_eq!(table.get_tag_id(""), UNTAGGED);
        assert_eq!(table.len(), 2);
        assert_eq!(table.tag_name(2).as_deref(), Some("Sales.OrderBilled"));
        assert_eq!(table.tag_name(0).as_deref(), Some(""));
        assert_eq!(table.tag_name(9), None);
    }

    #[test]
    fn test_write_only_requested_ids() {
        let table = TagTable::new();
        table.get_tag_id("a");
        table.get_tag_id("bc");
        table.get_tag_id("def");

        let mut out = Vec::new();
        table.write(&[2], &mut out);

        let mut expected = Vec::new();
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(&2i32.to_le_bytes());
        expected.extend_from_slice(b"bc");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_concurrent_minting_yields_unique_ids() {
        let table = Arc::new(TagTable::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    (0..100)
                        .map(|i| table.get_tag_id(&format!("tag-{}", i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<i32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for other in &results[1..] {
            assert_eq!(other, &results[0]);
        }
        assert_eq!(table.len(), 100);
    }
}
