//! lopdf-backed Document Service

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

use super::DocumentService;
use crate::error::{DocumentError, Result};

/// Document service operating on the lopdf object model
#[derive(Clone, Copy, Debug, Default)]
pub struct LopdfService;

impl LopdfService {
    pub const fn new() -> Self {
        Self
    }
}

fn load(bytes: &[u8], index: usize) -> Result<Document> {
    Document::load_mem(bytes)
        .map_err(|e| DocumentError::InvalidDocument(format!("document {}: {e}", index + 1)))
}

pub(crate) fn save(document: &mut Document) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    document
        .save_to(&mut buffer)
        .map_err(|e| DocumentError::Write(e.to_string()))?;
    Ok(buffer)
}

fn type_name(object: &Object) -> &str {
    object.type_name().unwrap_or_default()
}

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Bound on `Parent` hops; malformed files can contain cycles
const MAX_TREE_DEPTH: usize = 64;

/// The page dictionary with inherited attributes made explicit
fn page_with_inherited(document: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = document.get_dictionary(page_id)?.clone();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node) = parent.and_then(|id| document.get_dictionary(id).ok()) else {
            break;
        };
        for key in INHERITABLE {
            if page.has(key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                page.set(key, value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}

impl DocumentService for LopdfService {
    fn merge(&self, documents: &[Vec<u8>]) -> Result<Vec<u8>> {
        if documents.is_empty() {
            return Err(DocumentError::InvalidDocument("no documents supplied".into()));
        }

        // Give every input a disjoint id range, then pool pages and objects.
        let mut max_id = 1;
        let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

        for (index, bytes) in documents.iter().enumerate() {
            let mut document = load(bytes, index)?;
            document.renumber_objects_with(max_id);
            max_id = document.max_id + 1;

            // Each page keeps the geometry and resources of its own tree
            for page_id in document.get_pages().into_values() {
                pages.push((page_id, page_with_inherited(&document, page_id)?));
            }
            objects.extend(document.objects);
        }

        let mut merged = Document::with_version("1.5");
        let mut catalog: Option<(ObjectId, Dictionary)> = None;
        let mut page_tree: Option<(ObjectId, Dictionary)> = None;

        for (object_id, object) in objects {
            match type_name(&object) {
                "Catalog" => {
                    if catalog.is_none() {
                        catalog = Some((object_id, object.as_dict()?.clone()));
                    }
                }
                "Pages" => {
                    let mut dictionary = object.as_dict()?.clone();
                    page_tree = Some(match page_tree.take() {
                        Some((id, first)) => {
                            dictionary.extend(&first);
                            (id, dictionary)
                        }
                        None => (object_id, dictionary),
                    });
                }
                // Pages are re-parented below; outlines would point at stale ids.
                "Page" | "Outlines" | "Outline" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }

        let (tree_id, mut tree) = page_tree
            .ok_or_else(|| DocumentError::InvalidDocument("no page tree found".into()))?;
        let (catalog_id, mut catalog) = catalog
            .ok_or_else(|| DocumentError::InvalidDocument("no document catalog found".into()))?;

        let page_count = i64::try_from(pages.len())
            .map_err(|_| DocumentError::InvalidDocument("too many pages".into()))?;
        let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();

        for (page_id, mut page) in pages {
            page.set("Parent", tree_id);
            merged.objects.insert(page_id, Object::Dictionary(page));
        }

        for key in INHERITABLE {
            tree.remove(key);
        }
        tree.set("Count", page_count);
        tree.set("Kids", kids);
        merged.objects.insert(tree_id, Object::Dictionary(tree));

        catalog.set("Pages", tree_id);
        catalog.remove(b"Outlines");
        merged.objects.insert(catalog_id, Object::Dictionary(catalog));

        merged.trailer.set("Root", catalog_id);
        merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
        merged.renumber_objects();
        merged.adjust_zero_pages();

        tracing::debug!(
            inputs = documents.len(),
            pages = page_count,
            "Merged documents"
        );

        save(&mut merged)
    }

    fn split(&self, document: &[u8]) -> Result<Vec<Vec<u8>>> {
        let source = load(document, 0)?;
        let page_numbers: Vec<u32> = source.get_pages().into_keys().collect();

        let parts = page_numbers
            .iter()
            .map(|&keep| {
                let mut single = source.clone();
                let others: Vec<u32> = page_numbers
                    .iter()
                    .copied()
                    .filter(|&number| number != keep)
                    .collect();
                single.delete_pages(&others);
                single.prune_objects();
                single.renumber_objects();
                save(&mut single)
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(pages = parts.len(), "Split document");
        Ok(parts)
    }

    fn compress(&self, document: &[u8]) -> Result<Vec<u8>> {
        load(document, 0)?;
        Ok(document.to_vec())
    }

    fn page_count(&self, document: &[u8]) -> Result<usize> {
        Ok(load(document, 0)?.get_pages().len())
    }

    fn name(&self) -> &str {
        "lopdf"
    }
}
