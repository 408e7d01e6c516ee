//! Small in-memory PDFs for tests
//!
//! Each page draws a single marker string so page identity survives
//! merge and split.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::service::pdf::save;

/// Build a PDF with one page per marker
///
/// # Panics
///
/// Panics if lopdf cannot encode the generated objects.
pub fn pdf_with_pages(markers: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for marker in markers {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tj", vec![Object::string_literal(*marker)]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content.encode().expect("encode page content");
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).expect("page count fits i64");
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    save(&mut doc).expect("serialize fixture")
}

/// Decoded content stream of every page, in page order
///
/// # Panics
///
/// Panics if `bytes` is not a loadable PDF.
pub fn page_contents(bytes: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(bytes).expect("load fixture");
    doc.get_pages()
        .into_values()
        .map(|page_id| doc.get_page_content(page_id).expect("page content"))
        .collect()
}

/// One-page PDF whose `MediaBox` lives only on the `Pages` node
///
/// # Panics
///
/// Panics if lopdf cannot encode the generated objects.
pub fn pdf_with_tree_media_box(marker: &str, width: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tj", vec![Object::string_literal(marker)]),
            Operation::new("ET", vec![]),
        ],
    };
    let encoded = content.encode().expect("encode page content");
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width),
                Object::Integer(842),
            ],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    save(&mut doc).expect("serialize fixture")
}

/// Effective `MediaBox` width of every page, resolved through the page tree
///
/// # Panics
///
/// Panics if `bytes` is not a loadable PDF or a page has no `MediaBox`.
pub fn media_box_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).expect("load fixture");
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let mut node = doc.get_dictionary(page_id).expect("page dictionary");
            loop {
                if let Ok(media_box) = node.get(b"MediaBox").and_then(Object::as_array) {
                    return media_box[2].as_i64().expect("integer width");
                }
                let parent = node
                    .get(b"Parent")
                    .and_then(Object::as_reference)
                    .expect("MediaBox somewhere in the page tree");
                node = doc.get_dictionary(parent).expect("parent dictionary");
            }
        })
        .collect()
}
