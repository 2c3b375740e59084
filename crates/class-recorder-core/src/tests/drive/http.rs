use crate::{
    DriveFile, FOLDER_MIME_TYPE,
    drive::http::{children_query, escape_query_literal, folder_query, mime_type_for, parse_range_end},
};

use serde_json::json;

/// WHAT: Quotes and backslashes are escaped in query literals
/// WHY: A class named "Tom's Algebra" must not break the Drive query
#[test]
fn given_name_with_quote_when_escaping_then_quote_backslashed() {
    assert_eq!(escape_query_literal("Tom's"), "Tom\\'s");
    assert_eq!(escape_query_literal("a\\b"), "a\\\\b");
    assert_eq!(escape_query_literal("it\\'s"), "it\\\\\\'s");
}

/// WHAT: Folder query filters by exact name, type, parent and trash
/// WHY: Trashed folders must never be reused
#[test]
fn given_parent_and_name_when_building_query_then_all_filters_present() {
    let query = folder_query("ROOT", "Tom's");

    assert_eq!(
        query,
        format!(
            "name = 'Tom\\'s' and mimeType = '{}' and 'ROOT' in parents and trashed = false",
            FOLDER_MIME_TYPE
        )
    );
    assert_eq!(children_query("abc"), "'abc' in parents and trashed = false");
}

/// WHAT: Range headers yield the last acknowledged byte
/// WHY: The next chunk starts right after it
#[test]
fn given_range_headers_when_parsing_then_end_offset_extracted() {
    assert_eq!(parse_range_end("bytes=0-1048575"), Some(1_048_575));
    assert_eq!(parse_range_end(" bytes=0-0 "), Some(0));
    assert_eq!(parse_range_end("bytes=5-10"), None);
    assert_eq!(parse_range_end("bytes=0-"), None);
    assert_eq!(parse_range_end("0-10"), None);
}

/// WHAT: Known video extensions map to their content types
/// WHY: Drive previews depend on the declared type
#[test]
fn given_extensions_when_mapping_then_video_types_announced() {
    assert_eq!(mime_type_for("mp4"), "video/mp4");
    assert_eq!(mime_type_for("MKV"), "video/x-matroska");
    assert_eq!(mime_type_for("mov"), "video/quicktime");
    assert_eq!(mime_type_for("bin"), "application/octet-stream");
    assert_eq!(mime_type_for(""), "application/octet-stream");
}

/// WHAT: File resources parse with missing optional fields
/// WHY: Create responses only carry the fields requested
#[test]
#[allow(clippy::unwrap_used)]
fn given_minimal_resource_when_parsing_then_view_url_falls_back() {
    // Given: A resource with only an id and name
    let file: DriveFile = serde_json::from_value(json!({ "id": "abc", "name": "x.mp4" })).unwrap();

    // Then: The view URL is built from the id
    assert!(!file.is_folder());
    assert_eq!(file.view_url(), "https://drive.google.com/file/d/abc/view");
}

/// WHAT: A webViewLink from Drive is preferred over the fallback
/// WHY: Shared drives may use a different link form
#[test]
#[allow(clippy::unwrap_used)]
fn given_resource_with_link_when_parsing_then_link_used() {
    let file: DriveFile = serde_json::from_value(json!({
        "id": "abc",
        "name": "Algebra",
        "mimeType": FOLDER_MIME_TYPE,
        "webViewLink": "https://drive.google.com/drive/folders/abc"
    }))
    .unwrap();

    assert!(file.is_folder());
    assert_eq!(file.view_url(), "https://drive.google.com/drive/folders/abc");
}
