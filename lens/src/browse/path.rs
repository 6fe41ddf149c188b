//! Content type paths for drill-down navigation.
//!
//! A path is a `/`-separated list of segments. Every segment but the last
//! names a content type together with the row selected in it, as
//! `type?<id>` where `<id>` is the URL-safe base64 encoding of the row id:
//!
//! ```text
//! artist?YTE=/album?YjI=/track
//! ```

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;

use crate::error::{Error, Result};

const SEPARATOR: char = '/';
const SELECTION: char = '?';

/// One decoded path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub content_type: String,
    /// Id of the row selected in this content type.
    pub selection: Option<String>,
}

pub fn encode_id(id: &str) -> String {
    URL_SAFE.encode(id.as_bytes())
}

pub fn decode_id(encoded: &str) -> Result<String> {
    let bytes = URL_SAFE
        .decode(encoded)
        .map_err(|e| Error::InvalidArgument(format!("invalid selection '{}': {}", encoded, e)))?;
    String::from_utf8(bytes)
        .map_err(|e| Error::InvalidArgument(format!("invalid selection '{}': {}", encoded, e)))
}

/// Decode every segment of `path`.
pub fn segments(path: &str) -> Result<Vec<Segment>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split(SEPARATOR)
        .map(|segment| match segment.split_once(SELECTION) {
            Some((content_type, encoded)) => Ok(Segment {
                content_type: content_type.to_string(),
                selection: Some(decode_id(encoded)?),
            }),
            None => Ok(Segment {
                content_type: segment.to_string(),
                selection: None,
            }),
        })
        .collect()
}

/// Content type of the last segment, without any selection.
pub fn leaf_type(path: &str) -> &str {
    let last = path.rsplit(SEPARATOR).next().unwrap_or(path);
    last.split(SELECTION).next().unwrap_or(last)
}

/// Path reached by selecting `item_id` in `path` and descending into
/// `child_type`.
pub fn descend(path: &str, item_id: &str, child_type: &str) -> String {
    format!(
        "{}{}{}{}{}",
        path,
        SELECTION,
        encode_id(item_id),
        SEPARATOR,
        child_type
    )
}

/// Parent path: drops the last segment and the selection of the new last
/// one. `None` at the top level.
pub fn ascend(path: &str) -> Option<String> {
    let (parent, _) = path.rsplit_once(SEPARATOR)?;
    let parent = match parent.rsplit_once(SEPARATOR) {
        Some((head, last)) => format!("{}{}{}", head, SEPARATOR, strip_selection(last)),
        None => strip_selection(parent).to_string(),
    };
    Some(parent)
}

/// Number of segments; a path of two or more segments can go back.
pub fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split(SEPARATOR).count()
    }
}

fn strip_selection(segment: &str) -> &str {
    segment.split(SELECTION).next().unwrap_or(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descend_and_ascend() {
        let album = descend("artist", "a1", "album");
        assert_eq!(album, format!("artist?{}/album", encode_id("a1")));
        assert_eq!(leaf_type(&album), "album");
        assert_eq!(depth(&album), 2);

        let track = descend(&album, "b2", "track");
        assert_eq!(leaf_type(&track), "track");
        assert_eq!(depth(&track), 3);

        assert_eq!(ascend(&track), Some(album.clone()));
        assert_eq!(ascend(&album).as_deref(), Some("artist"));
        assert_eq!(ascend("artist"), None);
    }

    #[test]
    fn test_ascend_strips_selection_of_new_leaf() {
        let track = format!("artist?{}/album?{}/track", encode_id("a1"), encode_id("b2"));
        assert_eq!(
            ascend(&track),
            Some(format!("artist?{}/album", encode_id("a1")))
        );
    }

    #[test]
    fn test_segments() {
        let path = descend("artist", "Muse/Live", "album");
        let segments = segments(&path).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment {
                    content_type: "artist".into(),
                    selection: Some("Muse/Live".into()),
                },
                Segment {
                    content_type: "album".into(),
                    selection: None,
                },
            ]
        );
    }

    #[test]
    fn test_invalid_selection() {
        assert!(matches!(
            segments("artist?***/album"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_empty_path() {
        assert!(segments("").unwrap().is_empty());
        assert_eq!(depth(""), 0);
        assert_eq!(leaf_type(""), "");
    }
}
