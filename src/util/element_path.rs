use std::io::Read;

use xml::reader::{EventReader, XmlEvent};

/// Tracks the element nesting of a streaming XML parse as a stack of names.
///
/// The two predicates are what descriptor parsers key their capture logic on:
/// `matches` for "I am exactly here", `parent_matches` to scope character
/// data to direct children of a known element so that nested structures
/// cannot pollute sibling fields.
pub struct ElementPath {
    segments: Vec<String>,
}

impl ElementPath {
    pub fn new() -> ElementPath {
        ElementPath {
            segments: Vec::new(),
        }
    }

    pub fn enter(&mut self, name: impl Into<String>) {
        self.segments.push(name.into());
    }

    pub fn leave(&mut self) {
        self.segments.pop();
    }

    pub fn matches(&self, expected: &[&str]) -> bool {
        self.segments.len() == expected.len()
            && self.segments.iter().zip(expected).all(|(s, e)| s == e)
    }

    pub fn parent_matches(&self, expected: &[&str]) -> bool {
        self.segments.len() == expected.len() + 1
            && self.segments.iter().zip(expected).all(|(s, e)| s == e)
    }

    pub fn current(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl Default for ElementPath {
    fn default() -> ElementPath {
        ElementPath::new()
    }
}

/// Callbacks a dialect parser registers with `walk_document`.
///
/// `end_element` fires while the closing element is still on the path.
pub trait ElementHandler {
    fn text(&mut self, path: &ElementPath, text: &str) -> anyhow::Result<()>;

    fn end_element(&mut self, _path: &ElementPath) -> anyhow::Result<()> {
        Ok(())
    }
}

pub fn walk_document<R: Read>(input: R, handler: &mut impl ElementHandler) -> anyhow::Result<()> {
    let mut path = ElementPath::new();
    for event in EventReader::new(input) {
        match event? {
            XmlEvent::StartElement { name, .. } => {
                path.enter(name.local_name);
            }
            XmlEvent::EndElement { .. } => {
                handler.end_element(&path)?;
                path.leave();
            }
            XmlEvent::Characters(text) => {
                handler.text(&path, &text)?;
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;

    fn path_of(segments: &[&str]) -> ElementPath {
        let mut path = ElementPath::new();
        for segment in segments {
            path.enter(*segment);
        }
        path
    }

    #[rstest]
    #[case::exact(&["a", "b"], &["a", "b"], true)]
    #[case::shorter(&["a"], &["a", "b"], false)]
    #[case::longer(&["a", "b", "c"], &["a", "b"], false)]
    #[case::different(&["a", "x"], &["a", "b"], false)]
    #[case::empty(&[], &[], true)]
    fn test_matches(#[case] actual: &[&str], #[case] expected: &[&str], #[case] matched: bool) {
        assert_eq!(path_of(actual).matches(expected), matched);
    }

    #[rstest]
    #[case::direct_child(&["a", "b", "c"], &["a", "b"], true)]
    #[case::self_depth(&["a", "b"], &["a", "b"], false)]
    #[case::grand_child(&["a", "b", "c", "d"], &["a", "b"], false)]
    #[case::sibling_branch(&["a", "x", "c"], &["a", "b"], false)]
    fn test_parent_matches(#[case] actual: &[&str], #[case] expected: &[&str], #[case] matched: bool) {
        assert_eq!(path_of(actual).parent_matches(expected), matched);
    }

    struct Recorder {
        texts: Vec<(String, String)>,
        ends: Vec<String>,
    }

    impl ElementHandler for Recorder {
        fn text(&mut self, path: &ElementPath, text: &str) -> anyhow::Result<()> {
            self.texts
                .push((path.current().unwrap_or("").to_string(), text.to_string()));
            Ok(())
        }

        fn end_element(&mut self, path: &ElementPath) -> anyhow::Result<()> {
            self.ends.push(path.current().unwrap_or("").to_string());
            Ok(())
        }
    }

    #[test]
    fn test_walk_document() {
        let xml = "<root><one>first</one><two><inner>deep</inner></two></root>";
        let mut recorder = Recorder {
            texts: Vec::new(),
            ends: Vec::new(),
        };
        walk_document(xml.as_bytes(), &mut recorder).unwrap();

        assert_eq!(
            recorder.texts,
            vec![
                ("one".to_string(), "first".to_string()),
                ("inner".to_string(), "deep".to_string()),
            ]
        );
        // the closing element is still on the path when end_element fires
        assert_eq!(recorder.ends, vec!["one", "inner", "two", "root"]);
    }

    #[test]
    fn test_walk_document_malformed() {
        let xml = "<root><unclosed></root>";
        let mut recorder = Recorder {
            texts: Vec::new(),
            ends: Vec::new(),
        };
        assert!(walk_document(xml.as_bytes(), &mut recorder).is_err());
    }
}
