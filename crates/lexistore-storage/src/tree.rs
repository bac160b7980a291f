//! Owned XML element trees.
//!
//! Every document the store touches (node files, master documents, grammar
//! documents) is parsed into a [`Document`]: an arena of elements addressed by
//! [`NodeId`] handles. Load/save logic is then written as plain functions over
//! `(document, handle)` without holding references into a parser.
//!
//! Only elements and attributes are modelled. Text, comments and processing
//! instructions are dropped on parse; none of the store's formats use them.

use crate::error::TreeError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl Element {
    fn new(name: impl Into<String>, parent: Option<NodeId>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            parent,
        }
    }
}

/// An element tree with a single root.
///
/// Detached elements stay in the arena but are unreachable from the root, so
/// they are never serialized.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
}

impl Document {
    /// A document holding only an empty root element.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![Element::new(root_name, None)],
            root: NodeId(0),
        }
    }

    pub fn parse(text: &str) -> Result<Self, TreeError> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut nodes: Vec<Element> = Vec::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let id = push_element(&mut nodes, &open, &mut root, &start)?;
                    open.push(id);
                }
                Event::Empty(start) => {
                    push_element(&mut nodes, &open, &mut root, &start)?;
                }
                Event::End(end) => {
                    let name = std::str::from_utf8(end.name().as_ref())?.to_string();
                    match open.pop() {
                        Some(id) if nodes[id.0].name == name => {}
                        _ => return Err(TreeError::Unbalanced(name)),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(id) = open.pop() {
            return Err(TreeError::Unclosed(nodes[id.0].name.clone()));
        }
        let root = root.ok_or(TreeError::MissingRoot)?;
        Ok(Self { nodes, root })
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_xml(&self) -> Result<String, TreeError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_element(&mut writer, self.root)?;
        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|e| TreeError::Utf8(e.utf8_error()))
    }

    fn write_element(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), TreeError> {
        let element = &self.nodes[id.0];
        let mut start = BytesStart::new(element.name.as_str());
        for (key, value) in &element.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if element.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &element.children {
            self.write_element(writer, *child)?;
        }
        writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.0]
            .attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.nodes[id.0]
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set `key`, replacing an existing value in place or appending a new attribute.
    pub fn set_attribute(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let attributes = &mut self.nodes[id.0].attributes;
        match attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => attributes.push((key, value)),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.name(*child) == name)
    }

    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children_named(id, name).next()
    }

    /// `id` followed by each ancestor up to and including the root.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path
    }

    pub fn append_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Element::new(name, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Detach every child of `parent` named `name`.
    pub fn remove_children_named(&mut self, parent: NodeId, name: &str) {
        let children = std::mem::take(&mut self.nodes[parent.0].children);
        let (removed, kept): (Vec<NodeId>, Vec<NodeId>) = children
            .into_iter()
            .partition(|child| self.nodes[child.0].name == name);
        for child in removed {
            self.nodes[child.0].parent = None;
        }
        self.nodes[parent.0].children = kept;
    }

    /// Number of elements reachable from the root (root included).
    pub fn element_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            count += 1;
            stack.extend(self.children(id).iter().copied());
        }
        count
    }
}

fn push_element(
    nodes: &mut Vec<Element>,
    open: &[NodeId],
    root: &mut Option<NodeId>,
    start: &BytesStart<'_>,
) -> Result<NodeId, TreeError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let parent = open.last().copied();
    if parent.is_none() && root.is_some() {
        // A second top-level element: quick-xml accepts it, XML does not.
        return Err(TreeError::Unbalanced(name));
    }

    let mut element = Element::new(name, parent);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }

    let id = NodeId(nodes.len());
    nodes.push(element);
    match parent {
        Some(parent) => nodes[parent.0].children.push(id),
        None => *root = Some(id),
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAMMAR: &str = r#"<?xml version="1.0"?>
<Grammar locale="en">
  <Rule type="N">
    <Bind with="V" order="after"/>
    <Rule type="V,s"/>
  </Rule>
  <!-- comments are dropped -->
  <Rule type="A &amp; B"/>
</Grammar>"#;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = Document::parse(GRAMMAR).unwrap();
        let root = doc.root();
        assert_eq!(doc.name(root), "Grammar");
        assert_eq!(doc.attribute(root, "locale"), Some("en"));

        let rules: Vec<_> = doc.children_named(root, "Rule").collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(doc.attribute(rules[1], "type"), Some("A & B"));

        let bind = doc.first_child_named(rules[0], "Bind").unwrap();
        assert_eq!(doc.attribute(bind, "with"), Some("V"));
        assert_eq!(doc.parent(bind), Some(rules[0]));
        assert_eq!(doc.element_count(), 5);
    }

    #[test]
    fn path_to_root_walks_ancestors() {
        let doc = Document::parse(GRAMMAR).unwrap();
        let outer = doc.first_child_named(doc.root(), "Rule").unwrap();
        let inner = doc.first_child_named(outer, "Rule").unwrap();
        assert_eq!(doc.path_to_root(inner), vec![inner, outer, doc.root()]);
    }

    #[test]
    fn serialization_reparses_to_same_shape() {
        let mut doc = Document::new("Data");
        let root = doc.root();
        doc.set_attribute(root, "symbol", "<run>");
        let flag = doc.append_child(root, "Flag");
        doc.set_attribute(flag, "guid", "pos");
        doc.set_attribute(flag, "link", "verb");

        let text = doc.to_xml().unwrap();
        assert!(text.starts_with("<?xml"));

        let reparsed = Document::parse(&text).unwrap();
        assert_eq!(reparsed.attribute(reparsed.root(), "symbol"), Some("<run>"));
        let flag = reparsed.first_child_named(reparsed.root(), "Flag").unwrap();
        assert_eq!(reparsed.attribute(flag, "link"), Some("verb"));
    }

    #[test]
    fn set_attribute_replaces_in_place() {
        let mut doc = Document::new("Rule");
        let root = doc.root();
        doc.set_attribute(root, "type", "N");
        doc.set_attribute(root, "extra", "1");
        doc.set_attribute(root, "type", "V");
        let attrs: Vec<_> = doc.attributes(root).collect();
        assert_eq!(attrs, vec![("type", "V"), ("extra", "1")]);
    }

    #[test]
    fn removed_children_are_not_serialized() {
        let mut doc = Document::parse(GRAMMAR).unwrap();
        let outer = doc.first_child_named(doc.root(), "Rule").unwrap();
        doc.remove_children_named(outer, "Bind");
        assert!(doc.first_child_named(outer, "Bind").is_none());
        assert!(doc.first_child_named(outer, "Rule").is_some());
        assert!(!doc.to_xml().unwrap().contains("Bind"));
    }

    #[test]
    fn rejects_broken_documents() {
        assert!(matches!(Document::parse(""), Err(TreeError::MissingRoot)));
        assert!(Document::parse("<a><b></a>").is_err());
        assert!(Document::parse("<a>").is_err());
        assert!(Document::parse("<a/><b/>").is_err());
    }
}
