//! Page document model.
//!
//! A minimal element tree the page observer scans. Hosts build it from the
//! live document; tests build it by hand.

// ============================================================================
// DomNode
// ============================================================================

/// One element with its attributes, own text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomNode {
    /// Lowercase tag name.
    tag: String,
    /// Attributes in document order.
    attributes: Vec<(String, String)>,
    /// Text content (script bodies, mostly).
    text: String,
    /// Child elements.
    children: Vec<DomNode>,
}

impl DomNode {
    /// Creates an element with the given tag.
    #[must_use]
    pub fn element(tag: impl AsRef<str>) -> Self {
        Self {
            tag: tag.as_ref().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a child element.
    #[must_use]
    pub fn with_child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns the lowercase tag name.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns `true` if the element has the given tag.
    #[inline]
    #[must_use]
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Returns an attribute value; names compare case-insensitively.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the text content.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the child elements.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[DomNode] {
        &self.children
    }

    /// Iterates this node and every descendant in document order.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order iterator over a subtree.
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a DomNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a DomNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

// ============================================================================
// PageSnapshot
// ============================================================================

/// The document as it stood when the page became ready.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    /// Document root.
    pub root: DomNode,
    /// Serialized markup of the whole document.
    pub markup: String,
}

impl PageSnapshot {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(root: DomNode, markup: impl Into<String>) -> Self {
        Self {
            root,
            markup: markup.into(),
        }
    }
}

// ============================================================================
// MutationBatch
// ============================================================================

/// Nodes inserted into the document by one mutation callback.
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// Inserted subtrees.
    pub added: Vec<DomNode>,
}

impl MutationBatch {
    /// Creates a batch of inserted nodes.
    #[must_use]
    pub fn added(nodes: impl IntoIterator<Item = DomNode>) -> Self {
        Self {
            added: nodes.into_iter().collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendants_document_order() {
        let tree = DomNode::element("BODY")
            .with_child(
                DomNode::element("div").with_child(DomNode::element("video").with_attr("SRC", "a")),
            )
            .with_child(DomNode::element("script").with_text("var x;"));

        let tags: Vec<_> = tree.descendants().map(DomNode::tag).collect();
        assert_eq!(tags, ["body", "div", "video", "script"]);
    }

    #[test]
    fn test_attr_lookup() {
        let node = DomNode::element("div")
            .with_attr("data-src", "")
            .with_attr("Data-Video", "x");

        assert_eq!(node.attr("data-src"), Some(""));
        assert_eq!(node.attr("data-video"), Some("x"));
        assert_eq!(node.attr("data-stream"), None);
        assert!(node.is("DIV"));
    }
}
