//! The MIME part tree of a single message.
//!
//! This is a deliberately small view of a parsed message: just what body
//! selection, charset collection and attachment reporting need.

/// One node of a message's content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    /// Lower-case `type/subtype` (defaults to `text/plain` when undeclared).
    pub content_type: String,
    /// Lower-case `charset` parameter of the `Content-Type` header, if any.
    pub charset: Option<String>,
    /// Lower-case disposition type (`attachment`, `inline`, …) when a
    /// `Content-Disposition` header is present.
    pub disposition: Option<String>,
    /// Attachment filename from `Content-Disposition` or `Content-Type`.
    pub filename: Option<String>,
    /// Children or payload.
    pub body: PartBody,
}

/// A part either contains other parts or carries a payload, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    /// `multipart/*` children, or the root of an embedded `message/rfc822`.
    Container(Vec<MimePart>),
    /// Transfer-decoded payload bytes (still in the part's charset).
    Leaf(Vec<u8>),
}

impl MimePart {
    /// A leaf part with the given content type and payload.
    pub fn leaf(content_type: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.to_ascii_lowercase(),
            charset: None,
            disposition: None,
            filename: None,
            body: PartBody::Leaf(payload.into()),
        }
    }

    /// A container part with the given content type and children.
    pub fn container(content_type: &str, children: Vec<MimePart>) -> Self {
        Self {
            content_type: content_type.to_ascii_lowercase(),
            charset: None,
            disposition: None,
            filename: None,
            body: PartBody::Container(children),
        }
    }

    /// Set the declared charset (builder style).
    pub fn with_charset(mut self, charset: &str) -> Self {
        self.charset = Some(charset.to_ascii_lowercase());
        self
    }

    /// Mark the part as carrying a `Content-Disposition` (builder style).
    pub fn with_disposition(mut self, disposition: &str, filename: Option<&str>) -> Self {
        self.disposition = Some(disposition.to_ascii_lowercase());
        self.filename = filename.map(String::from);
        self
    }

    /// `true` for `multipart/*` content types.
    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/")
    }

    /// `true` when the part has a plaintext content type.
    pub fn is_plain_text(&self) -> bool {
        self.content_type == "text/plain"
    }

    /// Payload of a leaf part.
    pub fn payload(&self) -> Option<&[u8]> {
        match &self.body {
            PartBody::Leaf(bytes) => Some(bytes),
            PartBody::Container(_) => None,
        }
    }

    /// Children of a container part (empty for leaves).
    pub fn children(&self) -> &[MimePart] {
        match &self.body {
            PartBody::Container(children) => children,
            PartBody::Leaf(_) => &[],
        }
    }

    /// Depth-first, pre-order iterator over this part and all descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Pre-order traversal of a [`MimePart`] tree.
pub struct Walk<'a> {
    stack: Vec<&'a MimePart>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a MimePart;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.stack.pop()?;
        // Reverse so the first child is visited first.
        self.stack.extend(part.children().iter().rev());
        Some(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_is_preorder() {
        let tree = MimePart::container(
            "multipart/mixed",
            vec![
                MimePart::container(
                    "multipart/alternative",
                    vec![
                        MimePart::leaf("text/plain", "a"),
                        MimePart::leaf("text/html", "b"),
                    ],
                ),
                MimePart::leaf("image/png", "c"),
            ],
        );
        let order: Vec<&str> = tree.walk().map(|p| p.content_type.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "multipart/mixed",
                "multipart/alternative",
                "text/plain",
                "text/html",
                "image/png"
            ]
        );
    }

    #[test]
    fn test_leaf_and_container_accessors() {
        let leaf = MimePart::leaf("Text/Plain", "hi").with_charset("UTF-8");
        assert!(leaf.is_plain_text());
        assert_eq!(leaf.charset.as_deref(), Some("utf-8"));
        assert_eq!(leaf.payload(), Some(&b"hi"[..]));
        assert!(leaf.children().is_empty());

        let container = MimePart::container("multipart/mixed", vec![leaf]);
        assert!(container.is_multipart());
        assert!(container.payload().is_none());
        assert_eq!(container.children().len(), 1);
    }
}
