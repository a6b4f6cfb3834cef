//! Lossless MusicXML tree.
//!
//! The document is read with `quick-xml` into an arena of nodes, each holding
//! the exact bytes it was parsed from. Serializing writes those bytes back, so
//! everything outside the pitch fields that were rewritten comes out
//! byte-for-byte identical to the input. Callers hold [`NodeId`] handles into
//! the arena and mutate through `&mut Document`.

use crate::domain::model::{Pitch, Step};
use crate::utils::error::{Result, TransposeError};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Handle to a `<note>` element of a live [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteElement(NodeId);

impl NoteElement {
    pub fn node(self) -> NodeId {
        self.0
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        name: String,
        open: Vec<u8>,
        /// `None` for a self-closing element.
        close: Option<Vec<u8>>,
        children: Vec<NodeId>,
    },
    Text(Vec<u8>),
    CData(Vec<u8>),
    /// Declaration, doctype, comment or processing instruction.
    Markup(Vec<u8>),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
}

/// Serialization work item: emit a node, or the closing tag of an element
/// whose children are done.
#[derive(Debug, Clone, Copy)]
enum Walk {
    Enter(NodeId),
    Leave(NodeId),
}

#[derive(Debug, Clone)]
pub struct Document {
    /// UTF-8 byte order mark, kept so it is written back.
    bom: Vec<u8>,
    nodes: Vec<Node>,
    /// Prolog, root element and trailing misc, in order.
    top: Vec<NodeId>,
    root: NodeId,
}

/// The `<pitch>` grouping of one note and its sub-elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchNodes {
    pub pitch: NodeId,
    pub step: Option<NodeId>,
    pub alter: Option<NodeId>,
    pub octave: Option<NodeId>,
}

/// Why a `<pitch>` could not be read. Such notes are passed through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedPitch {
    #[error("missing <step>")]
    MissingStep,
    #[error("missing <octave>")]
    MissingOctave,
    #[error("unknown step '{0}'")]
    UnknownStep(String),
    #[error("alter '{0}' is not a whole number of semitones")]
    InvalidAlter(String),
    #[error("octave '{0}' is not an integer")]
    InvalidOctave(String),
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn parse_error(message: impl Into<String>) -> TransposeError {
    TransposeError::document(message)
}

fn element_name(raw: &[u8]) -> Result<String> {
    String::from_utf8(raw.to_vec()).map_err(|_| parse_error("element name is not valid UTF-8"))
}

impl Document {
    pub fn parse(bytes: &[u8]) -> Result<Document> {
        let (bom, bytes) = match bytes.strip_prefix(UTF8_BOM) {
            Some(rest) => (UTF8_BOM.to_vec(), rest),
            None => (Vec::new(), bytes),
        };
        std::str::from_utf8(bytes)
            .map_err(|e| parse_error(format!("document is not valid UTF-8: {}", e)))?;
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(false);

        let mut doc = Document {
            bom,
            nodes: Vec::new(),
            top: Vec::new(),
            root: NodeId(0),
        };
        let mut root = None;
        let mut stack: Vec<NodeId> = Vec::new();
        let mut start = 0usize;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(parse_error(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            };
            let end = reader.buffer_position();
            let raw = bytes[start..end].to_vec();
            start = end;

            let kind = match event {
                Event::Start(ref e) => NodeKind::Element {
                    name: element_name(e.name().as_ref())?,
                    open: raw,
                    close: Some(Vec::new()),
                    children: Vec::new(),
                },
                Event::Empty(ref e) => NodeKind::Element {
                    name: element_name(e.name().as_ref())?,
                    open: raw,
                    close: None,
                    children: Vec::new(),
                },
                Event::End(ref e) => {
                    let open = stack.pop().ok_or_else(|| {
                        parse_error(format!("unexpected closing tag at position {}", end))
                    })?;
                    let name = e.name();
                    match &mut doc.nodes[open.0].kind {
                        NodeKind::Element {
                            name: open_name,
                            close,
                            ..
                        } if open_name.as_bytes() == name.as_ref() => *close = Some(raw),
                        _ => {
                            return Err(parse_error(format!(
                                "mismatched closing tag at position {}",
                                end
                            )))
                        }
                    }
                    continue;
                }
                Event::Text(_) => {
                    if stack.is_empty() && !raw.iter().all(u8::is_ascii_whitespace) {
                        return Err(parse_error("text outside the root element"));
                    }
                    NodeKind::Text(raw)
                }
                Event::CData(_) => {
                    if stack.is_empty() {
                        return Err(parse_error("CDATA outside the root element"));
                    }
                    NodeKind::CData(raw)
                }
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {
                    NodeKind::Markup(raw)
                }
                Event::Eof => break,
            };

            let is_element = matches!(kind, NodeKind::Element { .. });
            let opens = matches!(kind, NodeKind::Element { close: Some(_), .. });
            let parent = stack.last().copied();
            if is_element && parent.is_none() {
                if root.is_some() {
                    return Err(parse_error("more than one root element"));
                }
                root = Some(NodeId(doc.nodes.len()));
            }

            let id = doc.push(kind, parent);
            match parent {
                Some(parent) => {
                    if let Some(children) = doc.children_mut(parent) {
                        children.push(id);
                    }
                }
                None => doc.top.push(id),
            }
            if opens {
                stack.push(id);
            }
        }

        if let Some(open) = stack.last() {
            let name = doc.name(*open).unwrap_or_default();
            return Err(parse_error(format!("unclosed element <{}>", name)));
        }

        doc.root = root.ok_or_else(|| parse_error("document has no root element"))?;
        Ok(doc)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.bom.clone();
        for id in &self.top {
            self.write_node(*id, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut Vec<u8>) {
        let mut pending = vec![Walk::Enter(id)];

        while let Some(step) = pending.pop() {
            let id = match step {
                Walk::Enter(id) => id,
                Walk::Leave(id) => {
                    if let NodeKind::Element {
                        close: Some(close), ..
                    } = &self.nodes[id.0].kind
                    {
                        out.extend_from_slice(close);
                    }
                    continue;
                }
            };

            match &self.nodes[id.0].kind {
                NodeKind::Element { open, children, .. } => {
                    out.extend_from_slice(open);
                    pending.push(Walk::Leave(id));
                    pending.extend(children.iter().rev().map(|child| Walk::Enter(*child)));
                }
                NodeKind::Text(raw) | NodeKind::CData(raw) | NodeKind::Markup(raw) => {
                    out.extend_from_slice(raw)
                }
            }
        }
    }

    /// Every `<note>` element, in document order.
    pub fn note_elements(&self) -> Vec<NoteElement> {
        let mut notes = Vec::new();
        let mut pending = vec![self.root];

        while let Some(id) = pending.pop() {
            if self.name(id) == Some("note") {
                notes.push(NoteElement(id));
            }
            // reversed so the leftmost child is visited first
            pending.extend(self.children(id).iter().rev());
        }

        notes
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    /// First child element called `name`.
    pub fn child_element(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|child| self.name(*child) == Some(name))
    }

    /// Concatenated, unescaped text of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> Option<String> {
        let mut text = String::new();
        let mut pending = vec![id];

        while let Some(id) = pending.pop() {
            match &self.nodes[id.0].kind {
                NodeKind::Element { children, .. } => pending.extend(children.iter().rev()),
                NodeKind::Text(raw) => {
                    let raw = std::str::from_utf8(raw).ok()?;
                    text.push_str(&unescape(raw).ok()?);
                }
                NodeKind::CData(raw) => {
                    let raw = std::str::from_utf8(raw).ok()?;
                    let inner = raw
                        .strip_prefix("<![CDATA[")
                        .and_then(|r| r.strip_suffix("]]>"))
                        .unwrap_or(raw);
                    text.push_str(inner);
                }
                NodeKind::Markup(_) => {}
            }
        }

        Some(text)
    }

    /// Replace the content of element `id` with the text `value`.
    pub fn set_text(&mut self, id: NodeId, value: &str) {
        let text = self.push(NodeKind::Text(escape(value).as_bytes().to_vec()), Some(id));
        let detached = match &mut self.nodes[id.0].kind {
            NodeKind::Element {
                name,
                open,
                close,
                children,
            } => {
                if close.is_none() {
                    // <alter/> becomes <alter>value</alter>
                    if open.ends_with(b"/>") {
                        open.truncate(open.len() - 2);
                        open.push(b'>');
                    }
                    *close = Some(format!("</{}>", name).into_bytes());
                }
                std::mem::replace(children, vec![text])
            }
            _ => return,
        };
        for child in detached {
            self.nodes[child.0].parent = None;
        }
    }

    /// Create a detached `<name>value</name>` element.
    pub fn create_element(&mut self, name: &str, value: &str) -> NodeId {
        let id = self.push(
            NodeKind::Element {
                name: name.to_string(),
                open: format!("<{}>", name).into_bytes(),
                close: Some(format!("</{}>", name).into_bytes()),
                children: Vec::new(),
            },
            None,
        );
        self.set_text(id, value);
        id
    }

    /// Insert the detached node `new` into `parent` just before `reference`,
    /// or at the end when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, new: NodeId, reference: Option<NodeId>) {
        let Some(children) = self.children_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|r| children.iter().position(|c| *c == r))
            .unwrap_or(children.len());
        children.insert(index, new);
        self.nodes[new.0].parent = Some(parent);
    }

    /// Detach `id` from its parent. Surrounding whitespace is left as is.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            if let Some(children) = self.children_mut(parent) {
                children.retain(|c| *c != id);
            }
        }
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, parent });
        id
    }

    fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn pitch_nodes(&self, note: NoteElement) -> Option<PitchNodes> {
        let pitch = self.child_element(note.0, "pitch")?;
        Some(PitchNodes {
            pitch,
            step: self.child_element(pitch, "step"),
            alter: self.child_element(pitch, "alter"),
            octave: self.child_element(pitch, "octave"),
        })
    }

    fn field_text(&self, field: Option<NodeId>) -> Option<String> {
        field
            .and_then(|id| self.text_content(id))
            .map(|text| text.trim().to_string())
    }

    pub fn read_pitch(&self, nodes: &PitchNodes) -> std::result::Result<Pitch, MalformedPitch> {
        let step_text = self
            .field_text(nodes.step)
            .ok_or(MalformedPitch::MissingStep)?;
        let octave_text = self
            .field_text(nodes.octave)
            .ok_or(MalformedPitch::MissingOctave)?;

        let step: Step = step_text
            .parse()
            .map_err(|_| MalformedPitch::UnknownStep(step_text.clone()))?;
        let octave = octave_text
            .parse::<i32>()
            .map_err(|_| MalformedPitch::InvalidOctave(octave_text.clone()))?;
        // an empty <alter/> reads like an absent one
        let alter = match self.field_text(nodes.alter) {
            None => 0,
            Some(text) if text.is_empty() => 0,
            Some(text) => parse_alter(&text).ok_or(MalformedPitch::InvalidAlter(text))?,
        };

        Ok(Pitch::new(step, alter, octave))
    }

    pub fn set_step(&mut self, nodes: &PitchNodes, step: Step) {
        if let Some(id) = nodes.step {
            self.set_text(id, step.as_str());
        }
    }

    pub fn set_octave(&mut self, nodes: &PitchNodes, octave: i32) {
        if let Some(id) = nodes.octave {
            self.set_text(id, &octave.to_string());
        }
    }

    /// Zero removes `<alter>`; anything else rewrites it, creating it right
    /// before `<octave>` when missing.
    pub fn set_alter(&mut self, nodes: &mut PitchNodes, alter: i32) {
        match (alter, nodes.alter) {
            (0, Some(id)) => {
                self.remove(id);
                nodes.alter = None;
            }
            (0, None) => {}
            (value, Some(id)) => self.set_text(id, &value.to_string()),
            (value, None) => {
                let id = self.create_element("alter", &value.to_string());
                self.insert_before(nodes.pitch, id, nodes.octave);
                nodes.alter = Some(id);
            }
        }
    }

    pub fn write_pitch(&mut self, nodes: &mut PitchNodes, pitch: &Pitch) {
        self.set_step(nodes, pitch.step);
        self.set_alter(nodes, pitch.alter);
        self.set_octave(nodes, pitch.octave);
    }
}

/// Integer alters, plus decimals with no fractional part (`1.0`).
fn parse_alter(text: &str) -> Option<i32> {
    if let Ok(value) = text.parse::<i32>() {
        return Some(value);
    }
    let value = text.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= f64::from(i32::MAX) {
        Some(value as i32)
    } else {
        None
    }
}
