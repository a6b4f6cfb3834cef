// Adapters layer: the two codecs around the score document.
// container: MXL (zip) archive <-> document bytes
// document: document bytes <-> mutable tree

pub mod container;
pub mod document;

pub use container::ContainerCodec;
pub use document::{Document, NoteElement, PitchNodes};
