//! Documents are user-authored notes. [document_store::DocumentStore] keeps them in memory and
//! writes the whole collection under the `documents` key after every change.

pub mod document_store;
pub mod entities;
pub mod samples;
