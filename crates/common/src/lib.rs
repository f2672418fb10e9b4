// quillwiki-common: page history, text anchors and highlight injection.
//
// Pure domain logic with no I/O; persistence lives in quillwiki-store.

pub mod anchor;
pub mod highlight;
pub mod history;
pub mod key;
pub mod types;
