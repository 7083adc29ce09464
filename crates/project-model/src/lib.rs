//! Splice Project Model
//!
//! Defines the data contracts of an export request:
//! - **Clips:** Trimmed source media placed on the author timeline
//! - **Transitions:** Cross-dissolves between adjacent clips
//! - **Overlays:** Time-positioned text in percentage coordinates
//! - **Requests:** The wire envelope sent by the editor
//!
//! Wire shapes use camelCase JSON. All times are seconds on the author
//! timeline unless a type says otherwise.

pub mod clip;
pub mod overlay;
pub mod request;

pub use clip::*;
pub use overlay::*;
pub use request::*;
