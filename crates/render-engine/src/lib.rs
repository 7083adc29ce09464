//! Splice Render Engine
//!
//! Executes compiled timelines with an external transcoder, turning an
//! export request into a single finished video file.
//!
//! # Pipeline Architecture
//!
//! ```text
//! request.json ──┐
//!                ├── Compile (normalize, plan, remap)
//! sources ───────┘         │
//!     │                    ├── Fetch ──► work_dir/input_k.*
//!     │                    │
//!     └────────────────────├── Trim (re-encode, per clip)
//!                          │
//!                          ├── Crossfade (xfade/acrossfade, per run)
//!                          │
//!                          ├── Concat (stream copy)
//!                          │
//! textOverlays ────────────├── Overlay (drawtext chain)
//!                          ▼
//!                      output.mp4
//! ```

pub mod export;
pub mod fetch;
pub mod ffmpeg;
pub mod plan;

pub use export::*;
