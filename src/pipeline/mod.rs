//! Pipeline stages shared by the three phases.
//!
//! Each submodule implements one step and is pure or close to it, so every
//! stage is testable without touching the orchestrators.
//!
//! ## Data Flow
//!
//! ```text
//! select ──▶ detect ──▶ cleanup ──▶ escape          (sanitize)
//! select ──▶ poppler ──▶ markers                     (extract)
//! select ──▶ index + sections                        (bundle)
//! ```
//!
//! 1. [`select`]  turns explicit lists, extension sets and globs into sorted
//!    file lists
//! 2. [`detect`]  decides whether a file is text at all
//! 3. [`cleanup`] runs the structural text passes and owns the [`Sanitizer`]
//! 4. [`escape`]  the ASCII normaliser; its output never contains a byte
//!    above 0x7F
//! 5. [`poppler`] the [`PageExtractor`] seam and its poppler implementation
//! 6. [`atomic`]  temp-file-and-rename writes used by every phase
//!
//! [`Sanitizer`]: cleanup::Sanitizer
//! [`PageExtractor`]: poppler::PageExtractor

pub mod atomic;
pub mod cleanup;
pub mod detect;
pub mod escape;
pub mod poppler;
pub mod select;
