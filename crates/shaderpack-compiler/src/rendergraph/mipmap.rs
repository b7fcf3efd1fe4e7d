//! Mip validity tracking for main color targets
//!
//! Validity is sticky: once a side is marked valid it stays valid for the
//! rest of the lowering run, even if a later pass writes that side without
//! requesting fresh mips. Shader packs depend on this behavior.

use std::collections::BTreeSet;

/// Which physical sides of each color target hold generated mip levels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorTargetMipmapping {
    main: BTreeSet<u32>,
    alt: BTreeSet<u32>,
}

impl ColorTargetMipmapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable_main(&mut self, index: u32) {
        self.main.insert(index);
    }

    pub fn enable_alt(&mut self, index: u32) {
        self.alt.insert(index);
    }

    /// Marks the main or alt side of a target as mip-valid
    pub fn enable(&mut self, index: u32, alt: bool) {
        if alt { self.enable_alt(index) } else { self.enable_main(index) }
    }

    pub fn is_enabled(&self, index: u32, alt: bool) -> bool {
        if alt { self.alt.contains(&index) } else { self.main.contains(&index) }
    }
}
