//! Rewrites modification annotations into a single canonical spelling so
//! that search-engine sequences and reference sequences can be matched.
//!
//! Replacements are literal (no pattern semantics) and applied in the listed
//! order. The order matters: `C` is expanded to `C(Carbamidomethyl)`, so running
//! [`ModificationConvention::normalize`] twice on the same string is not a no-op.

/// An ordered list of literal `(from, to)` substitutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModificationConvention {
    pub name: &'static str,
    pub replacements: &'static [(&'static str, &'static str)],
}

/// MaxQuant `Modified sequence` annotations, e.g. `_AM(ox)CK_`.
pub const MAXQUANT: ModificationConvention = ModificationConvention {
    name: "maxquant",
    replacements: &[
        ("_", ""),
        ("(ox)", "(Oxidation)"),
        ("(ph)", "(Phospho)"),
        ("C", "C(Carbamidomethyl)"),
        ("(ac)", "(Acetylation)"),
    ],
};

/// UniMod accession annotations, e.g. `AC(UniMod:4)M(UniMod:35)K`.
pub const UNIMOD: ModificationConvention = ModificationConvention {
    name: "unimod",
    replacements: &[
        ("(UniMod:4)", "(Carbamidomethyl)"),
        ("(UniMod:1)", "(Acetylation)"),
        ("(UniMod:35)", "(Oxidation)"),
        ("(UniMod:21)", "(Phospho)"),
    ],
};

impl ModificationConvention {
    pub fn normalize(&self, sequence: &str) -> String {
        let mut out = sequence.to_string();
        for (from, to) in self.replacements {
            if out.contains(from) {
                out = out.replace(from, to);
            }
        }
        out
    }
}
