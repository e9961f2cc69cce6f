//! Search rules and classification results
//!
//! Four fixed rules drive how a dotted name maps onto archive
//! records: package init files first, then plain module files, with
//! the compiled/source preference inside each pair controlled by a
//! process-wide `SearchOrder` resolved once.

use once_cell::sync::OnceCell;

/// Suffix of source records
pub const SOURCE_SUFFIX: &str = ".mod";
/// Suffix of compiled-unit records
pub const COMPILED_SUFFIX: &str = ".modc";
/// File stem marking a directory as a package
pub const INIT_STEM: &str = "__init__";

/// One candidate shape for a resolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRule {
    /// Appended to `prefix + subname` to form the TOC key
    pub suffix: &'static str,
    /// Whether a hit classifies the name as a package
    pub is_package: bool,
    /// Whether the record holds a compiled unit
    pub is_compiled: bool,
}

const fn rule(suffix: &'static str, is_package: bool, is_compiled: bool) -> SearchRule {
    SearchRule {
        suffix,
        is_package,
        is_compiled,
    }
}

const COMPILED_FIRST: [SearchRule; 4] = [
    rule("/__init__.modc", true, true),
    rule("/__init__.mod", true, false),
    rule(".modc", false, true),
    rule(".mod", false, false),
];

const SOURCE_FIRST: [SearchRule; 4] = [
    rule("/__init__.mod", true, false),
    rule("/__init__.modc", true, true),
    rule(".mod", false, false),
    rule(".modc", false, true),
];

/// Candidate preference inside each package/module rule pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    /// Prefer compiled units, fall back to source (default)
    CompiledFirst,
    /// Prefer source, fall back to compiled units
    SourceFirst,
}

/// The rule table for `order`, in lookup order.
pub fn search_rules(order: SearchOrder) -> &'static [SearchRule; 4] {
    match order {
        SearchOrder::CompiledFirst => &COMPILED_FIRST,
        SearchOrder::SourceFirst => &SOURCE_FIRST,
    }
}

// Global search order singleton, resolved once.
static SEARCH_ORDER: OnceCell<SearchOrder> = OnceCell::new();

/// Set the process-wide search order (at most once, before any
/// importer is constructed).
///
/// # Panics
/// If the search order was already resolved
pub fn init_search_order(order: SearchOrder) {
    SEARCH_ORDER
        .set(order)
        .expect("Search order already resolved");
}

/// Get the process-wide search order, resolving it to the default on
/// first use.
pub fn search_order() -> SearchOrder {
    *SEARCH_ORDER.get_or_init(|| SearchOrder::CompiledFirst)
}

/// Classification of a dotted name against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleInfo {
    /// A plain module record exists
    Module,
    /// A package init record exists
    Package,
    /// No rule matched
    NotFound,
}

/// Full discriminated result of a lookup, including the
/// namespace-portion fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindResult {
    /// A module or package is loadable from this archive
    Found,
    /// Only a directory marker exists; carries the synthetic full
    /// path `archive/prefix/subname`
    NamespacePortion(String),
    /// Nothing in this archive answers to the name
    NotFound,
}
