//! Implementation limits for decoding WebAssembly modules.
//!
//! These limits are aligned with V8's limits from src/wasm/wasm-limits.h.
//! They stop malformed input from claiming unrealistic element counts.

// =============================================================================
// Module-level limits
// =============================================================================

/// Maximum number of type definitions in a module
pub const MAX_TYPES: u32 = 1_000_000;

/// Maximum number of defined functions in a module
pub const MAX_FUNCTIONS: u32 = 1_000_000;

/// Maximum number of imports in a module
pub const MAX_IMPORTS: u32 = 1_000_000;

/// Maximum number of exports in a module
pub const MAX_EXPORTS: u32 = 1_000_000;

/// Maximum number of globals in a module
pub const MAX_GLOBALS: u32 = 1_000_000;

/// Maximum number of data segments in a module
pub const MAX_DATA_SEGMENTS: u32 = 100_000;

/// Maximum number of element segments in a module
pub const MAX_ELEMENT_SEGMENTS: u32 = 100_000;

/// Maximum number of tables in a module
pub const MAX_TABLES: u32 = 100_000;

/// Maximum number of memories in a module
pub const MAX_MEMORIES: u32 = 100_000;

/// Maximum number of function indices in one element segment
pub const MAX_TABLE_INIT_ENTRIES: u32 = 10_000_000;

// =============================================================================
// Function-level limits
// =============================================================================

/// Maximum number of function parameters
pub const MAX_FUNCTION_PARAMS: u32 = 1_000;

/// Maximum number of function return values
pub const MAX_FUNCTION_RETURNS: u32 = 1_000;

/// Maximum number of local declaration groups in a function body
pub const MAX_LOCAL_GROUPS: u32 = 50_000;

// =============================================================================
// Instruction-level limits
// =============================================================================

/// Maximum number of labels in a br_table instruction
pub const MAX_BR_TABLE_LABELS: u32 = 65_536;

