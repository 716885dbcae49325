//! Configuration options for the transform.

/// Default capacity of the interpreter stack, in bytes.
pub const DEFAULT_STACK_CAPACITY: u32 = 1024 * 1024;

/// Default address of the first static byte.
pub const DEFAULT_STATIC_BASE: u32 = 8;

/// Configuration options for [`Emterpreter`](super::Emterpreter).
///
/// # Example
///
/// ```
/// use emterp_core::api::TransformOptions;
///
/// let options = TransformOptions {
///     stack_capacity: 64 * 1024,
///     ..TransformOptions::default()
/// };
/// assert_eq!(options.static_base, 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    /// Bytes reserved for interpreter frames after the bytecode.
    ///
    /// Default: 1 MiB
    pub stack_capacity: u32,

    /// Absolute address where static memory starts. Must be 8-byte aligned.
    ///
    /// Default: 8
    pub static_base: u32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            static_base: DEFAULT_STATIC_BASE,
        }
    }
}
