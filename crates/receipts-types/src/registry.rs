//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every pluggable implementation (currently the wallet providers behind the
/// contract gateway) exposes a `Registry` struct implementing this trait, so
/// that the name used in configuration and the factory that builds it are
/// declared side by side.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. `"evm_alloy"` for `gateway.implementations.evm_alloy`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
