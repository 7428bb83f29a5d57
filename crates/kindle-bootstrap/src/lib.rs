//! Bootstrapper dispatch for the Kindle application kernel.
//!
//! An application is assembled from bootstrappers: small units that each
//! register the container bindings of one module and perform its start-up
//! and shutdown work. A [`BootstrapperRegistry`] declares which bootstrappers
//! exist, which of them run on every start (eager) and which container keys
//! are supplied on demand (lazy). The [`BootstrapperDispatcher`] turns those
//! declarations into container state.
//!
//! Lazy dispatch keeps start-up cheap. Instead of running a lazy
//! bootstrapper, the dispatcher installs a placeholder factory at each key it
//! supplies. The first resolution of any of those keys removes the
//! placeholder, runs the bootstrapper's lifecycle exactly once, and resolves
//! the real binding it registered. Setting `force_eager_loading` (for example
//! through `KINDLE_FORCE_EAGER_LOADING`) disables the deferral so every
//! bootstrapper runs up front.
//!
//! Every dispatch pass queues a pre-shutdown task that shuts down each
//! bootstrapper the pass brought to life. [`bootstrap_with`] wires the whole
//! sequence together: configuration, telemetry, the optional registry
//! manifest cache, and dispatch, reporting each stage through a
//! [`LifecycleReporter`].

mod application;
mod bootstrapper;
mod dispatcher;
mod lifecycle;
mod manifest;
mod registry;
mod telemetry;

pub use application::{
    Application, ApplicationState, BootstrapError, ConfigLoader, StaticConfigLoader,
    SystemConfigLoader, bootstrap, bootstrap_with,
};
pub use bootstrapper::{
    Bootstrapper, BootstrapperError, BootstrapperHandle, BootstrapperId, LifecyclePhase,
};
pub use dispatcher::{BootstrapperDispatcher, DispatchError, DispatchMode, DispatchTrigger};
pub use lifecycle::{LifecycleReporter, StructuredLifecycleReporter};
pub use manifest::{ManifestCache, ManifestError, RegistryManifest};
pub use registry::{
    BootstrapperCatalog, BootstrapperConstructors, BootstrapperDescriptor, BootstrapperRegistry,
    DeclaredBinding, LazyBinding, LazyBindingTable, RegistryError,
};
pub use telemetry::{
    TelemetryError, TelemetryHandle, TelemetrySettings, initialise as initialise_telemetry,
};
