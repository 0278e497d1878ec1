//! Package-system adapters: a uniform view over OS-level (`apt`) and
//! language-level (`PyPI`) package ecosystems, behind one
//! [`adapter::PackageSystemAdapter`] trait.

pub mod adapter;
pub mod apt;
pub mod cache;
pub mod http;
pub mod pypi;
pub mod registry;
pub mod version;

pub use adapter::{PackageDefinition, PackageSystemAdapter};
pub use apt::{OsAptAdapter, PackagingSandbox};
pub use cache::{CachedVersions, InMemoryPackageInfoCache, PackageInfoCache};
pub use http::{ConditionalResponse, ResilientClient, TransportConfig};
pub use pypi::PyPiAdapter;
pub use registry::{AdapterRegistry, StaticAdapterRegistry};
pub use version::{LenientVersion, SortDirection, newest_below_major, newest_below_minor, sort_versions};
