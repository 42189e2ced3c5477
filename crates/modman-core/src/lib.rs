mod error;
mod package;
mod release;

pub use error::{FetchCause, ModError, ModErrorKind, Result};
pub use package::{Catalog, CatalogEntry, PackageId};
pub use release::{AssetKind, Release, ReleaseAsset, ReleaseDocument};
