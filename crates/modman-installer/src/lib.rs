mod fs_utils;
mod install;
mod layout;
mod place;
mod stage;
mod state;
mod status;
mod uninstall;
mod worker;

pub use install::{InstalledRecord, Installer};
pub use layout::{ModLayout, REGISTRY_FILE_NAME};
pub use place::place_staged;
pub use stage::{stage_archive, StagingGuard};
pub use state::{InstalledEntry, InstalledRegistry, RegistryStore};
pub use status::{package_status, PackageStatus};
pub use uninstall::{uninstall, uninstall_package, UninstallOutcome, UninstallStatus};
pub use worker::{spawn_task, TaskEvent, TaskHandle};
