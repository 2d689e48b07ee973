use crate::{paths::Layout, registry::RegistrationStore, self_delete::DeletionScheduler};

/// Machine-wide collaborators the installer and uninstaller act on.
pub struct Host<'a> {
    pub layout: &'a Layout,
    pub store: &'a dyn RegistrationStore,
    pub scheduler: &'a dyn DeletionScheduler,
    /// Result of the elevation check done once at process start.
    pub elevated: bool,
}
