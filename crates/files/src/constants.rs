/// Folder (relative to a record directory) holding content-addressed binaries.
pub const FILES_FOLDER_NAME: &str = "files";

/// Hash algorithm sub-folder under [`FILES_FOLDER_NAME`].
pub const HASH_ALGORITHM: &str = "sha256";
