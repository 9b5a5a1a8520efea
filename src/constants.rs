/// Field under which an encoded message is stored.
pub const PROTO_FIELD: &str = "proto";

/// Separator between logical path segments.
pub const PATH_SEPARATOR: char = '/';

pub const DEFAULT_DATABASE_ID: &str = "(default)";

pub(crate) const FIRESTORE_API_HOST: &str = "https://firestore.googleapis.com";
pub(crate) const FIRESTORE_API_VERSION: &str = "v1";
pub(crate) const EMULATOR_HOST_ENV: &str = "FIRESTORE_EMULATOR_HOST";

pub(crate) const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
pub(crate) const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub(crate) const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub(crate) const AUTO_ID_LENGTH: usize = 20;
