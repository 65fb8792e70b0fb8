//! Scenario defaults and fixed protocol values.

/// Application name prefix; a random suffix is appended per run.
pub const DEFAULT_APP_PREFIX: &str = "nodejs-sealights";

/// Credential record name prefix; a random suffix is appended per run.
pub const DEFAULT_CREDENTIAL_PREFIX: &str = "sealights";

/// Length of the random suffix appended to application names.
pub const APP_SUFFIX_LEN: usize = 10;

/// Length of the random suffix appended to credential record names.
pub const CREDENTIAL_SUFFIX_LEN: usize = 20;

/// Length of the random suffix in local artifact file names.
pub const ARTIFACT_SUFFIX_LEN: usize = 10;

/// Default application memory quota.
pub const DEFAULT_MEMORY: &str = "256M";

/// Default application disk quota.
pub const DEFAULT_DISK: &str = "512M";

/// Default application source directory.
pub const DEFAULT_FIXTURE_DIR: &str = "fixtures/with_sealights";

/// Environment variable carrying the build session identifier.
pub const BUILD_SESSION_ENV: &str = "SL_BUILD_SESSION_ID";

/// Default build session identifier.
pub const DEFAULT_BUILD_SESSION_ID: &str = "bs1";

/// Payload key of the credential record.
pub const TOKEN_FIELD: &str = "token";

/// Default token stored in the credential record.
pub const DEFAULT_TOKEN: &str = "token1";

/// Script the instrumented launch command wraps.
pub const DEFAULT_ENTRY_POINT: &str = "./dist/server.js";

/// Path of the manifest entry inside the deployment artifact.
pub const DEFAULT_ENTRY_PATH: &str = "./app/package.json";

/// Field path of the launch command inside the manifest.
pub const DEFAULT_FIELD_PATH: &str = "scripts.start";

/// Instrumentation wrapper expected in front of the entry point.
pub const LAUNCH_COMMAND_TEMPLATE: &str = "./node_modules/.bin/slnodejs run  --useinitialcolor true";

/// Binary name of the platform CLI.
pub const CF_BINARY: &str = "cf";

/// Binary name of the harness CLI.
pub const BIN_NAME: &str = "dropcheck";
