//! Workspace-wide constants and default paths.

/// Application name used in CLI output and log fields.
pub const APP_NAME: &str = "stackweave";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "swv";

/// Default project configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stackweave.yaml";

/// Default directory holding one subdirectory per unit.
pub const DEFAULT_UNITS_DIR: &str = "src/lambdas";

/// Default file stem of a unit's fragment (`fragment.json`, `fragment.yaml`).
pub const DEFAULT_FRAGMENT_STEM: &str = "fragment";

/// Extensions recognised for fragment and skeleton documents, in lookup order.
pub const DOCUMENT_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Default path of the shared CloudFormation skeleton.
pub const DEFAULT_SKELETON: &str = "templates/skeleton.json";

/// Default path of the shared base API document.
pub const DEFAULT_BASE_API: &str = "templates/api.json";

/// Default output path of the composed CloudFormation document.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "build/template.json";

/// Default output path of the composed API document.
pub const DEFAULT_OUTPUT_API: &str = "build/api.json";

/// Default prefix of every unit's logical resource id.
pub const DEFAULT_RESOURCE_PREFIX: &str = "Lambda";

/// Default handler used when a fragment does not name one.
pub const DEFAULT_HANDLER: &str = "lambda_function.lambda_handler";

/// Skeleton key holding the per-unit resource pattern.
pub const UNIT_TEMPLATE_KEY: &str = "UnitTemplate";

/// CloudFormation section holding the resource mapping.
pub const RESOURCES_KEY: &str = "Resources";

/// CloudFormation section holding template parameters.
pub const PARAMETERS_KEY: &str = "Parameters";

/// API document section holding the path mapping.
pub const PATHS_KEY: &str = "paths";

/// Owner name reported for resources declared by the skeleton itself.
pub const SKELETON_OWNER: &str = "skeleton";

/// Owner name reported for routes declared by the base API document.
pub const BASE_API_OWNER: &str = "base-api";

/// Opening delimiter of a placeholder token.
pub const PLACEHOLDER_OPEN: &str = "{{";

/// Closing delimiter of a placeholder token.
pub const PLACEHOLDER_CLOSE: &str = "}}";

/// Prefix shared by all CloudFormation pseudo parameters (`AWS::Region`, ...).
pub const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";
