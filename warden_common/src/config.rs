use std::time::Duration;

pub const COMMAND_PREFIX: &str = "!";

pub const DEBUG: bool = false;
pub const DEBUG_GUILD_ID: u64 = 1103412350286827569;

/// How long an issued text command stays editable/deletable.
pub const ISSUED_COMMAND_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Hard platform ceiling on component/modal custom identifiers.
pub const CUSTOM_ID_MAX_LENGTH: usize = 100;

pub const USER_CACHE_SIZE: usize = 512;

/// How long a confirmation prompt waits for the invoker's button press.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
