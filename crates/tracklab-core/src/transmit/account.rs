// Account identifier sent with every record.
// Format: "tracklab-<uuid>"

use std::fs;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

const ACCOUNT_ID_FILE: &str = "account_id.txt";
pub const ACCOUNT_ID_PREFIX: &str = "tracklab-";

#[derive(Debug, thiserror::Error)]
pub enum AccountIdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid account ID format: {0}")]
    InvalidFormat(String),
}

impl From<AccountIdError> for crate::error::CoreError {
    fn from(err: AccountIdError) -> Self {
        match err {
            AccountIdError::Io(e) => crate::error::CoreError::Io(e),
            AccountIdError::InvalidFormat(id) => crate::error::ConfigError::InvalidValue {
                key: "account.id".into(),
                message: format!("stored account id '{id}' is malformed"),
            }
            .into(),
        }
    }
}

/// Get or create the account ID stored in `dir`.
///
/// The file is created (along with `dir`) on first use and read back on
/// every later call.
pub fn get_or_create_account_id_at(dir: &Path) -> Result<String, AccountIdError> {
    let path = dir.join(ACCOUNT_ID_FILE);

    if path.exists() {
        let content = fs::read_to_string(&path)?;
        let id = content.trim().to_string();
        if id.starts_with(ACCOUNT_ID_PREFIX) {
            return Ok(id);
        }
        return Err(AccountIdError::InvalidFormat(id));
    }

    let id = format!("{}{}", ACCOUNT_ID_PREFIX, Uuid::new_v4());
    fs::create_dir_all(dir)?;
    let mut file = fs::File::create(&path)?;
    writeln!(file, "{id}")?;
    tracing::info!(account = %id, "generated account id");
    Ok(id)
}

/// The configured account id if there is one, otherwise the generated one.
pub fn resolve_account_id(configured: Option<&str>, dir: &Path) -> Result<String, AccountIdError> {
    match configured.map(str::trim).filter(|s| !s.is_empty()) {
        Some(id) => Ok(id.to_string()),
        None => get_or_create_account_id_at(dir),
    }
}
