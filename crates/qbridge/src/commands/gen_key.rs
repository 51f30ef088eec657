//! Gen-key command - prints a random key for `--encryption-key`.

use anyhow::Result;
use qbridge_oauth::TokenCipher;

/// Run the gen-key command.
pub fn run() -> Result<()> {
    let key = TokenCipher::generate_key()
        .map_err(|e| anyhow::anyhow!("Failed to generate key: {}", e))?;
    println!("{}", key);
    Ok(())
}
